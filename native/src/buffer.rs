//! Capacity-checked writes into caller-owned buffers.
//! A write either lands completely or does not touch the destination at all.

use crate::error::NativeError;

/// Whether a NUL terminator is appended after the payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Terminator {
    Nul,
    None,
}

impl Terminator {
    fn extra(self) -> usize {
        match self {
            Terminator::Nul => 1,
            Terminator::None => 0,
        }
    }
}

/// Bytes `payload` occupies in a destination buffer once terminated.
pub fn required_len(payload: &[u8], terminator: Terminator) -> usize {
    payload.len() + terminator.extra()
}

/// Copies `payload` into `dest` and returns the number of bytes written
/// (including the terminator). Fails with `EncodingOverflow` without writing
/// anything when `dest` is too small.
pub fn fill(dest: &mut [u8], payload: &[u8], terminator: Terminator) -> Result<usize, NativeError> {
    let required = required_len(payload, terminator);
    if dest.len() < required {
        return Err(NativeError::EncodingOverflow { required });
    }
    dest[..payload.len()].copy_from_slice(payload);
    if terminator == Terminator::Nul {
        dest[payload.len()] = 0;
    }
    Ok(required)
}
