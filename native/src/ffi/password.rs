//! Password hashing entry points.

use std::ffi::c_char;

use super::{c_bytes, guard, runtime, write_out};
use crate::buffer::Terminator;
use crate::crypto::passwords::{verify, CredentialHasher, HasherConfig};
use crate::crypto::record::HashRecord;
use crate::error::{NativeError, STATUS_MISMATCH, STATUS_OK};

/// Hashes `secret` with the default hasher and writes the NUL-terminated PHC
/// record into `out`.
///
/// # Safety
/// - `secret` must be a valid NUL-terminated string
/// - `out` must be null (with `out_capacity == 0`) or point to `out_capacity` writable bytes
/// - `out_required` must be null or point to a writable `usize`
#[no_mangle]
pub unsafe extern "C" fn joinly_hash_password(
    secret: *const c_char,
    out: *mut c_char,
    out_capacity: usize,
    out_required: *mut usize,
) -> i32 {
    guard("joinly_hash_password", || {
        let secret = c_bytes(secret, "secret")?;
        let encoded = runtime().hasher().hash_encoded(secret)?;
        write_out(out.cast(), out_capacity, encoded.as_bytes(), Terminator::Nul, out_required)?;
        Ok(STATUS_OK)
    })
}

/// Like [`joinly_hash_password`] with explicit Argon2 costs; the remaining
/// parameters come from the current default configuration.
///
/// # Safety
/// Same contract as [`joinly_hash_password`].
#[no_mangle]
pub unsafe extern "C" fn joinly_hash_password_with_params(
    secret: *const c_char,
    memory_kib: u32,
    iterations: u32,
    parallelism: u32,
    out: *mut c_char,
    out_capacity: usize,
    out_required: *mut usize,
) -> i32 {
    guard("joinly_hash_password_with_params", || {
        let secret = c_bytes(secret, "secret")?;
        let config = HasherConfig {
            memory_kib,
            iterations,
            parallelism,
            ..runtime().hasher().config().clone()
        };
        let encoded = CredentialHasher::new(config)?.hash_encoded(secret)?;
        write_out(out.cast(), out_capacity, encoded.as_bytes(), Terminator::Nul, out_required)?;
        Ok(STATUS_OK)
    })
}

/// Returns `STATUS_OK` when `secret` matches `record`, `STATUS_MISMATCH` when
/// it does not, and a negative status when the record cannot be used.
///
/// # Safety
/// `secret` and `record` must be valid NUL-terminated strings.
#[no_mangle]
pub unsafe extern "C" fn joinly_verify_password(secret: *const c_char, record: *const c_char) -> i32 {
    guard("joinly_verify_password", || {
        let secret = c_bytes(secret, "secret")?;
        let record = parse_record(record)?;
        Ok(if verify(secret, &record)? {
            STATUS_OK
        } else {
            STATUS_MISMATCH
        })
    })
}

/// Returns `1` when `record` was made with parameters other than the current
/// defaults, `0` when it is up to date.
///
/// # Safety
/// `record` must be a valid NUL-terminated string.
#[no_mangle]
pub unsafe extern "C" fn joinly_needs_rehash(record: *const c_char) -> i32 {
    guard("joinly_needs_rehash", || {
        let record = parse_record(record)?;
        Ok(if runtime().hasher().needs_rehash(&record) {
            STATUS_MISMATCH
        } else {
            STATUS_OK
        })
    })
}

unsafe fn parse_record(record: *const c_char) -> Result<HashRecord, NativeError> {
    let bytes = c_bytes(record, "record")?;
    let text = std::str::from_utf8(bytes).map_err(|_| NativeError::malformed("record is not UTF-8"))?;
    HashRecord::parse(text)
}
