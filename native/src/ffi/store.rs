//! Key-value store entry points. Every function takes a store handle; handle
//! `0` is the process-wide default store.

use std::ffi::c_char;

use super::{c_bytes, c_str, guard, raw_bytes, runtime, write_out};
use crate::buffer::Terminator;
use crate::error::{NativeError, STATUS_OK};

/// Opens a fresh, empty store and writes its handle to `out_handle`.
///
/// # Safety
/// `out_handle` must point to a writable `u64`.
#[no_mangle]
pub unsafe extern "C" fn joinly_store_open(out_handle: *mut u64) -> i32 {
    guard("joinly_store_open", || {
        if out_handle.is_null() {
            return Err(NativeError::invalid("out_handle is null"));
        }
        *out_handle = runtime().open_store()?;
        Ok(STATUS_OK)
    })
}

/// Drops a store opened with [`joinly_store_open`] together with its entries.
#[no_mangle]
pub extern "C" fn joinly_store_close(handle: u64) -> i32 {
    guard("joinly_store_close", || {
        runtime().close_store(handle)?;
        Ok(STATUS_OK)
    })
}

/// Stores a NUL-terminated string value under `key`.
///
/// # Safety
/// `key` and `value` must be valid NUL-terminated strings.
#[no_mangle]
pub unsafe extern "C" fn joinly_store_set(handle: u64, key: *const c_char, value: *const c_char) -> i32 {
    guard("joinly_store_set", || {
        let key = c_str(key, "key")?;
        let value = c_bytes(value, "value")?;
        runtime().store(handle)?.set(key, value)?;
        Ok(STATUS_OK)
    })
}

/// Stores `value_len` raw bytes under `key`; the value may contain NULs.
///
/// # Safety
/// - `key` must be a valid NUL-terminated string
/// - `value` must point to `value_len` readable bytes (or be null when `value_len == 0`)
#[no_mangle]
pub unsafe extern "C" fn joinly_store_set_bytes(
    handle: u64,
    key: *const c_char,
    value: *const u8,
    value_len: usize,
) -> i32 {
    guard("joinly_store_set_bytes", || {
        let key = c_str(key, "key")?;
        let value = raw_bytes(value, value_len, "value")?;
        runtime().store(handle)?.set(key, value)?;
        Ok(STATUS_OK)
    })
}

/// Copies the value under `key` into `out` as a NUL-terminated string. Values
/// with interior NULs are refused; read them with [`joinly_store_get_bytes`].
///
/// # Safety
/// - `key` must be a valid NUL-terminated string
/// - `out` must be null (with `out_capacity == 0`) or point to `out_capacity` writable bytes
/// - `out_required` must be null or point to a writable `usize`
#[no_mangle]
pub unsafe extern "C" fn joinly_store_get(
    handle: u64,
    key: *const c_char,
    out: *mut c_char,
    out_capacity: usize,
    out_required: *mut usize,
) -> i32 {
    guard("joinly_store_get", || {
        let key = c_str(key, "key")?;
        runtime().store(handle)?.get_with(key, |value| {
            if value.contains(&0) {
                return Err(NativeError::invalid("value contains NUL; use the bytes variant"));
            }
            write_out(out.cast(), out_capacity, value, Terminator::Nul, out_required)
        })??;
        Ok(STATUS_OK)
    })
}

/// Copies the raw value under `key` into `out`. `out_len` receives the number
/// of bytes written, or the number required on overflow.
///
/// # Safety
/// - `key` must be a valid NUL-terminated string
/// - `out` must be null (with `out_capacity == 0`) or point to `out_capacity` writable bytes
/// - `out_len` must be null or point to a writable `usize`
#[no_mangle]
pub unsafe extern "C" fn joinly_store_get_bytes(
    handle: u64,
    key: *const c_char,
    out: *mut u8,
    out_capacity: usize,
    out_len: *mut usize,
) -> i32 {
    guard("joinly_store_get_bytes", || {
        let key = c_str(key, "key")?;
        runtime()
            .store(handle)?
            .get_with(key, |value| write_out(out, out_capacity, value, Terminator::None, out_len))??;
        Ok(STATUS_OK)
    })
}

/// Removes `key`. Deleting an absent key reports `STATUS_NOT_FOUND`.
///
/// # Safety
/// `key` must be a valid NUL-terminated string.
#[no_mangle]
pub unsafe extern "C" fn joinly_store_delete(handle: u64, key: *const c_char) -> i32 {
    guard("joinly_store_delete", || {
        let key = c_str(key, "key")?;
        runtime().store(handle)?.delete(key)?;
        Ok(STATUS_OK)
    })
}

/// Clears every entry of the store, leaving the handle valid.
#[no_mangle]
pub extern "C" fn joinly_store_reset(handle: u64) -> i32 {
    guard("joinly_store_reset", || {
        runtime().store(handle)?.reset();
        Ok(STATUS_OK)
    })
}

/// Writes the number of entries in the store to `out_len`.
///
/// # Safety
/// `out_len` must point to a writable `usize`.
#[no_mangle]
pub unsafe extern "C" fn joinly_store_len(handle: u64, out_len: *mut usize) -> i32 {
    guard("joinly_store_len", || {
        if out_len.is_null() {
            return Err(NativeError::invalid("out_len is null"));
        }
        *out_len = runtime().store(handle)?.len();
        Ok(STATUS_OK)
    })
}
