//! Entry points with the names and signatures of the first native module, so
//! existing host bindings load this library unchanged. They act on the default
//! store and the default hasher. Buffer sizes arrive as C `int`; a negative
//! size is rejected as invalid input.

use std::ffi::{c_char, c_int};
use std::ptr;

use super::password::{joinly_hash_password, joinly_verify_password};
use super::store::{joinly_store_delete, joinly_store_get, joinly_store_set};
use super::DEFAULT_STORE;
use crate::error::STATUS_INVALID_INPUT;

/// # Safety
/// `key` and `value` must be valid NUL-terminated strings.
#[no_mangle]
pub unsafe extern "C" fn native_set(key: *const c_char, value: *const c_char) -> c_int {
    joinly_store_set(DEFAULT_STORE, key, value)
}

/// # Safety
/// `key` must be a valid NUL-terminated string and `buffer` must point to
/// `buffer_size` writable bytes.
#[no_mangle]
pub unsafe extern "C" fn native_get(key: *const c_char, buffer: *mut c_char, buffer_size: c_int) -> c_int {
    match usize::try_from(buffer_size) {
        Ok(capacity) => joinly_store_get(DEFAULT_STORE, key, buffer, capacity, ptr::null_mut()),
        Err(_) => STATUS_INVALID_INPUT,
    }
}

/// # Safety
/// `key` must be a valid NUL-terminated string.
#[no_mangle]
pub unsafe extern "C" fn native_delete(key: *const c_char) -> c_int {
    joinly_store_delete(DEFAULT_STORE, key)
}

/// # Safety
/// `password` must be a valid NUL-terminated string and `buffer` must point to
/// `buffer_size` writable bytes.
#[no_mangle]
pub unsafe extern "C" fn hash_password(password: *const c_char, buffer: *mut c_char, buffer_size: c_int) -> c_int {
    match usize::try_from(buffer_size) {
        Ok(capacity) => joinly_hash_password(password, buffer, capacity, ptr::null_mut()),
        Err(_) => STATUS_INVALID_INPUT,
    }
}

/// Returns `0` only when `password` matches `hash`.
///
/// # Safety
/// `password` and `hash` must be valid NUL-terminated strings.
#[no_mangle]
pub unsafe extern "C" fn verify_password(password: *const c_char, hash: *const c_char) -> c_int {
    joinly_verify_password(password, hash)
}
