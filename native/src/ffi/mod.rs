//! C ABI exported by the shared library.
//!
//! Conventions shared by every function:
//! - the return value is a status code from [`crate::error`]; `0` is success,
//!   negative values are errors and mean nothing happened;
//! - outputs go into caller-owned `(ptr, capacity)` buffers. A write is
//!   all-or-nothing; when the buffer is too small `STATUS_ENCODING_OVERFLOW`
//!   is returned and the needed size is stored through the optional size
//!   out-pointer. A null buffer with capacity `0` is a valid size query;
//! - nothing allocated here is ever handed to the caller to free. Stores are
//!   named by integer handles, with handle `0` always available;
//! - panics are caught and reported as `STATUS_INTERNAL_ERROR`.

use std::ffi::{c_char, CStr};
use std::panic::{self, AssertUnwindSafe};
use std::slice;

use tracing::{debug, error, info, warn};

use crate::buffer::{self, Terminator};
use crate::config::{load_config, NativeConfig};
use crate::error::{NativeError, STATUS_INTERNAL_ERROR, STATUS_OK};
use crate::logging::init_logging;

pub mod legacy;
pub mod password;
mod runtime;
pub mod store;

pub use runtime::DEFAULT_STORE;
pub(crate) use runtime::runtime;

/// Loads configuration, installs logging and applies the hasher and store
/// settings. Optional: the library configures itself from
/// `JOINLY_NATIVE_CONFIG` on first use. A null `config_path` also reads that
/// variable. Calling it again reconfigures; records hashed earlier still
/// verify.
///
/// # Safety
/// `config_path` must be null or a valid NUL-terminated UTF-8 path.
#[no_mangle]
pub unsafe extern "C" fn joinly_init(config_path: *const c_char) -> i32 {
    guard("joinly_init", || {
        let config = if config_path.is_null() {
            NativeConfig::from_env()?
        } else {
            load_config(c_str(config_path, "config_path")?)?
        };
        init_logging(config.log_level.as_deref());
        runtime().configure(&config)?;
        info!(
            m = config.hasher.memory_kib,
            t = config.hasher.iterations,
            p = config.hasher.parallelism,
            "native module initialized"
        );
        Ok(STATUS_OK)
    })
}

/// Runs one exported call, converting its outcome into a status code.
fn guard(op: &'static str, body: impl FnOnce() -> Result<i32, NativeError>) -> i32 {
    match panic::catch_unwind(AssertUnwindSafe(body)) {
        Ok(Ok(status)) => status,
        Ok(Err(err)) => {
            match &err {
                NativeError::Internal(_) => error!(op, %err, "native call failed"),
                // The message may quote parts of the record.
                NativeError::MalformedRecord(_) | NativeError::UnsupportedAlgorithm(_) => {
                    warn!(op, status = err.status(), "rejected hash record")
                }
                _ => debug!(op, %err, "native call returned error"),
            }
            err.status()
        }
        Err(_) => {
            error!(op, "panic caught at ffi boundary");
            STATUS_INTERNAL_ERROR
        }
    }
}

/// Borrows a NUL-terminated argument as bytes.
unsafe fn c_bytes<'a>(ptr: *const c_char, what: &str) -> Result<&'a [u8], NativeError> {
    if ptr.is_null() {
        return Err(NativeError::invalid(format!("{what} is null")));
    }
    Ok(CStr::from_ptr(ptr).to_bytes())
}

/// Borrows a NUL-terminated argument that must be UTF-8.
unsafe fn c_str<'a>(ptr: *const c_char, what: &str) -> Result<&'a str, NativeError> {
    std::str::from_utf8(c_bytes(ptr, what)?)
        .map_err(|_| NativeError::invalid(format!("{what} is not valid UTF-8")))
}

/// Borrows a `(ptr, len)` argument. A null pointer is accepted only for `len == 0`.
unsafe fn raw_bytes<'a>(ptr: *const u8, len: usize, what: &str) -> Result<&'a [u8], NativeError> {
    if len == 0 {
        return Ok(&[]);
    }
    if ptr.is_null() {
        return Err(NativeError::invalid(format!("{what} is null")));
    }
    Ok(slice::from_raw_parts(ptr, len))
}

/// Copies `payload` into the caller buffer and stores the written (or, on
/// overflow, required) size through `out_size` when it is non-null.
unsafe fn write_out(
    out: *mut u8,
    capacity: usize,
    payload: &[u8],
    terminator: Terminator,
    out_size: *mut usize,
) -> Result<(), NativeError> {
    let dest: &mut [u8] = match (out.is_null(), capacity) {
        (true, 0) => &mut [],
        (true, _) => return Err(NativeError::invalid("output buffer is null")),
        (false, _) => slice::from_raw_parts_mut(out, capacity),
    };
    let result = buffer::fill(dest, payload, terminator);
    if !out_size.is_null() {
        *out_size = match &result {
            Ok(written) => *written,
            Err(NativeError::EncodingOverflow { required }) => *required,
            Err(_) => 0,
        };
    }
    result.map(|_| ())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::verify_encoded;
    use crate::error::{
        STATUS_ENCODING_OVERFLOW, STATUS_INVALID_INPUT, STATUS_MALFORMED_RECORD, STATUS_UNSUPPORTED_ALGORITHM,
    };
    use std::io;
    use std::sync::Arc;

    #[derive(Clone, Default)]
    struct Captured(Arc<parking_lot::Mutex<Vec<u8>>>);

    impl io::Write for Captured {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn guard_maps_errors_and_panics() {
        assert_eq!(guard("ok", || Ok(STATUS_OK)), STATUS_OK);
        assert_eq!(
            guard("invalid", || Err(NativeError::invalid("x"))),
            STATUS_INVALID_INPUT
        );
        assert_eq!(guard("panic", || panic!("boom")), STATUS_INTERNAL_ERROR);
    }

    #[test]
    fn rejected_records_are_logged_without_their_contents() {
        let captured = Captured::default();
        let writer = captured.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(move || writer.clone())
            .with_ansi(false)
            .with_max_level(tracing::Level::TRACE)
            .finish();

        let statuses = tracing::subscriber::with_default(subscriber, || {
            let verify = |record: &'static str| {
                guard("verify", move || verify_encoded(b"pw", record).map(|_| STATUS_OK))
            };
            [
                verify("$scrypt-leaked$ln=15$AQEBAQEBAQEBAQEBAQEBAQ$AgICAgICAgICAgICAgICAg"),
                verify("$argon2id$v=19$m=64,t=1,p=1,t=777$AQEBAQEBAQEBAQEBAQEBAQ$AgICAgICAgICAgICAgICAg"),
            ]
        });
        assert_eq!(statuses, [STATUS_UNSUPPORTED_ALGORITHM, STATUS_MALFORMED_RECORD]);

        let logged = String::from_utf8(captured.0.lock().clone()).unwrap();
        assert_eq!(logged.matches("rejected hash record").count(), 2, "{logged}");
        assert!(!logged.contains("scrypt-leaked"), "{logged}");
        assert!(!logged.contains("AQEB"), "{logged}");
    }

    #[test]
    fn size_query_reports_required_length() {
        let mut required = 0usize;
        let err = unsafe {
            write_out(std::ptr::null_mut(), 0, b"abc", Terminator::Nul, &mut required)
        }
        .unwrap_err();
        assert_eq!(err.status(), STATUS_ENCODING_OVERFLOW);
        assert_eq!(required, 4);
    }

    #[test]
    fn null_buffer_with_capacity_is_invalid() {
        let err = unsafe {
            write_out(std::ptr::null_mut(), 8, b"abc", Terminator::Nul, std::ptr::null_mut())
        }
        .unwrap_err();
        assert_eq!(err.status(), STATUS_INVALID_INPUT);
    }
}
