//! Native credential hashing and key-value storage for the Joinly backend.
//! The safe Rust API lives in `crypto` and `store`; `ffi` wraps it in a C ABI
//! with integer status codes and caller-owned buffers so any host runtime can
//! load the shared library.

pub mod buffer;
pub mod config;
pub mod crypto;
pub mod error;
pub mod ffi;
pub mod logging;
pub mod store;

pub use config::{load_config, NativeConfig};
pub use crypto::{CredentialHasher, HashRecord, HasherConfig};
pub use error::NativeError;
pub use store::{KvStore, StoreConfig};
