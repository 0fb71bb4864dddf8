//! Credential hashing: the record format, the Argon2 hasher, and the
//! randomness capability that feeds it salts.

pub mod passwords;
pub mod random;
pub mod record;

pub use passwords::{verify, verify_encoded, CredentialHasher, HasherConfig};
pub use random::{OsRandom, RandomSource, SeededRandom};
pub use record::{HashAlgorithm, HashRecord};
