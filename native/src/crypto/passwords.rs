//! Password hashing built around Argon2.
//! Hashing uses the configured parameters; verification always re-derives with
//! the parameters embedded in the stored record, so old records keep working
//! after the defaults are raised.

use argon2::{Algorithm, Argon2, Params, Version};
use serde::{Deserialize, Serialize};
use subtle::ConstantTimeEq;
use tracing::debug;
use zeroize::Zeroizing;

use super::random::{OsRandom, RandomSource};
use super::record::{
    HashAlgorithm, HashRecord, MAX_ITERATIONS, MAX_MEMORY_KIB, MAX_OUTPUT_LEN, MAX_SALT_LEN, MIN_OUTPUT_LEN,
    MIN_SALT_LEN, VERSION_10, VERSION_13,
};
use crate::error::NativeError;

/// Profile used when the host supplies no hasher config: Argon2id v19 over
/// 19 MiB with 3 passes on a single lane, a 16-byte salt and a 32-byte digest.
const MEMORY_COST_KIB: u32 = 19 * 1024;
const TIME_COST: u32 = 3;
const PARALLELISM: u32 = 1;
const SALT_LEN: usize = 16;
const OUTPUT_LEN: usize = 32;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct HasherConfig {
    pub algorithm: HashAlgorithm,
    pub version: u32,
    pub memory_kib: u32,
    pub iterations: u32,
    pub parallelism: u32,
    pub salt_len: usize,
    pub output_len: usize,
}

impl Default for HasherConfig {
    fn default() -> Self {
        Self {
            algorithm: HashAlgorithm::Argon2id,
            version: VERSION_13,
            memory_kib: MEMORY_COST_KIB,
            iterations: TIME_COST,
            parallelism: PARALLELISM,
            salt_len: SALT_LEN,
            output_len: OUTPUT_LEN,
        }
    }
}

impl HasherConfig {
    /// Default profile with the three work-factor knobs overridden.
    pub fn with_costs(memory_kib: u32, iterations: u32, parallelism: u32) -> Self {
        Self {
            memory_kib,
            iterations,
            parallelism,
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<(), NativeError> {
        if !(MIN_SALT_LEN..=MAX_SALT_LEN).contains(&self.salt_len) {
            return Err(NativeError::invalid(format!(
                "salt_len must be within {MIN_SALT_LEN}..={MAX_SALT_LEN}"
            )));
        }
        if !(MIN_OUTPUT_LEN..=MAX_OUTPUT_LEN).contains(&self.output_len) {
            return Err(NativeError::invalid(format!(
                "output_len must be within {MIN_OUTPUT_LEN}..={MAX_OUTPUT_LEN}"
            )));
        }
        if self.memory_kib > MAX_MEMORY_KIB {
            return Err(NativeError::invalid("memory_kib above supported limit"));
        }
        if self.iterations > MAX_ITERATIONS {
            return Err(NativeError::invalid(format!(
                "iterations must not exceed {MAX_ITERATIONS}"
            )));
        }
        argon2_for(
            self.algorithm,
            self.version,
            self.memory_kib,
            self.iterations,
            self.parallelism,
            self.output_len,
        )
        .map(|_| ())
        .map_err(|e| NativeError::invalid(format!("argon2 parameters rejected: {e}")))
    }
}

fn argon2_for(
    algorithm: HashAlgorithm,
    version: u32,
    memory_kib: u32,
    iterations: u32,
    parallelism: u32,
    output_len: usize,
) -> Result<Argon2<'static>, argon2::Error> {
    let version = match version {
        VERSION_10 => Version::V0x10,
        VERSION_13 => Version::V0x13,
        _ => return Err(argon2::Error::VersionInvalid),
    };
    let params = Params::new(memory_kib, iterations, parallelism, Some(output_len))?;
    Ok(Argon2::new(Algorithm::from(algorithm), version, params))
}

/// Produces and checks credential hashes. Holds no mutable state, so one
/// instance can be shared across threads.
pub struct CredentialHasher<R = OsRandom> {
    config: HasherConfig,
    random: R,
}

impl CredentialHasher<OsRandom> {
    pub fn new(config: HasherConfig) -> Result<Self, NativeError> {
        Self::with_random(config, OsRandom)
    }
}

impl Default for CredentialHasher<OsRandom> {
    fn default() -> Self {
        Self {
            config: HasherConfig::default(),
            random: OsRandom,
        }
    }
}

impl<R: RandomSource> CredentialHasher<R> {
    pub fn with_random(config: HasherConfig, random: R) -> Result<Self, NativeError> {
        config.validate()?;
        Ok(Self { config, random })
    }

    pub fn config(&self) -> &HasherConfig {
        &self.config
    }

    /// Hashes `secret` under a fresh random salt.
    pub fn hash(&self, secret: &[u8]) -> Result<HashRecord, NativeError> {
        if secret.is_empty() {
            return Err(NativeError::invalid("secret must not be empty"));
        }
        let config = &self.config;
        let argon2 = argon2_for(
            config.algorithm,
            config.version,
            config.memory_kib,
            config.iterations,
            config.parallelism,
            config.output_len,
        )
        .map_err(|e| NativeError::Internal(format!("argon2 setup failed: {e}")))?;

        let mut salt = vec![0u8; config.salt_len];
        self.random.fill(&mut salt)?;
        let mut hash = vec![0u8; config.output_len];
        argon2
            .hash_password_into(secret, &salt, &mut hash)
            .map_err(|e| NativeError::Internal(format!("argon2 derivation failed: {e}")))?;

        debug!(
            algorithm = config.algorithm.ident(),
            m = config.memory_kib,
            t = config.iterations,
            p = config.parallelism,
            "hashed credential"
        );
        Ok(HashRecord {
            algorithm: config.algorithm,
            version: config.version,
            memory_kib: config.memory_kib,
            iterations: config.iterations,
            parallelism: config.parallelism,
            salt,
            hash,
        })
    }

    /// Hashes `secret` and returns the PHC string.
    pub fn hash_encoded(&self, secret: &[u8]) -> Result<String, NativeError> {
        self.hash(secret).map(|record| record.encode())
    }

    /// True when `record` was produced with parameters other than the current
    /// configuration and should be replaced after the next successful login.
    pub fn needs_rehash(&self, record: &HashRecord) -> bool {
        let config = &self.config;
        record.algorithm != config.algorithm
            || record.version != config.version
            || record.memory_kib != config.memory_kib
            || record.iterations != config.iterations
            || record.parallelism != config.parallelism
            || record.hash.len() != config.output_len
            || record.salt.len() < config.salt_len
    }
}

/// Re-derives `secret` with the record's own parameters and compares the
/// result in constant time.
pub fn verify(secret: &[u8], record: &HashRecord) -> Result<bool, NativeError> {
    if secret.is_empty() {
        return Err(NativeError::invalid("secret must not be empty"));
    }
    record.check_bounds()?;
    let argon2 = argon2_for(
        record.algorithm,
        record.version,
        record.memory_kib,
        record.iterations,
        record.parallelism,
        record.hash.len(),
    )
    .map_err(|e| NativeError::malformed(format!("argon2 parameters rejected: {e}")))?;

    let mut computed = Zeroizing::new(vec![0u8; record.hash.len()]);
    argon2
        .hash_password_into(secret, &record.salt, &mut computed)
        .map_err(|e| NativeError::Internal(format!("argon2 derivation failed: {e}")))?;
    Ok(computed[..].ct_eq(&record.hash[..]).into())
}

/// Parses `encoded` and verifies `secret` against it.
pub fn verify_encoded(secret: &[u8], encoded: &str) -> Result<bool, NativeError> {
    let record = HashRecord::parse(encoded)?;
    verify(secret, &record)
}
