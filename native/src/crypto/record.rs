//! Self-describing hash records in PHC string form:
//! `$argon2id$v=19$m=19456,t=3,p=1$<salt>$<hash>`, salt and hash in unpadded
//! standard base64. Everything needed to re-derive the hash travels in the
//! string itself.

use std::fmt;
use std::str::FromStr;

use argon2::password_hash::{Ident, PasswordHash, Salt};
use argon2::{Algorithm, Params};
use base64::{engine::general_purpose::STANDARD_NO_PAD, Engine};
use serde::{Deserialize, Serialize};

use crate::error::NativeError;

pub const VERSION_10: u32 = 0x10;
pub const VERSION_13: u32 = 0x13;

pub const MIN_SALT_LEN: usize = 8;
pub const MAX_SALT_LEN: usize = 48;
/// Shortest digest a PHC string can carry.
pub const MIN_OUTPUT_LEN: usize = 10;
pub const MAX_OUTPUT_LEN: usize = 64;
/// Upper bound on the memory cost accepted from configs and records (1 GiB).
/// A record is untrusted input and must not be able to force an allocation
/// the host cannot survive.
pub const MAX_MEMORY_KIB: u32 = 1 << 20;
/// Upper bound on the time cost. Keeps a single verification from pinning a
/// host thread for minutes.
pub const MAX_ITERATIONS: u32 = 1 << 10;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HashAlgorithm {
    #[default]
    Argon2id,
    Argon2i,
    Argon2d,
}

impl HashAlgorithm {
    pub fn ident(self) -> &'static str {
        Algorithm::from(self).as_str()
    }
}

impl From<HashAlgorithm> for Algorithm {
    fn from(algorithm: HashAlgorithm) -> Self {
        match algorithm {
            HashAlgorithm::Argon2id => Algorithm::Argon2id,
            HashAlgorithm::Argon2i => Algorithm::Argon2i,
            HashAlgorithm::Argon2d => Algorithm::Argon2d,
        }
    }
}

impl From<Algorithm> for HashAlgorithm {
    fn from(algorithm: Algorithm) -> Self {
        match algorithm {
            Algorithm::Argon2id => HashAlgorithm::Argon2id,
            Algorithm::Argon2i => HashAlgorithm::Argon2i,
            Algorithm::Argon2d => HashAlgorithm::Argon2d,
        }
    }
}

/// Parsed form of a stored credential hash.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HashRecord {
    pub algorithm: HashAlgorithm,
    pub version: u32,
    pub memory_kib: u32,
    pub iterations: u32,
    pub parallelism: u32,
    pub salt: Vec<u8>,
    pub hash: Vec<u8>,
}

impl HashRecord {
    /// Serializes the record to its PHC string. The version is always emitted.
    pub fn encode(&self) -> String {
        format!(
            "${}$v={}$m={},t={},p={}${}${}",
            self.algorithm.ident(),
            self.version,
            self.memory_kib,
            self.iterations,
            self.parallelism,
            STANDARD_NO_PAD.encode(&self.salt),
            STANDARD_NO_PAD.encode(&self.hash),
        )
    }

    /// Parses a PHC string. Syntax problems are `MalformedRecord`; a
    /// well-formed identifier naming an algorithm we do not implement is
    /// `UnsupportedAlgorithm`.
    pub fn parse(encoded: &str) -> Result<Self, NativeError> {
        let phc = PasswordHash::new(encoded).map_err(|e| classify_unparsed(encoded, e))?;
        let algorithm = Algorithm::try_from(phc.algorithm)
            .map(HashAlgorithm::from)
            .map_err(|_| NativeError::UnsupportedAlgorithm(phc.algorithm.to_string()))?;

        // PHC allows omitting the version; Argon2 then means 0x10.
        let version = phc.version.unwrap_or(VERSION_10);
        if version != VERSION_10 && version != VERSION_13 {
            return Err(NativeError::malformed(format!("unknown version {version}")));
        }

        let (memory_kib, iterations, parallelism) = cost_params(&phc)?;
        Params::try_from(&phc)
            .map_err(|e| NativeError::malformed(format!("argon2 parameters rejected: {e}")))?;

        let salt = phc
            .salt
            .ok_or_else(|| NativeError::malformed("missing salt"))?;
        let mut salt_buf = [0u8; Salt::MAX_LENGTH];
        let salt = salt
            .decode_b64(&mut salt_buf)
            .map_err(|e| NativeError::malformed(format!("salt is not valid base64: {e}")))?
            .to_vec();
        let hash = phc
            .hash
            .ok_or_else(|| NativeError::malformed("missing hash"))?
            .as_bytes()
            .to_vec();

        let record = Self {
            algorithm,
            version,
            memory_kib,
            iterations,
            parallelism,
            salt,
            hash,
        };
        record.check_bounds()?;
        Ok(record)
    }

    /// Rejects records whose lengths or work factors fall outside what this
    /// module is willing to compute.
    pub fn check_bounds(&self) -> Result<(), NativeError> {
        if !(MIN_SALT_LEN..=MAX_SALT_LEN).contains(&self.salt.len()) {
            return Err(NativeError::malformed(format!(
                "salt length {} out of range",
                self.salt.len()
            )));
        }
        if !(MIN_OUTPUT_LEN..=MAX_OUTPUT_LEN).contains(&self.hash.len()) {
            return Err(NativeError::malformed(format!(
                "hash length {} out of range",
                self.hash.len()
            )));
        }
        if self.memory_kib > MAX_MEMORY_KIB {
            return Err(NativeError::malformed("memory cost above supported limit"));
        }
        if self.iterations > MAX_ITERATIONS {
            return Err(NativeError::malformed("time cost above supported limit"));
        }
        Ok(())
    }
}

impl fmt::Display for HashRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.encode())
    }
}

impl FromStr for HashRecord {
    type Err = NativeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        HashRecord::parse(s)
    }
}

/// Records from other schemes need not fit Argon2's PHC limits, so a failed
/// parse is still `UnsupportedAlgorithm` when it names a foreign algorithm.
fn classify_unparsed(encoded: &str, err: argon2::password_hash::Error) -> NativeError {
    let ident = encoded
        .strip_prefix('$')
        .and_then(|rest| rest.split('$').next())
        .and_then(|field| Ident::new(field).ok());
    match ident {
        Some(ident) if Algorithm::try_from(ident).is_err() => {
            NativeError::UnsupportedAlgorithm(ident.to_string())
        }
        _ => NativeError::malformed(format!("not a PHC string: {err}")),
    }
}

/// Pulls `m`, `t` and `p` out of the parameter list. All three are required,
/// each at most once, and nothing else may appear.
fn cost_params(phc: &PasswordHash<'_>) -> Result<(u32, u32, u32), NativeError> {
    let (mut memory, mut iterations, mut parallelism) = (None, None, None);
    for (name, value) in phc.params.iter() {
        let slot = match name.as_str() {
            "m" => &mut memory,
            "t" => &mut iterations,
            "p" => &mut parallelism,
            _ => return Err(NativeError::malformed("unknown parameter")),
        };
        if slot.is_some() {
            return Err(NativeError::malformed(format!("duplicate parameter {name}")));
        }
        let decimal = value
            .decimal()
            .map_err(|e| NativeError::malformed(format!("parameter {name}: {e}")))?;
        *slot = Some(decimal);
    }
    match (memory, iterations, parallelism) {
        (Some(m), Some(t), Some(p)) => Ok((m, t, p)),
        _ => Err(NativeError::malformed("parameters m, t and p are required")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> HashRecord {
        HashRecord {
            algorithm: HashAlgorithm::Argon2id,
            version: VERSION_13,
            memory_kib: 19456,
            iterations: 3,
            parallelism: 1,
            salt: vec![1u8; 16],
            hash: vec![2u8; 32],
        }
    }

    #[test]
    fn encodes_phc_layout() {
        let encoded = sample().encode();
        assert!(encoded.starts_with("$argon2id$v=19$m=19456,t=3,p=1$"));
        assert_eq!(encoded.split('$').count(), 6);
        assert_eq!(HashRecord::parse(&encoded).unwrap(), sample());
    }

    #[test]
    fn missing_version_means_0x10() {
        let salt = STANDARD_NO_PAD.encode([3u8; 16]);
        let hash = STANDARD_NO_PAD.encode([4u8; 32]);
        let record: HashRecord = format!("$argon2i$m=64,t=1,p=1${salt}${hash}").parse().unwrap();
        assert_eq!(record.version, VERSION_10);
        assert_eq!(record.algorithm, HashAlgorithm::Argon2i);
    }

    #[test]
    fn params_may_appear_in_any_order() {
        let encoded = sample().encode().replace("m=19456,t=3,p=1", "p=1,m=19456,t=3");
        assert_eq!(HashRecord::parse(&encoded).unwrap(), sample());
    }

    #[test]
    fn rejects_unknown_algorithm_separately() {
        let encoded = sample().encode().replace("argon2id", "scrypt");
        assert_eq!(
            HashRecord::parse(&encoded),
            Err(NativeError::UnsupportedAlgorithm("scrypt".into()))
        );
    }

    #[test]
    fn foreign_records_are_unsupported_even_outside_argon2_limits() {
        assert_eq!(
            HashRecord::parse("$scrypt$ln=15,r=8,p=1$c2FsdHNhbHQ$aGFzaGhhc2g"),
            Err(NativeError::UnsupportedAlgorithm("scrypt".into()))
        );
        assert_eq!(
            HashRecord::parse("$2b$12$R9h/cIPz0gi.URNNX3kh2OPST9/PgBkqquzi.Ss7KIUgO2t0jWMUW"),
            Err(NativeError::UnsupportedAlgorithm("2b".into()))
        );
    }

    #[test]
    fn rejects_garbage() {
        for bad in [
            "",
            "HASH_12345_hunter2",
            "$",
            "$Argon2id$v=19$m=1,t=1,p=1$AAAAAAAAAAA$AAAAAA",
            "$argon2id$v=19",
            "$argon2id$v=18$m=64,t=1,p=1$AQEBAQEBAQEBAQEBAQEBAQ$AgICAgICAgICAgICAgICAg",
            "$argon2id$v=19$m=64,t=1$AQEBAQEBAQEBAQEBAQEBAQ$AgICAgICAgICAgICAgICAg",
            "$argon2id$v=19$m=64,m=64,t=1,p=1$AQEBAQEBAQEBAQEBAQEBAQ$AgICAgICAgICAgICAgICAg",
            "$argon2id$v=19$m=64,t=1,p=1,x=2$AQEBAQEBAQEBAQEBAQEBAQ$AgICAgICAgICAgICAgICAg",
            "$argon2id$v=19$m=+64,t=1,p=1$AQEBAQEBAQEBAQEBAQEBAQ$AgICAgICAgICAgICAgICAg",
            "$argon2id$v=19$m=64,t=1,p=1$not*base64$AgICAgICAgICAgICAgICAg",
            "$argon2id$v=19$m=64,t=1,p=1$AQEBAQEBAQEBAQEBAQEBAQ$AgICAgICAgICAgICAgICAg$extra",
            "$argon2id$v=19$m=64,t=1,p=1$AQE$AgICAgICAgICAgICAgICAg",
            "$argon2id$v=19$m=64,t=1,p=1$AQEBAQEBAQEBAQEBAQEBAQ",
            "$argon2id$v=19$m=64,t=1,p=1$AQEBAQEBAQEBAQEBAQEBAQ$AgICAg",
        ] {
            assert!(
                matches!(HashRecord::parse(bad), Err(NativeError::MalformedRecord(_))),
                "accepted {bad:?}"
            );
        }
    }

    #[test]
    fn rejects_unbounded_time_cost() {
        let salt = STANDARD_NO_PAD.encode([1u8; 16]);
        let hash = STANDARD_NO_PAD.encode([2u8; 32]);
        for t in [MAX_ITERATIONS + 1, u32::MAX] {
            let encoded = format!("$argon2id$v=19$m=8,t={t},p=1${salt}${hash}");
            assert!(
                matches!(HashRecord::parse(&encoded), Err(NativeError::MalformedRecord(_))),
                "accepted t={t}"
            );
        }
        let mut record = sample();
        record.iterations = MAX_ITERATIONS;
        assert_eq!(HashRecord::parse(&record.encode()).unwrap(), record);
    }

    #[test]
    fn rejects_params_argon2_cannot_run() {
        let mut record = sample();
        record.parallelism = 0;
        assert!(matches!(
            HashRecord::parse(&record.encode()),
            Err(NativeError::MalformedRecord(_))
        ));
    }

    #[test]
    fn rejects_oversized_memory_cost() {
        let mut record = sample();
        record.memory_kib = MAX_MEMORY_KIB + 1;
        assert!(matches!(
            HashRecord::parse(&record.encode()),
            Err(NativeError::MalformedRecord(_))
        ));
    }
}
