//! Credential hashing: salt generation, PBKDF2-HMAC-SHA256 password hashing,
//! and constant-time verification.

use hmac::Hmac;
use rand::RngCore;
use sha2::Sha256;
use subtle::ConstantTimeEq;

/// Default PBKDF2 iteration count, overridable via
/// [`Hasher::with_iterations`] / server configuration.
pub const DEFAULT_ITERATIONS: u32 = 100_000;

const SALT_LEN: usize = 32;
const HASH_LEN: usize = 32;

/// Generate a new cryptographically random 32-byte salt.
pub fn new_salt() -> [u8; SALT_LEN] {
    let mut salt = [0u8; SALT_LEN];
    rand::rng().fill_bytes(&mut salt);
    salt
}

/// A configured PBKDF2-HMAC-SHA256 hasher. The iteration count is part of
/// the server configuration, not a compile-time constant, so callers
/// construct one from the resolved config at startup.
#[derive(Debug, Clone, Copy)]
pub struct Hasher {
    iterations: u32,
}

impl Default for Hasher {
    fn default() -> Self {
        Self {
            iterations: DEFAULT_ITERATIONS,
        }
    }
}

impl Hasher {
    pub fn with_iterations(iterations: u32) -> Self {
        Self { iterations }
    }

    /// Hash `password` with `salt`, returning a hex-encoded 32-byte digest
    /// suitable for storage.
    pub fn hash(&self, password: &str, salt: &[u8]) -> String {
        let mut out = [0u8; HASH_LEN];
        pbkdf2::pbkdf2_hmac::<Hmac<Sha256>>(password.as_bytes(), salt, self.iterations, &mut out);
        hex::encode(out)
    }

    /// Verify `password` against `salt`/`expected_hash` in constant time.
    pub fn verify(&self, password: &str, salt: &[u8], expected_hash: &str) -> bool {
        let Ok(expected) = hex::decode(expected_hash) else {
            return false;
        };
        let mut actual = [0u8; HASH_LEN];
        pbkdf2::pbkdf2_hmac::<Hmac<Sha256>>(password.as_bytes(), salt, self.iterations, &mut actual);
        actual.ct_eq(&expected).into()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_password() {
        let hasher = Hasher::with_iterations(10); // cheap for tests
        let salt = new_salt();
        let hash = hasher.hash("hunter2hunter", &salt);
        assert!(hasher.verify("hunter2hunter", &salt, &hash));
        assert!(!hasher.verify("wrongwrong", &salt, &hash));
    }

    #[test]
    fn different_salts_yield_different_hashes() {
        let hasher = Hasher::with_iterations(10);
        let h1 = hasher.hash("samepassword", &new_salt());
        let h2 = hasher.hash("samepassword", &new_salt());
        assert_ne!(h1, h2);
    }

    #[test]
    fn salts_are_32_bytes_and_random() {
        let a = new_salt();
        let b = new_salt();
        assert_eq!(a.len(), 32);
        assert_ne!(a, b);
    }
}
