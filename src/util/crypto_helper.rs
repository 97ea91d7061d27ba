use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::SaltString;
use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier};
use sha2::{Digest, Sha256};

/// Hashes a password with Argon2id and a random salt.
///
/// # Arguments
///
/// * `password` - The plaintext password.
///
/// # Returns
///
/// * `Result<String, String>` - The PHC-format hash string, or an error
///   message if hashing fails.
pub fn hash_password(password: &str) -> Result<String, String> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();
    argon2
        .hash_password(password.as_bytes(), &salt)
        .map(|h| h.to_string())
        .map_err(|e| format!("Password hashing failed: {}", e))
}

/// Verifies a password against a stored Argon2 hash. The comparison inside
/// `argon2` is constant-time over the derived key.
pub fn verify_password(password: &str, password_hash: &str) -> Result<bool, String> {
    let parsed = PasswordHash::new(password_hash)
        .map_err(|e| format!("Stored password hash is malformed: {}", e))?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok())
}

/// One-way hash of a session token for the whitelist. The raw token is
/// never persisted; revocation checks hash the presented token and look up
/// the digest.
pub fn hash_token(raw_token: &str) -> String {
    let digest = Sha256::digest(raw_token.as_bytes());
    digest.iter().map(|b| format!("{:02x}", b)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_then_verify_roundtrip() {
        let hash = hash_password("Passw0rd!").unwrap();
        assert!(verify_password("Passw0rd!", &hash).unwrap());
        assert!(!verify_password("passw0rd!", &hash).unwrap());
    }

    #[test]
    fn hashes_are_salted() {
        let first = hash_password("Passw0rd!").unwrap();
        let second = hash_password("Passw0rd!").unwrap();
        assert_ne!(first, second);
    }

    #[test]
    fn token_hash_is_deterministic_and_not_the_token() {
        let token = "eyJhbGciOiJIUzI1NiJ9.e30.abc";
        let hash = hash_token(token);
        assert_eq!(hash, hash_token(token));
        assert_ne!(hash, token);
        assert_eq!(hash.len(), 64);
        assert!(hash.chars().all(|c| c.is_ascii_hexdigit()));
    }
}
