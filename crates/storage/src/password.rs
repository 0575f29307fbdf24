// Credential hashing using Argon2id
// Decision: Argon2id with fixed parameters, raw output rather than the PHC string
// Decision: Stored form is `<digest>.<salt>`, both lowercase hex
// Decision: A fresh 16-byte OS-random salt per call, so equal secrets never hash alike

use argon2::password_hash::Output;
use argon2::{Algorithm, Argon2, Params, Version};
use rand::rngs::OsRng;
use rand::RngCore;

use crate::error::CredentialError;

/// Digest length in bytes
pub const DIGEST_LEN: usize = 32;

/// Salt length in bytes
pub const SALT_LEN: usize = 16;

// Argon2 rejects shorter salts
const MIN_SALT_LEN: usize = 8;

/// Memory cost in KiB
const M_COST: u32 = 19 * 1024;
const T_COST: u32 = 2;
const P_COST: u32 = 1;

fn hasher() -> Result<Argon2<'static>, CredentialError> {
    let params = Params::new(M_COST, T_COST, P_COST, Some(DIGEST_LEN))
        .map_err(|e| CredentialError::Derivation(e.to_string()))?;
    Ok(Argon2::new(Algorithm::Argon2id, Version::V0x13, params))
}

fn derive(secret: &str, salt: &[u8]) -> Result<[u8; DIGEST_LEN], CredentialError> {
    let mut digest = [0u8; DIGEST_LEN];
    hasher()?
        .hash_password_into(secret.as_bytes(), salt, &mut digest)
        .map_err(|e| CredentialError::Derivation(e.to_string()))?;
    Ok(digest)
}

/// Hash a secret into its stored form
pub fn hash_password(secret: &str) -> Result<String, CredentialError> {
    let mut salt = [0u8; SALT_LEN];
    OsRng.fill_bytes(&mut salt);

    let digest = derive(secret, &salt)?;
    Ok(format!("{}.{}", hex::encode(digest), hex::encode(salt)))
}

/// Verify a secret against a stored form
///
/// A wrong secret yields `Ok(false)`; only an unreadable stored form is an error.
pub fn verify_password(secret: &str, stored: &str) -> Result<bool, CredentialError> {
    let (digest_hex, salt_hex) = stored
        .split_once('.')
        .ok_or_else(|| CredentialError::Malformed("missing '.' separator".to_string()))?;

    let expected = hex::decode(digest_hex)
        .map_err(|e| CredentialError::Malformed(format!("digest: {e}")))?;
    if expected.len() != DIGEST_LEN {
        return Err(CredentialError::Malformed(format!(
            "digest is {} bytes, expected {DIGEST_LEN}",
            expected.len()
        )));
    }

    let salt =
        hex::decode(salt_hex).map_err(|e| CredentialError::Malformed(format!("salt: {e}")))?;
    if salt.len() < MIN_SALT_LEN {
        return Err(CredentialError::Malformed(format!(
            "salt is {} bytes, expected at least {MIN_SALT_LEN}",
            salt.len()
        )));
    }

    let actual = derive(secret, &salt)?;

    // Output equality is constant-time
    let expected =
        Output::new(&expected).map_err(|e| CredentialError::Malformed(e.to_string()))?;
    let actual = Output::new(&actual).map_err(|e| CredentialError::Derivation(e.to_string()))?;

    Ok(expected == actual)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_and_verify() {
        let password = "my-secure-password-123!";
        let hash = hash_password(password).unwrap();

        // Verify correct password
        assert!(verify_password(password, &hash).unwrap());

        // Verify wrong password
        assert!(!verify_password("wrong-password", &hash).unwrap());
    }

    #[test]
    fn test_different_hashes() {
        let password = "same-password";
        let hash1 = hash_password(password).unwrap();
        let hash2 = hash_password(password).unwrap();

        // Fresh salt per call
        assert_ne!(hash1, hash2);

        assert!(verify_password(password, &hash1).unwrap());
        assert!(verify_password(password, &hash2).unwrap());
    }

    #[test]
    fn test_hash_format() {
        let hash = hash_password("test").unwrap();
        let (digest, salt) = hash.split_once('.').unwrap();

        assert_eq!(digest.len(), DIGEST_LEN * 2);
        assert_eq!(salt.len(), SALT_LEN * 2);
        assert!(hash
            .chars()
            .all(|c| c == '.' || c.is_ascii_digit() || ('a'..='f').contains(&c)));
    }

    #[test]
    fn test_empty_secret_round_trips() {
        let hash = hash_password("").unwrap();
        assert!(verify_password("", &hash).unwrap());
        assert!(!verify_password(" ", &hash).unwrap());
    }

    #[test]
    fn test_tampered_salt_fails_verification() {
        let hash = hash_password("secret").unwrap();
        let (digest, salt) = hash.split_once('.').unwrap();
        let flipped = if salt.starts_with('0') { "1" } else { "0" };
        let tampered = format!("{digest}.{flipped}{}", &salt[1..]);

        assert!(!verify_password("secret", &tampered).unwrap());
    }

    #[test]
    fn test_malformed_forms_are_errors() {
        let cases = [
            "no-separator",
            "zz.00112233445566778899aabbccddeeff",
            "abcd.00112233445566778899aabbccddeeff",
        ];
        for stored in cases {
            let err = verify_password("secret", stored).unwrap_err();
            assert!(matches!(err, CredentialError::Malformed(_)), "{stored}");
        }

        let digest = "00".repeat(DIGEST_LEN);
        let err = verify_password("secret", &format!("{digest}.0011")).unwrap_err();
        assert!(matches!(err, CredentialError::Malformed(_)));
    }
}
