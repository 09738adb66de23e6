use anyhow::{Result, anyhow};
use argon2::{
    Argon2, PasswordHash, PasswordHasher, PasswordVerifier,
    password_hash::{SaltString, rand_core::OsRng},
};

/// How passwords are stored and checked. Login and user writes only see this trait,
/// so the stored format can change without touching handlers.
pub trait CredentialScheme: Send + Sync {
    /// Produces the value written to `users.password`.
    fn hash(&self, password: &str) -> Result<String>;

    fn verify(&self, stored: &str, presented: &str) -> bool;
}

/// Salted Argon2id PHC strings.
pub struct Argon2Scheme;

impl CredentialScheme for Argon2Scheme {
    fn hash(&self, password: &str) -> Result<String> {
        let salt = SaltString::generate(&mut OsRng);
        let hash = Argon2::default()
            .hash_password(password.as_bytes(), &salt)
            .map_err(|e| anyhow!("Password hashing failed: {}", e))?;
        Ok(hash.to_string())
    }

    fn verify(&self, stored: &str, presented: &str) -> bool {
        let Ok(parsed) = PasswordHash::new(stored) else {
            return false;
        };
        Argon2::default()
            .verify_password(presented.as_bytes(), &parsed)
            .is_ok()
    }
}

/// Stores the password as given and compares by equality. For databases seeded
/// with plaintext credentials.
pub struct PlaintextScheme;

impl CredentialScheme for PlaintextScheme {
    fn hash(&self, password: &str) -> Result<String> {
        Ok(password.to_string())
    }

    fn verify(&self, stored: &str, presented: &str) -> bool {
        !stored.is_empty() && stored == presented
    }
}

pub fn scheme_by_name(name: &str) -> Option<Box<dyn CredentialScheme>> {
    match name {
        "argon2" => Some(Box::new(Argon2Scheme)),
        "plaintext" => Some(Box::new(PlaintextScheme)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn argon2_round_trip() {
        let scheme = Argon2Scheme;
        let stored = scheme.hash("secret").unwrap();
        assert_ne!(stored, "secret");
        assert!(scheme.verify(&stored, "secret"));
        assert!(!scheme.verify(&stored, "Secret"));
    }

    #[test]
    fn argon2_rejects_unparseable_stored_value() {
        assert!(!Argon2Scheme.verify("", "secret"));
        assert!(!Argon2Scheme.verify("secret", "secret"));
    }

    #[test]
    fn plaintext_is_exact_equality() {
        let scheme = PlaintextScheme;
        assert!(scheme.verify("secret", "secret"));
        assert!(!scheme.verify("secret", "secret "));
        assert!(!scheme.verify("", ""));
    }

    #[test]
    fn lookup_by_name() {
        assert!(scheme_by_name("argon2").is_some());
        assert!(scheme_by_name("plaintext").is_some());
        assert!(scheme_by_name("md5").is_none());
    }
}
