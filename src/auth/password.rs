use crate::auth::AuthError;

pub fn hash_password(plain: &str, cost: u32) -> Result<String, AuthError> {
    bcrypt::hash(plain, cost).map_err(|e| AuthError::Hashing(e.to_string()))
}

/// Compare a plaintext password with a stored bcrypt hash.
pub fn verify_password(plain: &str, hash: &str) -> Result<bool, AuthError> {
    bcrypt::verify(plain, hash).map_err(|e| AuthError::Hashing(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hashes_verify_only_the_original_password() {
        let hash = hash_password("s3cret!", 4).unwrap();
        assert_ne!(hash, "s3cret!");
        assert!(verify_password("s3cret!", &hash).unwrap());
        assert!(!verify_password("S3cret!", &hash).unwrap());
    }

    #[test]
    fn garbage_hash_is_an_error() {
        assert!(verify_password("x", "not-a-bcrypt-hash").is_err());
    }
}
