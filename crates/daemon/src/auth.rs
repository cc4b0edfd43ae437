//! Credential checking for the single configured account.

use protocol::Password;
use tracing::warn;

use crate::config::AuthConfig;

/// The account allowed to log in.
#[derive(Clone)]
pub struct Credentials {
    username: String,
    password_hash: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .finish_non_exhaustive()
    }
}

impl Credentials {
    /// Create credentials from a username and a bcrypt hash.
    pub fn new(username: impl Into<String>, password_hash: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password_hash: password_hash.into(),
        }
    }

    /// Configured username.
    pub fn username(&self) -> &str {
        &self.username
    }

    /// Check a login attempt.
    ///
    /// Both the username and the password must match. The bcrypt comparison
    /// runs on the blocking pool. A malformed stored hash never matches.
    pub async fn verify(&self, username: &str, password: &Password) -> bool {
        if username != self.username {
            return false;
        }

        let hash = self.password_hash.clone();
        let candidate = password.expose().to_owned();
        match tokio::task::spawn_blocking(move || bcrypt::verify(candidate, &hash)).await {
            Ok(Ok(matches)) => matches,
            Ok(Err(e)) => {
                warn!(error = %e, "Stored password hash could not be checked");
                false
            }
            Err(e) => {
                warn!(error = %e, "Password check task failed");
                false
            }
        }
    }
}

impl From<&AuthConfig> for Credentials {
    fn from(auth: &AuthConfig) -> Self {
        Self::new(auth.username.clone(), auth.password_hash.clone())
    }
}

/// Hash a password for the `auth.password_hash` setting.
pub fn hash_password(password: &str, cost: u32) -> Result<String, bcrypt::BcryptError> {
    bcrypt::hash(password, cost)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn credentials(password: &str) -> Credentials {
        Credentials::new("admin", hash_password(password, 4).unwrap())
    }

    #[tokio::test]
    async fn test_verify_correct() {
        let creds = credentials("s3cret");
        assert!(creds.verify("admin", &Password::new("s3cret")).await);
    }

    #[tokio::test]
    async fn test_verify_wrong_password() {
        let creds = credentials("s3cret");
        assert!(!creds.verify("admin", &Password::new("S3cret")).await);
        assert!(!creds.verify("admin", &Password::new("")).await);
    }

    #[tokio::test]
    async fn test_verify_wrong_username() {
        let creds = credentials("s3cret");
        assert!(!creds.verify("Admin", &Password::new("s3cret")).await);
        assert!(!creds.verify("", &Password::new("s3cret")).await);
    }

    #[tokio::test]
    async fn test_verify_malformed_hash() {
        let creds = Credentials::new("admin", "not-a-hash");
        assert!(!creds.verify("admin", &Password::new("anything")).await);
    }

    #[test]
    fn test_hash_password_format() {
        let hash = hash_password("pw", 4).unwrap();
        assert!(hash.starts_with("$2b$04$"));
        assert_eq!(hash.len(), 60);
    }

    #[test]
    fn test_debug_hides_hash() {
        let creds = credentials("pw");
        let debug = format!("{:?}", creds);
        assert!(debug.contains("admin"));
        assert!(!debug.contains("$2b$"));
    }
}
