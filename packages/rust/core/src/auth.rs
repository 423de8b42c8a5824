//! Credential check for the two built-in accounts.

use sha2::{Digest, Sha256};
use tracing::{debug, warn};

use coursewise_shared::{CoursewiseError, Result, UsersConfig};

/// What a logged-in session may do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Admin,
    User,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Admin => "Admin",
            Self::User => "User",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone)]
struct Account {
    username: String,
    password_digest: [u8; 32],
    role: Role,
}

impl Account {
    fn new(username: &str, password: &str, role: Role) -> Self {
        Self {
            username: username.to_string(),
            password_digest: digest(password),
            role,
        }
    }
}

/// The admin and user accounts. Passwords are held only as SHA-256 digests.
#[derive(Debug, Clone)]
pub struct UserDirectory {
    accounts: Vec<Account>,
}

impl UserDirectory {
    /// Directory with both accounts given explicitly.
    pub fn new(admin: (&str, &str), user: (&str, &str)) -> Self {
        Self {
            accounts: vec![
                Account::new(admin.0, admin.1, Role::Admin),
                Account::new(user.0, user.1, Role::User),
            ],
        }
    }

    /// Resolve the accounts from the `[users]` section, reading each password
    /// from the environment variable it names. An account whose variable is
    /// unset is disabled; at least one must be available.
    pub fn from_config(config: &UsersConfig) -> Result<Self> {
        let mut accounts = Vec::with_capacity(2);
        for (username, env_name, role) in [
            (&config.admin_username, &config.admin_password_env, Role::Admin),
            (&config.user_username, &config.user_password_env, Role::User),
        ] {
            match std::env::var(env_name) {
                Ok(password) if !password.is_empty() => {
                    accounts.push(Account::new(username, &password, role));
                }
                _ => warn!(username = %username, env = %env_name, "password not set, account disabled"),
            }
        }

        if accounts.is_empty() {
            return Err(CoursewiseError::config(format!(
                "no login accounts configured. Set {} and/or {}",
                config.admin_password_env, config.user_password_env
            )));
        }
        Ok(Self { accounts })
    }

    /// Role for a matching username/password pair.
    pub fn authenticate(&self, username: &str, password: &str) -> Option<Role> {
        let candidate = digest(password);
        let role = self
            .accounts
            .iter()
            .find(|a| a.username == username && a.password_digest == candidate)
            .map(|a| a.role);
        debug!(username, authenticated = role.is_some(), "credential check");
        role
    }
}

fn digest(secret: &str) -> [u8; 32] {
    Sha256::digest(secret.as_bytes()).into()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn directory() -> UserDirectory {
        UserDirectory::new(("admin", "s3cret"), ("user", "letmein"))
    }

    #[test]
    fn matching_pairs_get_their_role() {
        let dir = directory();
        assert_eq!(dir.authenticate("admin", "s3cret"), Some(Role::Admin));
        assert_eq!(dir.authenticate("user", "letmein"), Some(Role::User));
    }

    #[test]
    fn crossed_or_wrong_credentials_are_rejected() {
        let dir = directory();
        assert_eq!(dir.authenticate("admin", "letmein"), None);
        assert_eq!(dir.authenticate("user", "s3cret"), None);
        assert_eq!(dir.authenticate("root", "s3cret"), None);
        assert_eq!(dir.authenticate("admin", ""), None);
    }

    #[test]
    fn from_config_requires_some_password() {
        let config = UsersConfig {
            admin_password_env: "COURSEWISE_TEST_UNSET_ADMIN_PW".into(),
            user_password_env: "COURSEWISE_TEST_UNSET_USER_PW".into(),
            ..UsersConfig::default()
        };
        let err = UserDirectory::from_config(&config).unwrap_err();
        assert!(err.to_string().contains("COURSEWISE_TEST_UNSET_ADMIN_PW"));
    }
}
