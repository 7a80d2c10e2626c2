use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::ids::UserId;

const MIN_PASSWORD_LEN: usize = 6;
const MIN_NAME_LEN: usize = 2;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum IdentityError {
    #[error("email is required")]
    EmailRequired,

    #[error("email is not valid")]
    InvalidEmail,

    #[error("password is required")]
    PasswordRequired,

    #[error("password must be at least 6 characters")]
    PasswordTooShort,

    #[error("name is required")]
    NameRequired,

    #[error("name must be at least 2 characters")]
    NameTooShort,
}

/// Access level of the current principal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[default]
    Guest,
    #[serde(rename = "student", alias = "learner")]
    Learner,
    Admin,
}

impl Role {
    #[must_use]
    pub fn is_admin(self) -> bool {
        matches!(self, Role::Admin)
    }
}

/// The signed-in learner or admin that results are attributed to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    id: UserId,
    name: String,
    email: String,
    role: Role,
}

impl Identity {
    #[must_use]
    pub fn new(id: UserId, name: impl Into<String>, email: impl Into<String>, role: Role) -> Self {
        Self {
            id,
            name: name.into(),
            email: email.into(),
            role,
        }
    }

    #[must_use]
    pub fn id(&self) -> UserId {
        self.id
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn email(&self) -> &str {
        &self.email
    }

    #[must_use]
    pub fn role(&self) -> Role {
        self.role
    }

    #[must_use]
    pub fn is_admin(&self) -> bool {
        self.role.is_admin()
    }
}

/// Validated login input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    email: String,
    password: String,
}

impl Credentials {
    /// # Errors
    ///
    /// Returns `IdentityError` if the email or password is missing or malformed.
    pub fn new(email: &str, password: &str) -> Result<Self, IdentityError> {
        Ok(Self {
            email: validate_email(email)?,
            password: validate_password(password)?,
        })
    }

    #[must_use]
    pub fn email(&self) -> &str {
        &self.email
    }

    #[must_use]
    pub fn password(&self) -> &str {
        &self.password
    }
}

/// Validated sign-up input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Registration {
    name: String,
    credentials: Credentials,
}

impl Registration {
    /// # Errors
    ///
    /// Returns `IdentityError` if the name, email or password is invalid.
    pub fn new(name: &str, email: &str, password: &str) -> Result<Self, IdentityError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(IdentityError::NameRequired);
        }
        if name.chars().count() < MIN_NAME_LEN {
            return Err(IdentityError::NameTooShort);
        }
        Ok(Self {
            name: name.to_string(),
            credentials: Credentials::new(email, password)?,
        })
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn credentials(&self) -> &Credentials {
        &self.credentials
    }
}

fn validate_email(raw: &str) -> Result<String, IdentityError> {
    let email = raw.trim();
    if email.is_empty() {
        return Err(IdentityError::EmailRequired);
    }
    if !looks_like_email(email) {
        return Err(IdentityError::InvalidEmail);
    }
    Ok(email.to_string())
}

fn validate_password(raw: &str) -> Result<String, IdentityError> {
    if raw.is_empty() {
        return Err(IdentityError::PasswordRequired);
    }
    if raw.chars().count() < MIN_PASSWORD_LEN {
        return Err(IdentityError::PasswordTooShort);
    }
    Ok(raw.to_string())
}

// local@domain.tld, no whitespace, exactly one '@'
fn looks_like_email(email: &str) -> bool {
    if email.chars().any(char::is_whitespace) {
        return false;
    }
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    if local.is_empty() || domain.contains('@') {
        return false;
    }
    match domain.rsplit_once('.') {
        Some((host, tld)) => !host.is_empty() && !tld.is_empty(),
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn credentials_validate_email_shape() {
        assert!(Credentials::new("ann@example.com", "secret1").is_ok());
        assert_eq!(
            Credentials::new("", "secret1").unwrap_err(),
            IdentityError::EmailRequired
        );
        for bad in ["ann", "ann@", "@x.io", "ann@host", "a b@x.io", "a@b@c.io", "ann@.io"] {
            assert_eq!(
                Credentials::new(bad, "secret1").unwrap_err(),
                IdentityError::InvalidEmail,
                "{bad}"
            );
        }
    }

    #[test]
    fn credentials_validate_password() {
        assert_eq!(
            Credentials::new("a@b.io", "").unwrap_err(),
            IdentityError::PasswordRequired
        );
        assert_eq!(
            Credentials::new("a@b.io", "12345").unwrap_err(),
            IdentityError::PasswordTooShort
        );
    }

    #[test]
    fn registration_requires_name() {
        assert_eq!(
            Registration::new(" ", "a@b.io", "secret1").unwrap_err(),
            IdentityError::NameRequired
        );
        assert_eq!(
            Registration::new("A", "a@b.io", "secret1").unwrap_err(),
            IdentityError::NameTooShort
        );
        let reg = Registration::new(" Ann ", "a@b.io", "secret1").unwrap();
        assert_eq!(reg.name(), "Ann");
        assert_eq!(reg.credentials().email(), "a@b.io");
    }

    #[test]
    fn roles() {
        assert_eq!(Role::default(), Role::Guest);
        assert!(Role::Admin.is_admin());
        let learner = Identity::new(UserId::new(1), "Ann", "a@b.io", Role::Learner);
        assert!(!learner.is_admin());
    }
}
