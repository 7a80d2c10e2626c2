use std::sync::{Arc, PoisonError, RwLock};

use tracing::{info, warn};

use quiz_core::model::{Credentials, Identity, Registration, Role};
use storage::records::{self, UserRecord};
use storage::repository::{Collection, PersistentStore, RemoteDataSource, Storage, keys};

use crate::Clock;
use crate::error::AuthError;

/// Access requirement of a screen or action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    Public,
    /// Any signed-in user.
    Authenticated,
    /// Only when nobody is signed in (login, registration).
    GuestOnly,
    Admin,
}

/// Holds the signed-in identity and mirrors it to the local store.
pub struct SessionStore {
    clock: Clock,
    remote: Arc<dyn RemoteDataSource>,
    local: Arc<dyn PersistentStore>,
    current: RwLock<Option<Identity>>,
}

impl SessionStore {
    #[must_use]
    pub fn new(clock: Clock, storage: &Storage) -> Self {
        Self {
            clock,
            remote: Arc::clone(&storage.remote),
            local: Arc::clone(&storage.local),
            current: RwLock::new(None),
        }
    }

    #[must_use]
    pub fn identity(&self) -> Option<Identity> {
        self.current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.identity().is_some()
    }

    /// Role of the signed-in user, `Guest` when nobody is.
    #[must_use]
    pub fn role(&self) -> Role {
        self.identity().map_or(Role::Guest, |i| i.role())
    }

    #[must_use]
    pub fn is_admin(&self) -> bool {
        self.role().is_admin()
    }

    #[must_use]
    pub fn can_access(&self, access: Access) -> bool {
        match access {
            Access::Public => true,
            Access::Authenticated => self.is_authenticated(),
            Access::GuestOnly => !self.is_authenticated(),
            Access::Admin => self.is_admin(),
        }
    }

    /// Sign in with email and password.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Validation` for malformed input,
    /// `AuthError::InvalidCredentials` if no user matches and `AuthError::Storage`
    /// if the users cannot be fetched.
    pub async fn login(&self, email: &str, password: &str) -> Result<Identity, AuthError> {
        let credentials = Credentials::new(email, password)?;
        let users: Vec<UserRecord> =
            records::fetch_all(self.remote.as_ref(), Collection::Users).await?;

        let user = users
            .into_iter()
            .find(|u| {
                u.email.eq_ignore_ascii_case(credentials.email())
                    && u.password.as_deref() == Some(credentials.password())
            })
            .ok_or(AuthError::InvalidCredentials)?;

        let identity = user.into_identity()?;
        info!(user_id = %identity.id(), role = ?identity.role(), "signed in");
        self.sign_in(identity.clone());
        Ok(identity)
    }

    /// Create a learner account and sign it in.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Validation` for malformed input, `AuthError::EmailTaken`
    /// for a known email and `AuthError::Storage` if the write fails.
    pub async fn register(
        &self,
        name: &str,
        email: &str,
        password: &str,
    ) -> Result<Identity, AuthError> {
        let registration = Registration::new(name, email, password)?;
        let credentials = registration.credentials();
        let users: Vec<UserRecord> =
            records::fetch_all(self.remote.as_ref(), Collection::Users).await?;
        if users
            .iter()
            .any(|u| u.email.eq_ignore_ascii_case(credentials.email()))
        {
            return Err(AuthError::EmailTaken);
        }

        let record = UserRecord {
            id: None,
            name: registration.name().to_string(),
            email: credentials.email().to_string(),
            password: Some(credentials.password().to_string()),
            role: Role::Learner,
            created_at: Some(self.clock.now()),
        };
        let stored = records::create(self.remote.as_ref(), Collection::Users, &record).await?;
        let identity = stored.into_identity()?;
        info!(user_id = %identity.id(), "registered");
        self.sign_in(identity.clone());
        Ok(identity)
    }

    pub fn logout(&self) {
        *self.current.write().unwrap_or_else(PoisonError::into_inner) = None;
        if let Err(e) = self.local.remove(keys::USER) {
            warn!(error = %e, "could not clear stored identity");
        }
        info!("signed out");
    }

    /// Rehydrate the identity saved by an earlier sign-in, if any.
    pub fn restore(&self) -> Option<Identity> {
        let stored = records::read_local::<UserRecord>(self.local.as_ref(), keys::USER)
            .map_err(|e| warn!(error = %e, "stored identity is unreadable"))
            .ok()
            .flatten()?;
        let identity = stored
            .into_identity()
            .map_err(|e| warn!(error = %e, "stored identity is incomplete"))
            .ok()?;
        *self.current.write().unwrap_or_else(PoisonError::into_inner) = Some(identity.clone());
        Some(identity)
    }

    fn sign_in(&self, identity: Identity) {
        let record = UserRecord::from_identity(&identity);
        if let Err(e) = records::write_local(self.local.as_ref(), keys::USER, &record) {
            warn!(error = %e, "could not persist identity; session will not survive restart");
        }
        *self.current.write().unwrap_or_else(PoisonError::into_inner) = Some(identity);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quiz_core::model::{IdentityError, UserId};
    use quiz_core::time::fixed_clock;
    use serde_json::json;
    use storage::memory::{InMemoryRemote, MemoryStore};

    async fn fixture() -> (InMemoryRemote, MemoryStore, SessionStore) {
        let remote = InMemoryRemote::new();
        let local = MemoryStore::new();
        remote
            .create(
                Collection::Users,
                json!({"id": 1, "name": "Admin", "email": "admin@quiz.com", "password": "admin123", "role": "admin"}),
            )
            .await
            .unwrap();
        remote
            .create(
                Collection::Users,
                json!({"id": 2, "name": "Student", "email": "student@quiz.com", "password": "student123", "role": "student"}),
            )
            .await
            .unwrap();
        let storage = Storage::new(Arc::new(remote.clone()), Arc::new(local.clone()));
        let store = SessionStore::new(fixed_clock(), &storage);
        (remote, local, store)
    }

    #[tokio::test]
    async fn guest_by_default() {
        let (_, _, store) = fixture().await;
        assert_eq!(store.role(), Role::Guest);
        assert!(store.can_access(Access::Public));
        assert!(store.can_access(Access::GuestOnly));
        assert!(!store.can_access(Access::Authenticated));
        assert!(!store.can_access(Access::Admin));
    }

    #[tokio::test]
    async fn login_sets_identity_and_persists_it() {
        let (_, local, store) = fixture().await;
        let identity = store.login("ADMIN@quiz.com", "admin123").await.unwrap();
        assert_eq!(identity.id(), UserId::new(1));
        assert!(store.is_admin());
        assert!(store.can_access(Access::Admin));
        assert!(!store.can_access(Access::GuestOnly));

        let saved = local.get(keys::USER).unwrap();
        assert!(!saved.contains("admin123"));
    }

    #[tokio::test]
    async fn login_rejects_bad_password_and_bad_input() {
        let (_, _, store) = fixture().await;
        assert!(matches!(
            store.login("student@quiz.com", "wrong-pass").await.unwrap_err(),
            AuthError::InvalidCredentials
        ));
        assert!(matches!(
            store.login("not-an-email", "student123").await.unwrap_err(),
            AuthError::Validation(IdentityError::InvalidEmail)
        ));
        assert!(!store.is_authenticated());
    }

    #[tokio::test]
    async fn register_creates_learner() {
        let (remote, _, store) = fixture().await;
        let identity = store
            .register("New Learner", "new@quiz.com", "secret1")
            .await
            .unwrap();
        assert_eq!(identity.role(), Role::Learner);
        assert_eq!(identity.id(), UserId::new(3));
        assert_eq!(remote.len(Collection::Users), 3);
        assert!(store.can_access(Access::Authenticated));
        assert!(!store.is_admin());

        store.logout();
        assert!(store.login("new@quiz.com", "secret1").await.is_ok());
    }

    #[tokio::test]
    async fn register_rejects_taken_email_and_short_name() {
        let (_, _, store) = fixture().await;
        assert!(matches!(
            store
                .register("Someone", "Student@quiz.com", "secret1")
                .await
                .unwrap_err(),
            AuthError::EmailTaken
        ));
        assert!(matches!(
            store.register("A", "a@quiz.com", "secret1").await.unwrap_err(),
            AuthError::Validation(IdentityError::NameTooShort)
        ));
    }

    #[tokio::test]
    async fn logout_and_restore() {
        let (remote, local, store) = fixture().await;
        store.login("student@quiz.com", "student123").await.unwrap();

        let storage = Storage::new(Arc::new(remote), Arc::new(local.clone()));
        let restarted = SessionStore::new(fixed_clock(), &storage);
        let restored = restarted.restore().unwrap();
        assert_eq!(restored.name(), "Student");
        assert_eq!(restarted.role(), Role::Learner);

        restarted.logout();
        assert!(!restarted.is_authenticated());
        assert!(local.get(keys::USER).is_none());
        assert!(restarted.restore().is_none());
    }

    #[tokio::test]
    async fn offline_login_reports_storage_error() {
        let (remote, _, store) = fixture().await;
        remote.set_offline(true);
        assert!(matches!(
            store.login("student@quiz.com", "student123").await.unwrap_err(),
            AuthError::Storage(_)
        ));
    }
}
