use anyhow::Context;
use tracing::{info, instrument, warn};

use crate::auth::{
    claims::Identity,
    dto::{LoginInput, LoginResponse, PublicUser, RegisterInput},
    error::AuthError,
    jwt::JwtKeys,
    password::{hash_password, is_valid_password_format, verify_password},
    repo::{InsertError, UserStore},
    repo_types::NewUser,
};

/// Creates an account. Identity conflicts are reported before password policy.
#[instrument(skip(store, input), fields(username = %input.username))]
pub async fn register(store: &dyn UserStore, input: RegisterInput) -> Result<PublicUser, AuthError> {
    if store.find_by_username(&input.username).await?.is_some() {
        warn!("username already registered");
        return Err(AuthError::UserAlreadyExists);
    }
    if store.find_by_email(&input.email).await?.is_some() {
        warn!(email = %input.email, "email already registered");
        return Err(AuthError::UserAlreadyExists);
    }
    if !is_valid_password_format(input.password.as_str()) {
        warn!("password rejected by policy");
        return Err(AuthError::InvalidPassword);
    }

    let RegisterInput {
        username,
        password,
        email,
        is_admin,
    } = input;
    let hashed = tokio::task::spawn_blocking(move || hash_password(&password))
        .await
        .context("hash task failed")??;

    let user = store
        .insert(NewUser {
            username,
            email,
            hash: hashed.hash,
            salt: hashed.salt,
            is_admin: is_admin.unwrap_or(false),
        })
        .await
        .map_err(|e| match e {
            InsertError::Conflict => {
                warn!("unique constraint hit on insert");
                AuthError::UserAlreadyExists
            }
            InsertError::Other(e) => AuthError::Internal(e),
        })?;

    info!(user_id = user.id, is_admin = user.is_admin, "user registered");
    Ok(user.into())
}

/// Checks credentials and issues an access token.
#[instrument(skip(store, keys, input), fields(username = %input.username))]
pub async fn login(
    store: &dyn UserStore,
    keys: &JwtKeys,
    input: LoginInput,
) -> Result<LoginResponse, AuthError> {
    let Some(user) = store.find_by_username(&input.username).await? else {
        warn!("login unknown username");
        return Err(AuthError::InvalidCredentials);
    };

    let password = input.password;
    let (hash, salt) = (user.hash.clone(), user.salt.clone());
    let ok = tokio::task::spawn_blocking(move || verify_password(&password, &hash, &salt))
        .await
        .context("verify task failed")?;
    if !ok {
        warn!(user_id = user.id, "login invalid password");
        return Err(AuthError::InvalidCredentials);
    }

    let identity = Identity {
        id: user.id,
        username: user.username,
        is_admin: user.is_admin,
    };
    let access_token = keys.sign(&identity)?;

    info!(user_id = identity.id, "user logged in");
    Ok(LoginResponse { access_token })
}

/// Loads the account a token was issued for. The username must still match.
#[instrument(skip(store))]
pub async fn find_user(store: &dyn UserStore, id: i64, username: &str) -> Result<PublicUser, AuthError> {
    match store.find_by_id(id).await? {
        Some(user) if user.username == username => Ok(user.into()),
        _ => Err(AuthError::UserNotFound),
    }
}

/// Loads any account by id.
#[instrument(skip(store))]
pub async fn find_user_by_id(store: &dyn UserStore, id: i64) -> Result<PublicUser, AuthError> {
    store
        .find_by_id(id)
        .await?
        .map(PublicUser::from)
        .ok_or(AuthError::UserNotFound)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{repo::MemoryUserStore, repo_types::User};
    use axum::async_trait;
    use std::time::Duration;

    fn keys() -> JwtKeys {
        JwtKeys::new(b"service-test-secret", Duration::from_secs(60 * 60))
    }

    fn reg(username: &str, password: &str, email: &str) -> RegisterInput {
        RegisterInput {
            username: username.into(),
            password: password.into(),
            email: email.into(),
            is_admin: None,
        }
    }

    fn creds(username: &str, password: &str) -> LoginInput {
        LoginInput {
            username: username.into(),
            password: password.into(),
        }
    }

    #[tokio::test]
    async fn register_returns_public_view() {
        let store = MemoryUserStore::default();
        let user = register(&store, reg("alice", "password1", "a@x.com")).await.unwrap();
        assert_eq!(user.username, "alice");
        assert_eq!(user.email, "a@x.com");
        assert!(!user.is_admin);

        let stored = store.find_by_id(user.id).await.unwrap().unwrap();
        assert_ne!(stored.hash, "password1");
        assert!(verify_password("password1", &stored.hash, &stored.salt));
    }

    #[tokio::test]
    async fn register_honours_admin_flag() {
        let store = MemoryUserStore::default();
        let mut input = reg("root", "password1", "root@x.com");
        input.is_admin = Some(true);
        assert!(register(&store, input).await.unwrap().is_admin);
    }

    #[tokio::test]
    async fn register_rejects_duplicate_username() {
        let store = MemoryUserStore::default();
        register(&store, reg("alice", "password1", "a@x.com")).await.unwrap();
        let err = register(&store, reg("alice", "password1", "other@x.com")).await.unwrap_err();
        assert!(matches!(err, AuthError::UserAlreadyExists));
    }

    #[tokio::test]
    async fn register_rejects_duplicate_email() {
        let store = MemoryUserStore::default();
        register(&store, reg("alice", "password1", "a@x.com")).await.unwrap();
        let err = register(&store, reg("bob", "password1", "a@x.com")).await.unwrap_err();
        assert!(matches!(err, AuthError::UserAlreadyExists));
    }

    #[tokio::test]
    async fn identity_conflicts_win_over_password_policy() {
        let store = MemoryUserStore::default();
        register(&store, reg("alice", "password1", "a@x.com")).await.unwrap();
        let err = register(&store, reg("alice", "alllower", "z@x.com")).await.unwrap_err();
        assert!(matches!(err, AuthError::UserAlreadyExists));
    }

    #[tokio::test]
    async fn register_applies_password_policy() {
        let store = MemoryUserStore::default();
        for weak in ["short1", "alllower", "12345678"] {
            let err = register(&store, reg("carol", weak, "c@x.com")).await.unwrap_err();
            assert!(matches!(err, AuthError::InvalidPassword), "{weak} should be rejected");
        }
        assert!(store.find_by_username("carol").await.unwrap().is_none());
        register(&store, reg("carol", "password1", "c@x.com")).await.unwrap();
    }

    /// Lookups miss, as when a concurrent registration commits between check and insert.
    struct RacingStore(MemoryUserStore);

    #[async_trait]
    impl UserStore for RacingStore {
        async fn find_by_username(&self, _: &str) -> anyhow::Result<Option<User>> {
            Ok(None)
        }
        async fn find_by_email(&self, _: &str) -> anyhow::Result<Option<User>> {
            Ok(None)
        }
        async fn find_by_id(&self, id: i64) -> anyhow::Result<Option<User>> {
            self.0.find_by_id(id).await
        }
        async fn insert(&self, user: NewUser) -> Result<User, InsertError> {
            self.0.insert(user).await
        }
    }

    #[tokio::test]
    async fn insert_conflict_is_reported_as_existing_user() {
        let store = RacingStore(MemoryUserStore::default());
        register(&store, reg("alice", "password1", "a@x.com")).await.unwrap();
        let err = register(&store, reg("alice", "password1", "a@x.com")).await.unwrap_err();
        assert!(matches!(err, AuthError::UserAlreadyExists));
    }

    #[tokio::test]
    async fn login_issues_token_with_identity() {
        let store = MemoryUserStore::default();
        let user = register(&store, reg("alice", "password1", "a@x.com")).await.unwrap();
        let keys = keys();

        let res = login(&store, &keys, creds("alice", "password1")).await.unwrap();
        let claims = keys.verify(&res.access_token).unwrap();
        assert_eq!(claims.identity.id, user.id);
        assert_eq!(claims.identity.username, "alice");
        assert!(!claims.identity.is_admin);
        assert!(claims.exp > claims.iat);
    }

    #[tokio::test]
    async fn login_failures_are_indistinguishable() {
        let store = MemoryUserStore::default();
        register(&store, reg("alice", "password1", "a@x.com")).await.unwrap();
        let keys = keys();

        let wrong_password = login(&store, &keys, creds("alice", "password2")).await.unwrap_err();
        let unknown_user = login(&store, &keys, creds("mallory", "password1")).await.unwrap_err();
        assert!(matches!(wrong_password, AuthError::InvalidCredentials));
        assert!(matches!(unknown_user, AuthError::InvalidCredentials));
        assert_eq!(wrong_password.to_string(), unknown_user.to_string());
    }

    #[tokio::test]
    async fn find_user_requires_matching_username() {
        let store = MemoryUserStore::default();
        let user = register(&store, reg("alice", "password1", "a@x.com")).await.unwrap();

        assert_eq!(find_user(&store, user.id, "alice").await.unwrap(), user);
        assert!(matches!(
            find_user(&store, user.id, "bob").await.unwrap_err(),
            AuthError::UserNotFound
        ));
        assert!(matches!(
            find_user_by_id(&store, 999).await.unwrap_err(),
            AuthError::UserNotFound
        ));
    }
}
