//! User service: registration, profiles, passwords and API tokens.

use std::sync::Arc;

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use foodgram_common::{
    AppError, AppResult, DefaultPasswordPolicy, IdGenerator, PasswordContext, PasswordPolicy,
};
use foodgram_db::{
    entities::user,
    repositories::{SubscriptionRepository, UserRepository},
};
use sea_orm::Set;
use serde::Deserialize;
use tracing::info;
use validator::{Validate, ValidationError};

use crate::views::{Page, UserProfile};

const INVALID_CREDENTIALS: &str = "Unable to log in with provided credentials.";

/// User service for business logic.
#[derive(Clone)]
pub struct UserService {
    user_repo: UserRepository,
    subscription_repo: SubscriptionRepository,
    password_policy: Arc<dyn PasswordPolicy>,
    id_gen: IdGenerator,
}

/// Input for registering a new user.
#[derive(Debug, Deserialize, Validate)]
pub struct RegisterInput {
    /// Unique login email.
    #[validate(
        email(message = "Enter a valid email address."),
        length(max = 254, message = "Ensure this field has no more than 254 characters.")
    )]
    pub email: String,

    /// Unique public handle.
    #[validate(
        length(min = 1, max = 150, message = "Ensure this field has 1 to 150 characters."),
        custom(function = "validate_username")
    )]
    pub username: String,

    /// Given name.
    #[validate(length(min = 1, max = 150, message = "Ensure this field has 1 to 150 characters."))]
    pub first_name: String,

    /// Family name.
    #[validate(length(min = 1, max = 150, message = "Ensure this field has 1 to 150 characters."))]
    pub last_name: String,

    /// Plain-text password, checked against the password policy.
    #[validate(length(max = 128, message = "Ensure this field has no more than 128 characters."))]
    pub password: String,
}

/// Input for changing the caller's password.
#[derive(Debug, Deserialize, Validate)]
pub struct SetPasswordInput {
    /// Replacement password.
    #[validate(length(max = 128, message = "Ensure this field has no more than 128 characters."))]
    pub new_password: String,

    /// Password the caller currently logs in with.
    #[validate(length(max = 128, message = "Ensure this field has no more than 128 characters."))]
    pub current_password: String,
}

/// Credentials for obtaining a token.
#[derive(Debug, Deserialize, Validate)]
pub struct LoginInput {
    /// Account email.
    #[validate(email(message = "Enter a valid email address."))]
    pub email: String,

    /// Account password.
    pub password: String,
}

/// Letters, digits and `.@+-_` only.
fn validate_username(username: &str) -> Result<(), ValidationError> {
    let valid = username
        .chars()
        .all(|c| c.is_alphanumeric() || matches!(c, '_' | '.' | '@' | '+' | '-'));
    if valid {
        Ok(())
    } else {
        let mut err = ValidationError::new("username");
        err.message = Some(
            "Enter a valid username. This value may contain only letters, numbers, and @/./+/-/_ characters."
                .into(),
        );
        Err(err)
    }
}

impl UserService {
    /// Create a new user service.
    #[must_use]
    pub fn new(
        user_repo: UserRepository,
        subscription_repo: SubscriptionRepository,
        password_policy: Arc<dyn PasswordPolicy>,
    ) -> Self {
        Self {
            user_repo,
            subscription_repo,
            password_policy,
            id_gen: IdGenerator::new(),
        }
    }

    /// Create a service using [`DefaultPasswordPolicy`].
    #[must_use]
    pub fn with_default_policy(
        user_repo: UserRepository,
        subscription_repo: SubscriptionRepository,
    ) -> Self {
        Self::new(
            user_repo,
            subscription_repo,
            Arc::new(DefaultPasswordPolicy::new()),
        )
    }

    /// Register a new user. The account starts without a token.
    pub async fn register(&self, input: RegisterInput) -> AppResult<user::Model> {
        input.validate()?;

        let context = PasswordContext {
            username: &input.username,
            email: &input.email,
            first_name: &input.first_name,
            last_name: &input.last_name,
        };
        self.check_password("password", &input.password, &context)?;

        if self.user_repo.find_by_email(&input.email).await?.is_some() {
            return Err(AppError::field("email", "A user with that email already exists."));
        }
        if self.user_repo.find_by_username(&input.username).await?.is_some() {
            return Err(AppError::field("username", "A user with that username already exists."));
        }

        let password_hash = hash_password(&input.password)?;

        let model = user::ActiveModel {
            id: Set(self.id_gen.generate()),
            email: Set(input.email),
            username: Set(input.username),
            first_name: Set(input.first_name),
            last_name: Set(input.last_name),
            password: Set(password_hash),
            token: Set(None),
            created_at: Set(chrono::Utc::now().into()),
        };

        let user = self.user_repo.create(model).await?;
        info!(user_id = %user.id, username = %user.username, "User registered");

        Ok(user)
    }

    /// Get a user by ID.
    pub async fn get(&self, id: &str) -> AppResult<user::Model> {
        self.user_repo.get_by_id(id).await
    }

    /// Profile of `user` relative to `viewer`.
    pub async fn profile(
        &self,
        viewer: Option<&user::Model>,
        user: &user::Model,
    ) -> AppResult<UserProfile> {
        let is_subscribed = match viewer {
            Some(v) if v.id != user.id => {
                self.subscription_repo.is_subscribed(&v.id, &user.id).await?
            }
            _ => false,
        };
        Ok(UserProfile::new(user, is_subscribed))
    }

    /// Profiles of several users relative to `viewer`, in input order.
    pub async fn profiles(
        &self,
        viewer: Option<&user::Model>,
        users: &[user::Model],
    ) -> AppResult<Vec<UserProfile>> {
        let subscribed = match viewer {
            Some(v) => {
                let ids: Vec<String> = users.iter().map(|u| u.id.clone()).collect();
                self.subscription_repo.subscribed_author_ids(&v.id, &ids).await?
            }
            None => std::collections::HashSet::new(),
        };

        Ok(users
            .iter()
            .map(|u| UserProfile::new(u, subscribed.contains(&u.id)))
            .collect())
    }

    /// List users in registration order.
    pub async fn list(
        &self,
        viewer: Option<&user::Model>,
        limit: u64,
        offset: u64,
    ) -> AppResult<Page<UserProfile>> {
        let users = self.user_repo.find_page(limit, offset).await?;
        let count = self.user_repo.count().await?;
        let profiles = self.profiles(viewer, &users).await?;
        Ok(Page::new(profiles, count))
    }

    /// Change the password of `user` after verifying the current one.
    pub async fn set_password(&self, user: &user::Model, input: SetPasswordInput) -> AppResult<()> {
        input.validate()?;

        if !verify_password(&input.current_password, &user.password)? {
            return Err(AppError::field(
                "current_password",
                "The current password is incorrect.",
            ));
        }

        let context = PasswordContext {
            username: &user.username,
            email: &user.email,
            first_name: &user.first_name,
            last_name: &user.last_name,
        };
        self.check_password("new_password", &input.new_password, &context)?;

        let password_hash = hash_password(&input.new_password)?;
        self.user_repo.set_password(&user.id, password_hash).await?;
        info!(user_id = %user.id, "Password changed");

        Ok(())
    }

    /// Exchange credentials for the user's token, issuing one if needed.
    pub async fn login(&self, input: LoginInput) -> AppResult<String> {
        input.validate()?;

        let user = self
            .user_repo
            .find_by_email(&input.email)
            .await?
            .ok_or_else(|| AppError::BadRequest(INVALID_CREDENTIALS.to_string()))?;

        if !verify_password(&input.password, &user.password)? {
            return Err(AppError::BadRequest(INVALID_CREDENTIALS.to_string()));
        }

        if let Some(token) = user.token {
            return Ok(token);
        }

        let token = self.id_gen.generate_token();
        self.user_repo.set_token(&user.id, Some(token.clone())).await?;
        info!(user_id = %user.id, "Token issued");

        Ok(token)
    }

    /// Revoke the user's token.
    pub async fn logout(&self, user: &user::Model) -> AppResult<()> {
        self.user_repo.set_token(&user.id, None).await?;
        info!(user_id = %user.id, "Token revoked");
        Ok(())
    }

    /// Authenticate a user by token.
    pub async fn authenticate_by_token(&self, token: &str) -> AppResult<user::Model> {
        self.user_repo
            .find_by_token(token)
            .await?
            .ok_or(AppError::Unauthorized)
    }

    fn check_password(
        &self,
        field: &str,
        password: &str,
        context: &PasswordContext<'_>,
    ) -> AppResult<()> {
        self.password_policy
            .check(password, context)
            .map_err(|failures| AppError::field(field, failures.join(" ")))
    }
}

/// Hash a password using Argon2.
fn hash_password(password: &str) -> AppResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();

    argon2
        .hash_password(password.as_bytes(), &salt)
        .map(|h| h.to_string())
        .map_err(|e| AppError::Internal(format!("Failed to hash password: {e}")))
}

/// Verify a password against a hash.
fn verify_password(password: &str, hash: &str) -> AppResult<bool> {
    let parsed_hash =
        PasswordHash::new(hash).map_err(|e| AppError::Internal(format!("Invalid hash: {e}")))?;

    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::Utc;
    use foodgram_db::entities::subscription;
    use sea_orm::{DatabaseBackend, DatabaseConnection, MockDatabase, MockExecResult};

    fn create_test_user(id: &str, username: &str, password: &str) -> user::Model {
        user::Model {
            id: id.to_string(),
            email: format!("{username}@example.com"),
            username: username.to_string(),
            first_name: "Test".to_string(),
            last_name: "Cook".to_string(),
            password: hash_password(password).unwrap(),
            token: None,
            created_at: Utc::now().into(),
        }
    }

    fn create_test_service(db: MockDatabase) -> UserService {
        let db: Arc<DatabaseConnection> = Arc::new(db.into_connection());
        UserService::with_default_policy(
            UserRepository::new(Arc::clone(&db)),
            SubscriptionRepository::new(db),
        )
    }

    fn register_input(password: &str) -> RegisterInput {
        RegisterInput {
            email: "chef@example.com".to_string(),
            username: "chef".to_string(),
            first_name: "Julia".to_string(),
            last_name: "Child".to_string(),
            password: password.to_string(),
        }
    }

    #[test]
    fn test_hash_password() {
        let hash = hash_password("secure_password").unwrap();
        assert!(hash.starts_with("$argon2"));
    }

    #[test]
    fn test_verify_password_correct() {
        let hash = hash_password("secure_password").unwrap();
        assert!(verify_password("secure_password", &hash).unwrap());
    }

    #[test]
    fn test_verify_password_incorrect() {
        let hash = hash_password("secure_password").unwrap();
        assert!(!verify_password("wrong_password", &hash).unwrap());
    }

    #[test]
    fn test_verify_password_invalid_hash() {
        assert!(verify_password("password", "not-a-hash").is_err());
    }

    #[test]
    fn test_register_input_validation() {
        let mut input = register_input("tomato-basil-42");
        assert!(input.validate().is_ok());

        input.username = "bad name!".to_string();
        assert!(input.validate().is_err());

        let mut input = register_input("tomato-basil-42");
        input.email = "not-an-email".to_string();
        assert!(input.validate().is_err());

        let mut input = register_input("tomato-basil-42");
        input.first_name = "a".repeat(151);
        assert!(input.validate().is_err());
    }

    #[tokio::test]
    async fn test_register_rejects_weak_password() {
        let service = create_test_service(MockDatabase::new(DatabaseBackend::Postgres));

        let err = service.register(register_input("12345")).await.unwrap_err();

        match err {
            AppError::InvalidField { field, message } => {
                assert_eq!(field, "password");
                assert!(message.contains("too short"));
                assert!(message.contains("entirely numeric"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_register_rejects_taken_email() {
        let existing = create_test_user("user1", "chef", "whatever-pass-1");
        let service = create_test_service(
            MockDatabase::new(DatabaseBackend::Postgres).append_query_results([[existing]]),
        );

        let err = service
            .register(register_input("tomato-basil-42"))
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::InvalidField { field, .. } if field == "email"));
    }

    #[tokio::test]
    async fn test_register_creates_user_without_token() {
        let created = create_test_user("user1", "chef", "tomato-basil-42");
        let service = create_test_service(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([Vec::<user::Model>::new(), Vec::new()])
                .append_query_results([[created.clone()]]),
        );

        let user = service.register(register_input("tomato-basil-42")).await.unwrap();

        assert_eq!(user.id, "user1");
        assert!(user.token.is_none());
    }

    #[tokio::test]
    async fn test_login_unknown_email() {
        let service = create_test_service(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([Vec::<user::Model>::new()]),
        );

        let err = service
            .login(LoginInput {
                email: "nobody@example.com".to_string(),
                password: "whatever".to_string(),
            })
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::BadRequest(_)));
    }

    #[tokio::test]
    async fn test_login_wrong_password() {
        let user = create_test_user("user1", "chef", "right-password");
        let service = create_test_service(
            MockDatabase::new(DatabaseBackend::Postgres).append_query_results([[user]]),
        );

        let err = service
            .login(LoginInput {
                email: "chef@example.com".to_string(),
                password: "wrong-password".to_string(),
            })
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::BadRequest(_)));
    }

    #[tokio::test]
    async fn test_login_reuses_existing_token() {
        let mut user = create_test_user("user1", "chef", "right-password");
        user.token = Some("existing-token".to_string());
        let service = create_test_service(
            MockDatabase::new(DatabaseBackend::Postgres).append_query_results([[user]]),
        );

        let token = service
            .login(LoginInput {
                email: "chef@example.com".to_string(),
                password: "right-password".to_string(),
            })
            .await
            .unwrap();

        assert_eq!(token, "existing-token");
    }

    #[tokio::test]
    async fn test_login_issues_token() {
        let user = create_test_user("user1", "chef", "right-password");
        let service = create_test_service(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([[user]])
                .append_exec_results([MockExecResult {
                    last_insert_id: 0,
                    rows_affected: 1,
                }]),
        );

        let token = service
            .login(LoginInput {
                email: "chef@example.com".to_string(),
                password: "right-password".to_string(),
            })
            .await
            .unwrap();

        assert_eq!(token.len(), 40);
    }

    #[tokio::test]
    async fn test_set_password_wrong_current() {
        let user = create_test_user("user1", "chef", "old-password-1");
        let service = create_test_service(MockDatabase::new(DatabaseBackend::Postgres));

        let err = service
            .set_password(
                &user,
                SetPasswordInput {
                    new_password: "brand-new-secret-9".to_string(),
                    current_password: "not-the-password".to_string(),
                },
            )
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::InvalidField { field, .. } if field == "current_password"));
    }

    #[tokio::test]
    async fn test_set_password_weak_new() {
        let user = create_test_user("user1", "chef", "old-password-1");
        let service = create_test_service(MockDatabase::new(DatabaseBackend::Postgres));

        let err = service
            .set_password(
                &user,
                SetPasswordInput {
                    new_password: "short".to_string(),
                    current_password: "old-password-1".to_string(),
                },
            )
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::InvalidField { field, .. } if field == "new_password"));
    }

    #[tokio::test]
    async fn test_authenticate_by_token_not_found() {
        let service = create_test_service(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([Vec::<user::Model>::new()]),
        );

        let result = service.authenticate_by_token("invalid_token").await;
        assert!(matches!(result, Err(AppError::Unauthorized)));
    }

    #[tokio::test]
    async fn test_profile_is_subscribed() {
        let viewer = create_test_user("user1", "reader", "pw-irrelevant");
        let author = create_test_user("user2", "author", "pw-irrelevant");
        let service = create_test_service(
            MockDatabase::new(DatabaseBackend::Postgres).append_query_results([[
                subscription::Model {
                    id: "s1".to_string(),
                    subscriber_id: "user1".to_string(),
                    author_id: "user2".to_string(),
                    created_at: Utc::now().into(),
                },
            ]]),
        );

        let profile = service.profile(Some(&viewer), &author).await.unwrap();
        assert!(profile.is_subscribed);

        // Self and anonymous views never hit the database.
        assert!(!service.profile(Some(&author), &author).await.unwrap().is_subscribed);
        assert!(!service.profile(None, &author).await.unwrap().is_subscribed);
    }
}
