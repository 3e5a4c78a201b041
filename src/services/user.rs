//! User service
//!
//! Staff accounts and sessions:
//! - one-time setup of the first admin
//! - login/logout with session tokens
//! - password changes
//! - admin user management, guarded so the site never loses its last admin

use crate::db::repositories::{SessionRepository, UserRepository};
use crate::models::{
    CreateUserInput, ListParams, PagedResult, Session, UpdateUserInput, User, UserRole, UserStatus,
};
use crate::services::error::is_valid_email;
use crate::services::password::{hash_password, is_strong_enough, verify_password, MIN_PASSWORD_LEN};
use anyhow::Context;
use chrono::Duration;
use serde::Deserialize;
use std::sync::Arc;

/// Default session expiration time in days
const DEFAULT_SESSION_EXPIRATION_DAYS: i64 = 7;

/// Error types for user service operations
#[derive(Debug, thiserror::Error)]
pub enum UserServiceError {
    /// Authentication failed (invalid credentials, disabled account)
    #[error("Authentication failed: {0}")]
    AuthenticationError(String),

    /// The caller may not perform this action
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Validation error (invalid input)
    #[error("Validation error: {0}")]
    ValidationError(String),

    /// Username or email already taken
    #[error("User already exists: {0}")]
    UserExists(String),

    #[error("User not found")]
    NotFound,

    /// Internal error
    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

/// Input for the one-time admin setup
#[derive(Debug, Clone, Deserialize)]
pub struct SetupInput {
    pub username: String,
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub display_name: Option<String>,
}

/// Input for user login
#[derive(Debug, Clone, Deserialize)]
pub struct LoginInput {
    /// Username or email
    #[serde(alias = "username", alias = "email")]
    pub username_or_email: String,
    pub password: String,
}

impl LoginInput {
    pub fn new(username_or_email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username_or_email: username_or_email.into(),
            password: password.into(),
        }
    }
}

/// User service for managing users and authentication
pub struct UserService {
    user_repo: Arc<dyn UserRepository>,
    session_repo: Arc<dyn SessionRepository>,
    session_expiration_days: i64,
}

impl UserService {
    pub fn new(user_repo: Arc<dyn UserRepository>, session_repo: Arc<dyn SessionRepository>) -> Self {
        Self::with_session_expiration(user_repo, session_repo, DEFAULT_SESSION_EXPIRATION_DAYS)
    }

    /// Create a user service with a custom session lifetime
    pub fn with_session_expiration(
        user_repo: Arc<dyn UserRepository>,
        session_repo: Arc<dyn SessionRepository>,
        session_expiration_days: i64,
    ) -> Self {
        Self {
            user_repo,
            session_repo,
            session_expiration_days,
        }
    }

    /// Session lifetime, used for the cookie max-age
    pub fn session_lifetime(&self) -> Duration {
        Duration::days(self.session_expiration_days)
    }

    /// True once an active admin exists
    pub async fn has_admin(&self) -> Result<bool, UserServiceError> {
        let count = self
            .user_repo
            .count_active_admins()
            .await
            .context("Failed to count admins")?;
        Ok(count > 0)
    }

    /// Create the first admin account. Rejected once any user exists.
    pub async fn setup(&self, input: SetupInput) -> Result<User, UserServiceError> {
        let existing = self.user_repo.count().await.context("Failed to count users")?;
        if existing > 0 {
            return Err(UserServiceError::Forbidden(
                "Setup has already been completed".to_string(),
            ));
        }

        let user = self
            .create_user(CreateUserInput {
                username: input.username,
                email: input.email,
                password: input.password,
                display_name: input.display_name,
                role: UserRole::Admin,
            })
            .await?;
        tracing::info!("Initial admin '{}' created", user.username);
        Ok(user)
    }

    /// Verify credentials and open a session
    pub async fn login(&self, input: LoginInput) -> Result<(Session, User), UserServiceError> {
        let invalid = || {
            UserServiceError::AuthenticationError("Invalid username or password".to_string())
        };

        let user = self
            .find_user_by_username_or_email(input.username_or_email.trim())
            .await?
            .ok_or_else(invalid)?;

        let password_valid = verify_password(&input.password, &user.password_hash)
            .context("Failed to verify password")?;
        if !password_valid {
            return Err(invalid());
        }

        if !user.is_active() {
            return Err(UserServiceError::AuthenticationError(
                "This account has been disabled".to_string(),
            ));
        }

        let session = self.create_session(user.id).await?;
        Ok((session, user))
    }

    /// Invalidate a session. Unknown tokens are ignored.
    pub async fn logout(&self, session_id: &str) -> Result<(), UserServiceError> {
        self.session_repo
            .delete(session_id)
            .await
            .context("Failed to delete session")?;
        Ok(())
    }

    /// Resolve a session token to its user.
    ///
    /// Returns `None` for unknown or expired sessions and for disabled users.
    pub async fn validate_session(&self, token: &str) -> Result<Option<User>, UserServiceError> {
        let session = match self
            .session_repo
            .get_by_id(token)
            .await
            .context("Failed to get session")?
        {
            Some(s) => s,
            None => return Ok(None),
        };

        if session.is_expired() {
            let _ = self.session_repo.delete(token).await;
            return Ok(None);
        }

        let user = self
            .user_repo
            .get_by_id(session.user_id)
            .await
            .context("Failed to get user")?;

        Ok(user.filter(User::is_active))
    }

    pub async fn get_by_id(&self, id: i64) -> Result<Option<User>, UserServiceError> {
        let user = self
            .user_repo
            .get_by_id(id)
            .await
            .context("Failed to get user by ID")?;
        Ok(user)
    }

    /// Change the caller's own password after checking the current one
    pub async fn change_password(
        &self,
        user_id: i64,
        current_password: &str,
        new_password: &str,
    ) -> Result<(), UserServiceError> {
        let mut user = self.require_user(user_id).await?;

        let valid = verify_password(current_password, &user.password_hash)
            .context("Failed to verify password")?;
        if !valid {
            return Err(UserServiceError::AuthenticationError(
                "Current password is incorrect".to_string(),
            ));
        }
        validate_password(new_password)?;

        user.password_hash = hash_password(new_password).context("Failed to hash password")?;
        self.user_repo
            .update(&user)
            .await
            .context("Failed to update password")?;
        Ok(())
    }

    pub async fn list_users(&self, params: &ListParams) -> Result<PagedResult<User>, UserServiceError> {
        let (users, total) = self
            .user_repo
            .list(params)
            .await
            .context("Failed to list users")?;
        Ok(PagedResult::new(users, total, params))
    }

    /// Create a staff account
    pub async fn create_user(&self, input: CreateUserInput) -> Result<User, UserServiceError> {
        let username = input.username.trim().to_string();
        let email = input.email.trim().to_lowercase();
        validate_username(&username)?;
        validate_email(&email)?;
        validate_password(&input.password)?;

        if self
            .user_repo
            .get_by_username(&username)
            .await
            .context("Failed to check username")?
            .is_some()
        {
            return Err(UserServiceError::UserExists(format!(
                "Username '{}' is already taken",
                username
            )));
        }
        self.ensure_email_free(&email, None).await?;

        let password_hash = hash_password(&input.password).context("Failed to hash password")?;
        let mut user = User::new(username, email, password_hash, input.role);
        user.display_name = clean(input.display_name);

        let created = self
            .user_repo
            .create(&user)
            .await
            .context("Failed to create user")?;
        Ok(created)
    }

    /// Update a user on behalf of `actor` (an admin)
    pub async fn update_user(
        &self,
        actor: &User,
        id: i64,
        input: UpdateUserInput,
    ) -> Result<User, UserServiceError> {
        let mut user = self.require_user(id).await?;

        if let Some(email) = input.email {
            let email = email.trim().to_lowercase();
            validate_email(&email)?;
            self.ensure_email_free(&email, Some(user.id)).await?;
            user.email = email;
        }
        if let Some(display_name) = input.display_name {
            user.display_name = clean(Some(display_name));
        }

        let new_role = input.role.unwrap_or(user.role);
        let new_status = input.status.unwrap_or(user.status);

        if actor.id == user.id && new_status == UserStatus::Disabled {
            return Err(UserServiceError::Forbidden(
                "You cannot disable your own account".to_string(),
            ));
        }
        let loses_admin = user.is_admin()
            && user.is_active()
            && (new_role != UserRole::Admin || new_status != UserStatus::Active);
        if loses_admin {
            self.ensure_not_last_admin().await?;
        }
        user.role = new_role;
        user.status = new_status;

        let mut revoke_sessions = new_status == UserStatus::Disabled;
        if let Some(password) = input.password {
            validate_password(&password)?;
            user.password_hash = hash_password(&password).context("Failed to hash password")?;
            revoke_sessions = true;
        }

        let updated = self
            .user_repo
            .update(&user)
            .await
            .context("Failed to update user")?;

        if revoke_sessions && actor.id != user.id {
            self.session_repo
                .delete_by_user(user.id)
                .await
                .context("Failed to revoke sessions")?;
        }
        Ok(updated)
    }

    /// Delete a user on behalf of `actor`
    pub async fn delete_user(&self, actor: &User, id: i64) -> Result<(), UserServiceError> {
        if actor.id == id {
            return Err(UserServiceError::Forbidden(
                "You cannot delete your own account".to_string(),
            ));
        }
        let user = self.require_user(id).await?;
        if user.is_admin() && user.is_active() {
            self.ensure_not_last_admin().await?;
        }

        self.user_repo
            .delete(user.id)
            .await
            .context("Failed to delete user")?;
        Ok(())
    }

    /// Delete all expired sessions
    pub async fn cleanup_expired_sessions(&self) -> Result<u64, UserServiceError> {
        let count = self
            .session_repo
            .delete_expired()
            .await
            .context("Failed to delete expired sessions")?;
        Ok(count)
    }

    async fn require_user(&self, id: i64) -> Result<User, UserServiceError> {
        self.user_repo
            .get_by_id(id)
            .await
            .context("Failed to get user")?
            .ok_or(UserServiceError::NotFound)
    }

    async fn ensure_email_free(&self, email: &str, except: Option<i64>) -> Result<(), UserServiceError> {
        let existing = self
            .user_repo
            .get_by_email(email)
            .await
            .context("Failed to check email")?;
        match existing {
            Some(other) if Some(other.id) != except => Err(UserServiceError::UserExists(format!(
                "Email '{}' is already registered",
                email
            ))),
            _ => Ok(()),
        }
    }

    async fn ensure_not_last_admin(&self) -> Result<(), UserServiceError> {
        let admins = self
            .user_repo
            .count_active_admins()
            .await
            .context("Failed to count admins")?;
        if admins <= 1 {
            return Err(UserServiceError::Forbidden(
                "The last active admin cannot be removed, demoted or disabled".to_string(),
            ));
        }
        Ok(())
    }

    async fn find_user_by_username_or_email(
        &self,
        username_or_email: &str,
    ) -> Result<Option<User>, UserServiceError> {
        if let Some(user) = self
            .user_repo
            .get_by_username(username_or_email)
            .await
            .context("Failed to get user by username")?
        {
            return Ok(Some(user));
        }

        let user = self
            .user_repo
            .get_by_email(&username_or_email.to_lowercase())
            .await
            .context("Failed to get user by email")?;
        Ok(user)
    }

    async fn create_session(&self, user_id: i64) -> Result<Session, UserServiceError> {
        let session = Session::start(user_id, self.session_lifetime());
        let created = self
            .session_repo
            .create(&session)
            .await
            .context("Failed to create session")?;
        Ok(created)
    }
}

fn clean(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

fn validate_username(username: &str) -> Result<(), UserServiceError> {
    let len = username.chars().count();
    if !(3..=50).contains(&len) {
        return Err(UserServiceError::ValidationError(
            "Username must be between 3 and 50 characters".to_string(),
        ));
    }
    if !username
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.'))
    {
        return Err(UserServiceError::ValidationError(
            "Username may only contain letters, digits, '_', '-' and '.'".to_string(),
        ));
    }
    Ok(())
}

fn validate_email(email: &str) -> Result<(), UserServiceError> {
    if !is_valid_email(email) {
        return Err(UserServiceError::ValidationError("Invalid email format".to_string()));
    }
    Ok(())
}

fn validate_password(password: &str) -> Result<(), UserServiceError> {
    if !is_strong_enough(password) {
        return Err(UserServiceError::ValidationError(format!(
            "Password must be at least {} characters",
            MIN_PASSWORD_LEN
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::{SqlxSessionRepository, SqlxUserRepository};
    use crate::db::{create_test_pool, migrations};

    async fn setup_test_service() -> UserService {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");

        UserService::new(
            SqlxUserRepository::boxed(pool.clone()),
            SqlxSessionRepository::boxed(pool),
        )
    }

    fn setup_input(username: &str) -> SetupInput {
        SetupInput {
            username: username.to_string(),
            email: format!("{}@firm.example", username),
            password: "password123".to_string(),
            display_name: None,
        }
    }

    fn editor_input(username: &str) -> CreateUserInput {
        CreateUserInput {
            username: username.to_string(),
            email: format!("{}@firm.example", username),
            password: "password123".to_string(),
            display_name: Some("  Staff Member ".to_string()),
            role: UserRole::Editor,
        }
    }

    #[tokio::test]
    async fn test_setup_creates_admin_once() {
        let service = setup_test_service().await;
        assert!(!service.has_admin().await.unwrap());

        let admin = service.setup(setup_input("partner")).await.unwrap();
        assert_eq!(admin.role, UserRole::Admin);
        assert!(service.has_admin().await.unwrap());

        let again = service.setup(setup_input("intruder")).await;
        assert!(matches!(again, Err(UserServiceError::Forbidden(_))));
    }

    #[tokio::test]
    async fn test_create_user_validation() {
        let service = setup_test_service().await;

        let mut short_password = editor_input("clerk");
        short_password.password = "short".to_string();
        assert!(matches!(
            service.create_user(short_password).await,
            Err(UserServiceError::ValidationError(_))
        ));

        let mut bad_email = editor_input("clerk");
        bad_email.email = "not-an-email".to_string();
        assert!(matches!(
            service.create_user(bad_email).await,
            Err(UserServiceError::ValidationError(_))
        ));

        let created = service.create_user(editor_input("clerk")).await.unwrap();
        assert_eq!(created.display_name.as_deref(), Some("Staff Member"));
        assert!(matches!(
            service.create_user(editor_input("clerk")).await,
            Err(UserServiceError::UserExists(_))
        ));
    }

    #[tokio::test]
    async fn test_login_with_username_or_email() {
        let service = setup_test_service().await;
        service.setup(setup_input("partner")).await.unwrap();

        let (session, user) = service
            .login(LoginInput::new("partner", "password123"))
            .await
            .unwrap();
        assert_eq!(user.username, "partner");
        assert!(!session.is_expired());

        let (_, by_email) = service
            .login(LoginInput::new("Partner@Firm.example", "password123"))
            .await
            .unwrap();
        assert_eq!(by_email.id, user.id);
    }

    #[tokio::test]
    async fn test_login_failures() {
        let service = setup_test_service().await;
        service.setup(setup_input("partner")).await.unwrap();

        assert!(matches!(
            service.login(LoginInput::new("partner", "wrongpassword")).await,
            Err(UserServiceError::AuthenticationError(_))
        ));
        assert!(matches!(
            service.login(LoginInput::new("nobody", "password123")).await,
            Err(UserServiceError::AuthenticationError(_))
        ));
    }

    #[tokio::test]
    async fn test_disabled_user_cannot_login() {
        let service = setup_test_service().await;
        let admin = service.setup(setup_input("partner")).await.unwrap();
        let clerk = service.create_user(editor_input("clerk")).await.unwrap();
        let (session, _) = service
            .login(LoginInput::new("clerk", "password123"))
            .await
            .unwrap();

        service
            .update_user(
                &admin,
                clerk.id,
                UpdateUserInput {
                    status: Some(UserStatus::Disabled),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        assert!(service.validate_session(&session.id).await.unwrap().is_none());
        assert!(matches!(
            service.login(LoginInput::new("clerk", "password123")).await,
            Err(UserServiceError::AuthenticationError(_))
        ));
    }

    #[tokio::test]
    async fn test_session_lifecycle() {
        let service = setup_test_service().await;
        let admin = service.setup(setup_input("partner")).await.unwrap();
        let (session, _) = service
            .login(LoginInput::new("partner", "password123"))
            .await
            .unwrap();

        let user = service.validate_session(&session.id).await.unwrap().unwrap();
        assert_eq!(user.id, admin.id);

        service.logout(&session.id).await.unwrap();
        assert!(service.validate_session(&session.id).await.unwrap().is_none());
        assert!(service.logout("unknown-token").await.is_ok());
    }

    #[tokio::test]
    async fn test_expired_session_is_rejected_and_cleaned() {
        let pool = create_test_pool().await.unwrap();
        migrations::run_migrations(&pool).await.unwrap();
        let service = UserService::with_session_expiration(
            SqlxUserRepository::boxed(pool.clone()),
            SqlxSessionRepository::boxed(pool),
            -1,
        );
        service.setup(setup_input("partner")).await.unwrap();
        let (session, _) = service
            .login(LoginInput::new("partner", "password123"))
            .await
            .unwrap();
        service
            .login(LoginInput::new("partner", "password123"))
            .await
            .unwrap();

        assert!(service.validate_session(&session.id).await.unwrap().is_none());
        assert_eq!(service.cleanup_expired_sessions().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_change_password() {
        let service = setup_test_service().await;
        let admin = service.setup(setup_input("partner")).await.unwrap();

        assert!(matches!(
            service.change_password(admin.id, "wrong-current", "newpassword1").await,
            Err(UserServiceError::AuthenticationError(_))
        ));
        assert!(matches!(
            service.change_password(admin.id, "password123", "short").await,
            Err(UserServiceError::ValidationError(_))
        ));

        service
            .change_password(admin.id, "password123", "newpassword1")
            .await
            .unwrap();
        assert!(service.login(LoginInput::new("partner", "newpassword1")).await.is_ok());
        assert!(service.login(LoginInput::new("partner", "password123")).await.is_err());
    }

    #[tokio::test]
    async fn test_admin_self_and_last_admin_guards() {
        let service = setup_test_service().await;
        let admin = service.setup(setup_input("partner")).await.unwrap();

        assert!(matches!(
            service.delete_user(&admin, admin.id).await,
            Err(UserServiceError::Forbidden(_))
        ));
        assert!(matches!(
            service
                .update_user(
                    &admin,
                    admin.id,
                    UpdateUserInput {
                        status: Some(UserStatus::Disabled),
                        ..Default::default()
                    },
                )
                .await,
            Err(UserServiceError::Forbidden(_))
        ));
        assert!(matches!(
            service
                .update_user(
                    &admin,
                    admin.id,
                    UpdateUserInput {
                        role: Some(UserRole::Editor),
                        ..Default::default()
                    },
                )
                .await,
            Err(UserServiceError::Forbidden(_))
        ));

        // With a second admin the first one may step down
        let mut second = editor_input("associate");
        second.role = UserRole::Admin;
        let second = service.create_user(second).await.unwrap();
        let demoted = service
            .update_user(
                &second,
                admin.id,
                UpdateUserInput {
                    role: Some(UserRole::Editor),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(demoted.role, UserRole::Editor);

        // Now `second` is the last admin and cannot be deleted
        assert!(matches!(
            service.delete_user(&demoted, second.id).await,
            Err(UserServiceError::Forbidden(_))
        ));
        service.delete_user(&second, demoted.id).await.unwrap();
        assert!(service.get_by_id(demoted.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_update_user_email_conflict_and_list() {
        let service = setup_test_service().await;
        let admin = service.setup(setup_input("partner")).await.unwrap();
        let clerk = service.create_user(editor_input("clerk")).await.unwrap();

        let conflict = service
            .update_user(
                &admin,
                clerk.id,
                UpdateUserInput {
                    email: Some("partner@firm.example".to_string()),
                    ..Default::default()
                },
            )
            .await;
        assert!(matches!(conflict, Err(UserServiceError::UserExists(_))));

        let page = service.list_users(&ListParams::default()).await.unwrap();
        assert_eq!(page.total, 2);
        assert_eq!(page.items.len(), 2);
    }
}
