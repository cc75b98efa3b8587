//! Authentication and user management service

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use chrono::Utc;

use crate::{
    config::{AuthConfig, BootstrapAdmin},
    error::{AppError, AppResult},
    models::{NewUser, Permission, User, UserClaims},
    repository::Repository,
};

/// Token issued on a successful login
#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub token: String,
    /// Lifetime in seconds
    pub expires_in: i64,
    pub user: User,
}

#[derive(Clone)]
pub struct UsersService {
    repository: Repository,
    config: AuthConfig,
}

impl UsersService {
    pub fn new(repository: Repository, config: AuthConfig) -> Self {
        Self { repository, config }
    }

    /// Authenticate by username and password and return a JWT token
    pub async fn authenticate(&self, username: &str, password: &str) -> AppResult<IssuedToken> {
        let user = self
            .repository
            .users
            .get_by_username(username)
            .await?
            .ok_or_else(|| AppError::Authentication("Invalid username or password".to_string()))?;

        if !self.verify_password(&user, password)? {
            return Err(AppError::Authentication(
                "Invalid username or password".to_string(),
            ));
        }

        if !user.is_active {
            return Err(AppError::Authentication("This account is inactive".to_string()));
        }

        let (token, expires_in) = self.create_token_for_user(&user).await?;
        tracing::info!(user_id = user.id, username = %user.username, "User logged in");

        Ok(IssuedToken {
            token,
            expires_in,
            user,
        })
    }

    /// Create JWT token for a user, embedding their permissions
    async fn create_token_for_user(&self, user: &User) -> AppResult<(String, i64)> {
        let permissions = self.repository.users.permissions(user.id).await?;

        let now = Utc::now().timestamp();
        let expires_in = self.config.jwt_expiration_hours as i64 * 3600;

        let claims = UserClaims {
            sub: user.username.clone(),
            user_id: user.id,
            is_superuser: user.is_superuser,
            permissions,
            exp: now + expires_in,
            iat: now,
        };

        let token = claims
            .create_token(&self.config.jwt_secret)
            .map_err(|e| AppError::Internal(format!("Failed to create token: {}", e)))?;

        Ok((token, expires_in))
    }

    /// Decode a bearer token into claims
    pub fn decode_token(&self, token: &str) -> AppResult<UserClaims> {
        UserClaims::from_token(token, &self.config.jwt_secret)
            .map_err(|_| AppError::Authentication("Invalid or expired token".to_string()))
    }

    /// Decode a bearer token and refresh it against the account as it is now.
    /// Deactivated or deleted accounts are rejected; permissions come from the database.
    pub async fn authenticate_token(&self, token: &str) -> AppResult<UserClaims> {
        let mut claims = self.decode_token(token)?;

        let user = match self.repository.users.get_by_id(claims.user_id).await {
            Ok(user) => user,
            Err(AppError::NotFound(_)) => {
                return Err(AppError::Authentication("Unknown account".to_string()))
            }
            Err(e) => return Err(e),
        };
        if !user.is_active {
            return Err(AppError::Authentication("This account is inactive".to_string()));
        }

        claims.permissions = self.repository.users.permissions(user.id).await?;
        claims.is_superuser = user.is_superuser;
        claims.sub = user.username;
        Ok(claims)
    }

    fn verify_password(&self, user: &User, password: &str) -> AppResult<bool> {
        let parsed_hash = PasswordHash::new(&user.password)
            .map_err(|_| AppError::Internal("Invalid password hash".to_string()))?;
        Ok(Argon2::default()
            .verify_password(password.as_bytes(), &parsed_hash)
            .is_ok())
    }

    /// Hash a password using Argon2
    pub fn hash_password(&self, password: &str) -> AppResult<String> {
        let salt = SaltString::generate(&mut OsRng);
        let argon2 = Argon2::default();
        let hash = argon2
            .hash_password(password.as_bytes(), &salt)
            .map_err(|e| AppError::Internal(format!("Failed to hash password: {}", e)))?;
        Ok(hash.to_string())
    }

    /// Create a new user
    pub async fn create_user(&self, user: &NewUser) -> AppResult<User> {
        if user.username.trim().is_empty() {
            return Err(AppError::Validation("Username is required".to_string()));
        }
        if self.repository.users.username_exists(&user.username).await? {
            return Err(AppError::Conflict(format!(
                "Username '{}' already exists",
                user.username
            )));
        }

        let hash = self.hash_password(&user.password)?;
        let created = self.repository.users.create(user, &hash).await?;
        tracing::info!(user_id = created.id, username = %created.username, "User created");
        Ok(created)
    }

    pub async fn grant(&self, user_id: i32, permission: Permission) -> AppResult<()> {
        self.repository.users.grant(user_id, permission).await?;
        tracing::info!(user_id, permission = %permission, "Permission granted");
        Ok(())
    }

    /// Create the configured superuser unless the username is taken; returns whether one was created
    pub async fn ensure_bootstrap_admin(&self, admin: &BootstrapAdmin) -> AppResult<bool> {
        if self.repository.users.username_exists(&admin.username).await? {
            tracing::debug!(username = %admin.username, "Bootstrap admin already present");
            return Ok(false);
        }

        self.create_user(&NewUser {
            username: admin.username.clone(),
            password: admin.password.clone(),
            is_superuser: true,
            ..Default::default()
        })
        .await?;
        tracing::warn!(username = %admin.username, "Bootstrap superuser created");
        Ok(true)
    }
}
