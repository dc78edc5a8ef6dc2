//! Account service.
//!
//! Registration, login, profile and password changes, the emailed-code
//! password reset flow, and profile images.

use thiserror::Error;

use crime_track_core::{Email, ResetCode, UserId};

use crate::db::{RepositoryError, ResetTokenStore, UserStore};
use crate::error::AppError;
use crate::models::{NewUser, PasswordResetToken, User};
use crate::services::auth::{AuthError, hash_password, verify_password};
use crate::services::email::{EmailError, Mailer};
use crate::services::images::{ImageHost, ImageHostError};
use crate::state::AppState;

/// Errors raised by account operations.
///
/// The display text of each client-facing variant is the exact response body.
#[derive(Debug, Error)]
pub enum AccountError {
    #[error("User already exists!")]
    UserAlreadyExists,

    #[error("Invalid email or password!")]
    InvalidLogin,

    #[error("Passwords do not match!")]
    PasswordMismatch,

    #[error("Invalid current password")]
    InvalidCurrentPassword,

    #[error("The email provided doesn't match any existing user! Please sign up now!")]
    UnknownResetEmail,

    #[error("A verification code has already been dispatched to your email!")]
    ResetAlreadyPending,

    #[error("Internal server error!")]
    UnknownVerifyEmail,

    #[error("Invalid reset code!")]
    InvalidResetCode,

    /// New/confirm mismatch during an emailed-code reset.
    #[error("Passwords do not match!")]
    ResetPasswordMismatch,

    #[error("An error occurred! User not found!")]
    ResetUserNotFound,

    #[error("Invalid reset code! Please try again")]
    ResetCodeRejected,

    #[error(transparent)]
    Repository(#[from] RepositoryError),

    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error(transparent)]
    Email(#[from] EmailError),

    #[error(transparent)]
    ImageHost(#[from] ImageHostError),
}

impl From<AccountError> for AppError {
    fn from(err: AccountError) -> Self {
        match err {
            AccountError::UserAlreadyExists
            | AccountError::InvalidLogin
            | AccountError::PasswordMismatch
            | AccountError::InvalidCurrentPassword => Self::BadRequest(err.to_string()),
            AccountError::UnknownResetEmail
            | AccountError::ResetAlreadyPending
            | AccountError::UnknownVerifyEmail
            | AccountError::InvalidResetCode
            | AccountError::ResetPasswordMismatch
            | AccountError::ResetUserNotFound
            | AccountError::ResetCodeRejected => Self::Unauthorized(err.to_string()),
            AccountError::Repository(e) => Self::Database(e),
            AccountError::Auth(e) => Self::Auth(e),
            AccountError::Email(e) => Self::Email(e),
            AccountError::ImageHost(e) => Self::ImageHost(e),
        }
    }
}

/// Account operations over the configured stores and providers.
pub struct AccountService<'a> {
    users: &'a dyn UserStore,
    reset_tokens: &'a dyn ResetTokenStore,
    mailer: &'a dyn Mailer,
    images: &'a dyn ImageHost,
}

impl<'a> AccountService<'a> {
    /// Create a new account service from application state.
    #[must_use]
    pub fn new(state: &'a AppState) -> Self {
        Self {
            users: state.users(),
            reset_tokens: state.reset_tokens(),
            mailer: state.mailer(),
            images: state.images(),
        }
    }

    // =========================================================================
    // Registration & Login
    // =========================================================================

    /// Register a new account.
    ///
    /// # Errors
    ///
    /// Returns `AccountError::UserAlreadyExists` if the email is registered.
    pub async fn register(
        &self,
        name: String,
        email: Email,
        password: &str,
        phone_number: Option<String>,
    ) -> Result<User, AccountError> {
        if self.users.find_by_email(&email).await?.is_some() {
            return Err(AccountError::UserAlreadyExists);
        }

        let password_hash = hash_password(password)?;
        let user = self
            .users
            .create(NewUser {
                name,
                email,
                password_hash,
                phone_number: phone_number.filter(|p| !p.is_empty()),
            })
            .await
            .map_err(|e| match e {
                RepositoryError::Conflict(_) => AccountError::UserAlreadyExists,
                other => AccountError::Repository(other),
            })?;

        tracing::info!(user_id = %user.id, "User registered");
        Ok(user)
    }

    /// Check an email/password pair.
    ///
    /// # Errors
    ///
    /// Returns `AccountError::InvalidLogin` for an unknown email or wrong password.
    pub async fn login(&self, email: &Email, password: &str) -> Result<User, AccountError> {
        let user = self
            .users
            .find_by_email(email)
            .await?
            .ok_or(AccountError::InvalidLogin)?;

        verify_password(password, &user.password_hash).map_err(|_| AccountError::InvalidLogin)?;
        Ok(user)
    }

    // =========================================================================
    // Profile
    // =========================================================================

    /// Update name and phone number. Absent or empty values keep the current ones.
    ///
    /// # Errors
    ///
    /// Returns `AccountError::Repository` if the save fails.
    pub async fn update_profile(
        &self,
        mut user: User,
        name: Option<String>,
        phone_number: Option<String>,
    ) -> Result<User, AccountError> {
        if let Some(name) = name.filter(|n| !n.is_empty()) {
            user.name = name;
        }
        if let Some(phone_number) = phone_number.filter(|p| !p.is_empty()) {
            user.phone_number = Some(phone_number);
        }

        Ok(self.users.save(&user).await?)
    }

    /// Change the password of a signed-in user.
    ///
    /// # Errors
    ///
    /// Returns `AccountError::PasswordMismatch` if `new` and `confirm` differ,
    /// `AccountError::InvalidCurrentPassword` if `current` is wrong.
    pub async fn change_password(
        &self,
        mut user: User,
        current: &str,
        new: &str,
        confirm: &str,
    ) -> Result<(), AccountError> {
        if new != confirm {
            return Err(AccountError::PasswordMismatch);
        }
        verify_password(current, &user.password_hash)
            .map_err(|_| AccountError::InvalidCurrentPassword)?;

        user.password_hash = hash_password(new)?;
        self.users.save(&user).await?;

        tracing::info!(user_id = %user.id, "Password changed");
        Ok(())
    }

    /// Replace the profile image, destroying the previous asset first.
    ///
    /// # Errors
    ///
    /// Returns `AccountError::ImageHost` if the destroy or upload fails.
    pub async fn replace_image(&self, mut user: User, source: &str) -> Result<User, AccountError> {
        if let Some(previous) = user.image_id.as_deref() {
            self.images.destroy(previous).await?;
        }

        let uploaded = self.images.upload(source).await?;
        user.image = Some(uploaded.url);
        user.image_id = Some(uploaded.public_id);

        Ok(self.users.save(&user).await?)
    }

    // =========================================================================
    // Password Reset
    // =========================================================================

    /// Issue a reset code for `email` and send it.
    ///
    /// The code is only kept if the email goes out.
    ///
    /// # Errors
    ///
    /// Returns `AccountError::UnknownResetEmail` for an unknown email,
    /// `AccountError::ResetAlreadyPending` if a code is outstanding, and
    /// `AccountError::Email` if sending fails.
    pub async fn request_reset(&self, email: &Email) -> Result<(), AccountError> {
        let user = self
            .users
            .find_by_email(email)
            .await?
            .ok_or(AccountError::UnknownResetEmail)?;

        if self.reset_tokens.find_for_user(user.id).await?.is_some() {
            return Err(AccountError::ResetAlreadyPending);
        }

        let token = PasswordResetToken {
            user_id: user.id,
            code: ResetCode::generate(),
            created_at: chrono::Utc::now(),
        };
        self.reset_tokens.insert(&token).await.map_err(|e| match e {
            RepositoryError::Conflict(_) => AccountError::ResetAlreadyPending,
            other => AccountError::Repository(other),
        })?;

        if let Err(e) = self
            .mailer
            .send_reset_code(&user.email, &user.name, &token.code)
            .await
        {
            self.reset_tokens.delete_for_user(user.id).await?;
            return Err(e.into());
        }

        tracing::info!(user_id = %user.id, "Password reset code sent");
        Ok(())
    }

    /// Check a submitted code and return the account it unlocks.
    ///
    /// # Errors
    ///
    /// Returns `AccountError::UnknownVerifyEmail` for an unknown email and
    /// `AccountError::InvalidResetCode` if there is no matching code.
    pub async fn verify_code(
        &self,
        email: &Email,
        code: Option<&ResetCode>,
    ) -> Result<UserId, AccountError> {
        let user = self
            .users
            .find_by_email(email)
            .await?
            .ok_or(AccountError::UnknownVerifyEmail)?;

        if self.code_matches(user.id, code).await? {
            Ok(user.id)
        } else {
            Err(AccountError::InvalidResetCode)
        }
    }

    /// Set a new password using an emailed code.
    ///
    /// The code is consumed atomically before the password is saved, so
    /// concurrent requests with the same code change the password at most once.
    ///
    /// # Errors
    ///
    /// Returns `AccountError::ResetPasswordMismatch`,
    /// `AccountError::ResetUserNotFound` or `AccountError::ResetCodeRejected`,
    /// checked in that order.
    pub async fn complete_reset(
        &self,
        user_id: Option<UserId>,
        code: Option<&ResetCode>,
        new: &str,
        confirm: &str,
    ) -> Result<(), AccountError> {
        if new != confirm {
            return Err(AccountError::ResetPasswordMismatch);
        }

        let mut user = match user_id {
            Some(id) => self.users.find_by_id(id).await?,
            None => None,
        }
        .ok_or(AccountError::ResetUserNotFound)?;

        let code = code.ok_or(AccountError::ResetCodeRejected)?;
        let password_hash = hash_password(new)?;

        if !self.reset_tokens.consume(user.id, code).await? {
            return Err(AccountError::ResetCodeRejected);
        }

        user.password_hash = password_hash;
        self.users.save(&user).await?;

        tracing::info!(user_id = %user.id, "Password reset completed");
        Ok(())
    }

    async fn code_matches(
        &self,
        user_id: UserId,
        code: Option<&ResetCode>,
    ) -> Result<bool, AccountError> {
        let Some(code) = code else {
            return Ok(false);
        };
        let stored = self.reset_tokens.find_for_user(user_id).await?;
        Ok(stored.is_some_and(|token| token.code.matches(code)))
    }
}
