//! Password reset token domain type.

use chrono::{DateTime, Utc};

use crime_track_core::{ResetCode, UserId};

/// An outstanding password reset for one user.
///
/// Keyed by user id, so a user has at most one token at a time. The token
/// stays valid until a password change consumes it.
#[derive(Debug, Clone)]
pub struct PasswordResetToken {
    /// Account the code was issued for.
    pub user_id: UserId,
    /// The emailed one-time code.
    pub code: ResetCode,
    /// When the code was issued.
    pub created_at: DateTime<Utc>,
}
