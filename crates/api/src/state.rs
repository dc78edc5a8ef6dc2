//! Application state shared across handlers.

use std::sync::Arc;

use sqlx::PgPool;

use crate::config::ApiConfig;
use crate::db::{
    CriminalRepository, CriminalStore, ResetTokenRepository, ResetTokenStore, UserRepository,
    UserStore,
};
use crate::services::auth::TokenSigner;
use crate::services::email::{EmailService, Mailer};
use crate::services::images::{CloudinaryClient, ImageHost, ImageHostError};

/// Error building application state from configuration.
#[derive(Debug, thiserror::Error)]
pub enum StateError {
    #[error("invalid SMTP configuration: {0}")]
    Smtp(#[from] lettre::transport::smtp::Error),
    #[error("invalid image host configuration: {0}")]
    ImageHost(#[from] ImageHostError),
}

/// Storage and provider implementations used by handlers.
pub struct Backends {
    pub users: Arc<dyn UserStore>,
    pub criminals: Arc<dyn CriminalStore>,
    pub reset_tokens: Arc<dyn ResetTokenStore>,
    pub mailer: Arc<dyn Mailer>,
    pub images: Arc<dyn ImageHost>,
}

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc`.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: ApiConfig,
    signer: TokenSigner,
    backends: Backends,
    /// Present in production; used by the readiness check.
    pool: Option<PgPool>,
}

impl AppState {
    /// Create application state backed by `PostgreSQL`, SMTP and Cloudinary.
    ///
    /// # Errors
    ///
    /// Returns an error if the SMTP relay or HTTP client cannot be configured.
    pub fn new(config: ApiConfig, pool: PgPool) -> Result<Self, StateError> {
        let backends = Backends {
            users: Arc::new(UserRepository::new(pool.clone())),
            criminals: Arc::new(CriminalRepository::new(pool.clone())),
            reset_tokens: Arc::new(ResetTokenRepository::new(pool.clone())),
            mailer: Arc::new(EmailService::new(&config.email)?),
            images: Arc::new(CloudinaryClient::new(&config.cloudinary)?),
        };

        Ok(Self::with_backends(config, backends, Some(pool)))
    }

    /// Create application state from explicit backends.
    #[must_use]
    pub fn with_backends(config: ApiConfig, backends: Backends, pool: Option<PgPool>) -> Self {
        let signer = TokenSigner::new(
            config.auth.jwt_secret.clone(),
            config.auth.token_ttl_days,
        );

        Self {
            inner: Arc::new(AppStateInner {
                config,
                signer,
                backends,
                pool,
            }),
        }
    }

    #[must_use]
    pub fn config(&self) -> &ApiConfig {
        &self.inner.config
    }

    /// Auth token signer.
    #[must_use]
    pub fn signer(&self) -> &TokenSigner {
        &self.inner.signer
    }

    /// Database pool, if running against `PostgreSQL`.
    #[must_use]
    pub fn pool(&self) -> Option<&PgPool> {
        self.inner.pool.as_ref()
    }

    #[must_use]
    pub fn users(&self) -> &dyn UserStore {
        self.inner.backends.users.as_ref()
    }

    #[must_use]
    pub fn criminals(&self) -> &dyn CriminalStore {
        self.inner.backends.criminals.as_ref()
    }

    #[must_use]
    pub fn reset_tokens(&self) -> &dyn ResetTokenStore {
        self.inner.backends.reset_tokens.as_ref()
    }

    #[must_use]
    pub fn mailer(&self) -> &dyn Mailer {
        self.inner.backends.mailer.as_ref()
    }

    #[must_use]
    pub fn images(&self) -> &dyn ImageHost {
        self.inner.backends.images.as_ref()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::db::memory::{MemoryCriminalStore, MemoryResetTokenStore, MemoryUserStore};
    use crate::services::email::tests::RecordingMailer;
    use crate::services::images::tests::RecordingImageHost;

    /// In-memory backends with handles kept for assertions.
    #[derive(Clone, Default)]
    pub(crate) struct TestDeps {
        pub users: Arc<MemoryUserStore>,
        pub criminals: Arc<MemoryCriminalStore>,
        pub reset_tokens: Arc<MemoryResetTokenStore>,
        pub mailer: Arc<RecordingMailer>,
        pub images: Arc<RecordingImageHost>,
    }

    impl TestDeps {
        pub(crate) fn state(&self) -> AppState {
            self.state_with(ApiConfig::for_tests())
        }

        pub(crate) fn state_with(&self, config: ApiConfig) -> AppState {
            AppState::with_backends(
                config,
                Backends {
                    users: self.users.clone(),
                    criminals: self.criminals.clone(),
                    reset_tokens: self.reset_tokens.clone(),
                    mailer: self.mailer.clone(),
                    images: self.images.clone(),
                },
                None,
            )
        }
    }

    pub(crate) fn test_state() -> (AppState, TestDeps) {
        let deps = TestDeps::default();
        (deps.state(), deps)
    }
}
