//! Email service for sending password reset codes.
//!
//! Uses SMTP via lettre for delivery with Askama templates for the
//! plain-text and HTML bodies.

use askama::Template;
use async_trait::async_trait;
use lettre::{
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
    message::{MultiPart, SinglePart, header::ContentType},
    transport::smtp::{Error as SmtpError, authentication::Credentials},
};
use secrecy::ExposeSecret;
use thiserror::Error;

use crime_track_core::{Email, ResetCode};

use crate::config::EmailConfig;

const RESET_CODE_SUBJECT: &str = "Verification code";

/// HTML template for the reset code email.
#[derive(Template)]
#[template(path = "email/reset_code.html")]
struct ResetCodeEmailHtml<'a> {
    name: &'a str,
    code: &'a str,
}

/// Plain text template for the reset code email.
#[derive(Template)]
#[template(path = "email/reset_code.txt")]
struct ResetCodeEmailText<'a> {
    name: &'a str,
    code: &'a str,
}

/// Errors that can occur when sending email.
#[derive(Debug, Error)]
pub enum EmailError {
    /// SMTP transport error.
    #[error("SMTP error: {0}")]
    Smtp(#[from] SmtpError),

    /// Failed to build email message.
    #[error("Failed to build message: {0}")]
    MessageBuild(#[from] lettre::error::Error),

    /// Invalid email address.
    #[error("Invalid email address: {0}")]
    InvalidAddress(String),

    /// Template rendering error.
    #[error("Template error: {0}")]
    Template(#[from] askama::Error),
}

/// Outbound transactional email.
#[async_trait]
pub trait Mailer: Send + Sync {
    /// Email a password reset code to `to`, addressed to `name`.
    async fn send_reset_code(
        &self,
        to: &Email,
        name: &str,
        code: &ResetCode,
    ) -> Result<(), EmailError>;
}

/// SMTP-backed [`Mailer`].
#[derive(Clone)]
pub struct EmailService {
    mailer: AsyncSmtpTransport<Tokio1Executor>,
    from_address: String,
}

impl EmailService {
    /// Create a new email service from configuration.
    ///
    /// # Errors
    ///
    /// Returns error if the relay host is invalid.
    pub fn new(config: &EmailConfig) -> Result<Self, SmtpError> {
        let credentials = Credentials::new(
            config.smtp_username.clone(),
            config.smtp_password.expose_secret().to_string(),
        );

        let mailer = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.smtp_host)?
            .port(config.smtp_port)
            .credentials(credentials)
            .build();

        Ok(Self {
            mailer,
            from_address: config.from_address.clone(),
        })
    }

    /// Send a multipart email with both plain text and HTML versions.
    async fn send_multipart_email(
        &self,
        to: &str,
        subject: &str,
        text_body: String,
        html_body: String,
    ) -> Result<(), EmailError> {
        let email = Message::builder()
            .from(
                self.from_address
                    .parse()
                    .map_err(|_| EmailError::InvalidAddress(self.from_address.clone()))?,
            )
            .to(to
                .parse()
                .map_err(|_| EmailError::InvalidAddress(to.to_string()))?)
            .subject(subject)
            .multipart(
                MultiPart::alternative()
                    .singlepart(
                        SinglePart::builder()
                            .header(ContentType::TEXT_PLAIN)
                            .body(text_body),
                    )
                    .singlepart(
                        SinglePart::builder()
                            .header(ContentType::TEXT_HTML)
                            .body(html_body),
                    ),
            )?;

        self.mailer.send(email).await?;

        tracing::info!(to = %to, subject = %subject, "Email sent successfully");
        Ok(())
    }
}

#[async_trait]
impl Mailer for EmailService {
    async fn send_reset_code(
        &self,
        to: &Email,
        name: &str,
        code: &ResetCode,
    ) -> Result<(), EmailError> {
        let (text, html) = render_reset_code(name, code)?;
        self.send_multipart_email(to.as_str(), RESET_CODE_SUBJECT, text, html)
            .await
    }
}

/// Render the `(text, html)` bodies of the reset code email.
fn render_reset_code(name: &str, code: &ResetCode) -> Result<(String, String), EmailError> {
    let code = code.as_str();
    let text = ResetCodeEmailText { name, code }.render()?;
    let html = ResetCodeEmailHtml { name, code }.render()?;
    Ok((text, html))
}
