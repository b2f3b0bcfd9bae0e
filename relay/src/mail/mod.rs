//! Outbound email.
//!
//! A thin abstraction over [lettre](https://lettre.rs): [`Email`] is the message
//! we compose, [`Mailer`] is anything that can deliver it.
//!
//! ```ignore
//! let mailer = SmtpMailer::from_config(config.mailer_config())?;
//!
//! let email = Email::builder()
//!     .from("relay@example.com")
//!     .to("legal@example.com")
//!     .subject("Hello")
//!     .text("See attached.")
//!     .attachment("receipt.pdf", bytes)
//!     .build()?;
//! mailer.send(&email).await?;
//! ```

mod mailer;
mod memory;
mod message;

pub use mailer::{Mailer, MailerConfig, SmtpMailer, TlsMode};
pub use memory::MemoryMailer;
pub use message::{Email, EmailAttachment, EmailBuilder};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum MailError {
    #[error("invalid email address: {0}")]
    InvalidAddress(String),

    #[error("failed to build message: {0}")]
    Build(String),

    #[error("SMTP error: {0}")]
    Smtp(String),
}
