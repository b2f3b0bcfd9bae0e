use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;

use super::{Email, MailError, Mailer};

/// In-memory [`Mailer`] for development and testing.
///
/// Sent emails are kept in a `Vec` behind a mutex. Call [`MemoryMailer::fail_with`]
/// to make every following send return an SMTP error instead.
#[derive(Clone, Default)]
pub struct MemoryMailer {
    sent: Arc<Mutex<Vec<Email>>>,
    failure: Arc<Mutex<Option<String>>>,
}

impl MemoryMailer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reject all subsequent sends with `MailError::Smtp(reason)`.
    pub async fn fail_with(&self, reason: impl Into<String>) {
        *self.failure.lock().await = Some(reason.into());
    }

    /// Emails accepted so far, oldest first.
    pub async fn sent(&self) -> Vec<Email> {
        self.sent.lock().await.clone()
    }
}

#[async_trait]
impl Mailer for MemoryMailer {
    async fn send(&self, email: &Email) -> Result<(), MailError> {
        if let Some(reason) = self.failure.lock().await.clone() {
            return Err(MailError::Smtp(reason));
        }

        self.sent.lock().await.push(email.clone());
        Ok(())
    }
}
