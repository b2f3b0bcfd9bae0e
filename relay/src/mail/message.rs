//! Email message types and builder.

use super::MailError;

/// A binary file attached to an email under its display name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailAttachment {
    /// Filename shown to the recipient.
    pub filename: String,
    /// Raw file contents.
    pub content: Vec<u8>,
}

/// A complete plain-text email ready to send.
#[derive(Debug, Clone)]
pub struct Email {
    /// Primary recipients.
    pub to: Vec<String>,
    /// Email subject line.
    pub subject: String,
    /// Plain text body.
    pub text: String,
    /// Files attached after the body, in order.
    pub attachments: Vec<EmailAttachment>,
    /// Sender address.
    pub from: String,
}

impl Email {
    /// Create a new email builder.
    pub fn builder() -> EmailBuilder {
        EmailBuilder::default()
    }

    /// Look up an attachment by its display name.
    pub fn attachment(&self, filename: &str) -> Option<&EmailAttachment> {
        self.attachments.iter().find(|a| a.filename == filename)
    }
}

/// Builder for constructing [`Email`] instances.
#[derive(Debug, Default)]
pub struct EmailBuilder {
    to: Vec<String>,
    subject: Option<String>,
    text: Option<String>,
    attachments: Vec<EmailAttachment>,
    from: Option<String>,
}

impl EmailBuilder {
    /// Add a primary recipient.
    pub fn to(mut self, address: impl Into<String>) -> Self {
        self.to.push(address.into());
        self
    }

    /// Set the subject line.
    pub fn subject(mut self, subject: impl Into<String>) -> Self {
        self.subject = Some(subject.into());
        self
    }

    /// Set plain text body content.
    pub fn text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    /// Attach a file.
    pub fn attachment(mut self, filename: impl Into<String>, content: Vec<u8>) -> Self {
        self.attachments.push(EmailAttachment {
            filename: filename.into(),
            content,
        });
        self
    }

    /// Set the sender address (required).
    pub fn from(mut self, address: impl Into<String>) -> Self {
        self.from = Some(address.into());
        self
    }

    /// Build the email, validating required fields.
    pub fn build(self) -> Result<Email, MailError> {
        if self.to.is_empty() {
            return Err(MailError::Build("at least one recipient required".into()));
        }

        let from = self
            .from
            .ok_or_else(|| MailError::Build("from address required".into()))?;

        let subject = self
            .subject
            .ok_or_else(|| MailError::Build("subject required".into()))?;

        let text = self
            .text
            .ok_or_else(|| MailError::Build("body required".into()))?;

        Ok(Email {
            to: self.to,
            subject,
            text,
            attachments: self.attachments,
            from,
        })
    }
}
