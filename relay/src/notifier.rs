//! Persists accepted proofs and relays the submission by email.

use std::net::{IpAddr, Ipv4Addr};
use std::sync::Arc;

use chrono::{Local, NaiveDateTime};
use tokio::fs;

use crate::error::{Error, Result};
use crate::mail::{Email, EmailAttachment, Mailer};
use crate::storage::UploadStore;
use crate::submission::{Attachment, Submission, UploadedFile};

pub const SUBJECT: &str = "NEW PETITION SUBMISSION – TMT Travels (Allegation)";

/// Rendered in place of an optional field the submitter left out.
pub const NOT_PROVIDED: &str = "Not provided";

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Fixed sender and recipient of every notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Envelope {
    pub from: String,
    pub to: String,
}

/// What happens to persisted uploads when the notification cannot be sent.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeliveryPolicy {
    /// Remove the files stored for the failed request. Off by default, so
    /// uploads survive a failed send.
    pub cleanup_on_failure: bool,
}

#[derive(Clone)]
pub struct Notifier {
    store: UploadStore,
    mailer: Arc<dyn Mailer>,
    envelope: Arc<Envelope>,
    policy: DeliveryPolicy,
}

impl Notifier {
    pub fn new(
        store: UploadStore,
        mailer: Arc<dyn Mailer>,
        envelope: Envelope,
        policy: DeliveryPolicy,
    ) -> Self {
        Self {
            store,
            mailer,
            envelope: Arc::new(envelope),
            policy,
        }
    }

    /// Store every file, then send one email carrying them all.
    ///
    /// Nothing is retried. Files written before a failure stay on disk unless
    /// the policy asks for cleanup.
    pub async fn deliver(
        &self,
        submission: &Submission,
        files: &[UploadedFile],
        client_ip: Option<IpAddr>,
    ) -> Result<Vec<Attachment>> {
        let mut persisted = Vec::with_capacity(files.len());
        let result = self
            .persist_and_send(submission, files, client_ip, &mut persisted)
            .await;

        if result.is_err() && self.policy.cleanup_on_failure && !persisted.is_empty() {
            tracing::info!(files = persisted.len(), "removing uploads of failed submission");
            self.store.discard(&persisted).await;
        }

        result.map(|()| persisted)
    }

    async fn persist_and_send(
        &self,
        submission: &Submission,
        files: &[UploadedFile],
        client_ip: Option<IpAddr>,
        persisted: &mut Vec<Attachment>,
    ) -> Result<()> {
        for file in files {
            persisted.push(self.store.persist(file).await?);
        }

        let attachments = read_attachments(persisted).await?;
        let email = self.compose(submission, attachments, client_ip, Local::now().naive_local())?;
        self.mailer.send(&email).await?;

        tracing::info!(
            to = %self.envelope.to,
            attachments = persisted.len(),
            "submission relayed"
        );
        Ok(())
    }

    /// Build the notification for one submission.
    pub fn compose(
        &self,
        submission: &Submission,
        attachments: Vec<EmailAttachment>,
        client_ip: Option<IpAddr>,
        submitted_at: NaiveDateTime,
    ) -> Result<Email> {
        let ip = client_ip.map_or_else(|| "unknown".to_string(), |ip| ip.to_string());
        let text = render_body(submission, &submitted_at.format(TIMESTAMP_FORMAT).to_string(), &ip);

        let mut builder = Email::builder()
            .from(self.envelope.from.as_str())
            .to(self.envelope.to.as_str())
            .subject(SUBJECT)
            .text(text);
        for attachment in attachments {
            builder = builder.attachment(attachment.filename, attachment.content);
        }

        Ok(builder.build()?)
    }

    /// Send a notification with canned data and no attachments, to check the
    /// mail relay from a running server.
    pub async fn send_test(&self) -> Result<()> {
        let sample = Submission {
            full_name: "Test User".into(),
            email: "test@example.com".into(),
            phone: "0000000000".into(),
            payment_date: "2025-01-01".into(),
            account_name: Some("Test Account".into()),
            account_number: Some("0000000000".into()),
        };

        let email = self.compose(
            &sample,
            Vec::new(),
            Some(IpAddr::V4(Ipv4Addr::LOCALHOST)),
            Local::now().naive_local(),
        )?;
        self.mailer.send(&email).await?;

        tracing::info!(to = %self.envelope.to, "test email sent");
        Ok(())
    }
}

/// Load the stored files back for attaching, under their original names.
async fn read_attachments(attachments: &[Attachment]) -> Result<Vec<EmailAttachment>> {
    let mut loaded = Vec::with_capacity(attachments.len());
    for attachment in attachments {
        let content = fs::read(&attachment.storage_path)
            .await
            .map_err(|source| Error::AttachmentRead {
                path: attachment.storage_path.clone(),
                source,
            })?;
        loaded.push(EmailAttachment {
            filename: attachment.original_name.clone(),
            content,
        });
    }
    Ok(loaded)
}

fn render_body(submission: &Submission, submitted_at: &str, ip: &str) -> String {
    let account_name = submission.account_name.as_deref().unwrap_or(NOT_PROVIDED);
    let account_number = submission.account_number.as_deref().unwrap_or(NOT_PROVIDED);

    format!(
        "
NEW ALLEGATION SUBMISSION (FOR LEGAL REVIEW)

Full Name: {full_name}
Email Address: {email}
Phone Number: {phone}

Date of Payment: {payment_date}
Account Name Paid Into: {account_name}
Account Number Paid Into: {account_number}

Submitted At: {submitted_at}
IP Address: {ip}

This submission represents an allegation provided by a complainant
for legal review by Eluyefa Chambers on behalf of Mr Scott Iguma.
",
        full_name = submission.full_name,
        email = submission.email,
        phone = submission.phone,
        payment_date = submission.payment_date,
    )
}
