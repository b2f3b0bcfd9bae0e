//! Intake and validation of the multipart petition form.

use std::collections::HashMap;

use axum::extract::Multipart;

use crate::error::{Error, Result};
use crate::submission::{Submission, UploadedFile};

/// Name of the repeated file part carrying payment proofs.
pub const PROOF_FIELD: &str = "proof";

const REQUIRED_FIELDS: [&str; 4] = ["full_name", "email", "phone", "payment_date"];

/// A drained but not yet validated form.
#[derive(Debug, Default)]
pub struct FormIntake {
    fields: HashMap<String, String>,
    proofs: Vec<ProofPart>,
}

#[derive(Debug)]
struct ProofPart {
    file_name: Option<String>,
    content: Vec<u8>,
}

impl FormIntake {
    /// Read every part of the request body into memory.
    ///
    /// Text parts are keyed by name and the first occurrence wins. File parts
    /// other than `proof` are drained and ignored.
    pub async fn from_multipart(mut multipart: Multipart) -> Result<Self> {
        let mut intake = FormIntake::default();

        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(|e| Error::MalformedForm(e.to_string()))?
        {
            let name = field.name().unwrap_or_default().to_string();
            let file_name = field.file_name().map(str::to_string);

            if file_name.is_some() || name == PROOF_FIELD {
                let content = field
                    .bytes()
                    .await
                    .map_err(|e| Error::MalformedForm(e.to_string()))?;
                if name == PROOF_FIELD {
                    intake.push_proof(file_name, content.to_vec());
                }
            } else {
                let value = field
                    .text()
                    .await
                    .map_err(|e| Error::MalformedForm(e.to_string()))?;
                intake.insert_field(name, value);
            }
        }

        Ok(intake)
    }

    /// Record a text part unless one with the same name was already seen.
    pub fn insert_field(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.fields.entry(name.into()).or_insert_with(|| value.into());
    }

    pub fn push_proof(&mut self, file_name: Option<String>, content: Vec<u8>) {
        self.proofs.push(ProofPart { file_name, content });
    }

    /// Check required fields and keep only proofs with a usable filename.
    pub fn validate(mut self) -> Result<(Submission, Vec<UploadedFile>)> {
        if REQUIRED_FIELDS
            .iter()
            .any(|name| self.fields.get(*name).map_or(true, |v| v.is_empty()))
        {
            return Err(Error::MissingFields);
        }

        let total = self.proofs.len();
        let files: Vec<UploadedFile> = self
            .proofs
            .into_iter()
            .filter_map(|part| match part.file_name {
                Some(name) if !name.trim().is_empty() => Some(UploadedFile {
                    original_name: name,
                    content: part.content,
                }),
                _ => None,
            })
            .collect();

        if files.len() < total {
            tracing::debug!(skipped = total - files.len(), "ignoring proof parts without a filename");
        }
        if files.is_empty() {
            return Err(Error::MissingFields);
        }

        let mut take = |name: &str| self.fields.remove(name).filter(|v| !v.is_empty());
        let submission = Submission {
            full_name: take("full_name").unwrap_or_default(),
            email: take("email").unwrap_or_default(),
            phone: take("phone").unwrap_or_default(),
            payment_date: take("payment_date").unwrap_or_default(),
            account_name: take("account_name"),
            account_number: take("account_number"),
        };

        Ok((submission, files))
    }
}
