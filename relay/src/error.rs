use std::io;
use std::path::PathBuf;

use axum::response::{IntoResponse, Response};
use axum::Json;
use relay_macros::HttpError;
use serde::Serialize;

use crate::mail::MailError;

/// Everything that can go wrong while handling a submission.
///
/// Client mistakes carry a message that is returned in the response body.
/// Server failures are logged with full detail and answered with a bare
/// `{"success": false}`.
#[derive(Debug, thiserror::Error, HttpError)]
pub enum Error {
    #[error("required form fields missing")]
    #[http_error(BAD_REQUEST, "Missing required fields")]
    MissingFields,

    /// The body could not be read as a form at all. Clients see the same
    /// answer as for an incomplete form; the parser detail is only logged.
    #[error("malformed multipart body: {0}")]
    #[http_error(BAD_REQUEST, "Missing required fields")]
    MalformedForm(String),

    #[error("failed to persist upload: {0}")]
    #[http_error(INTERNAL_SERVER_ERROR)]
    Storage(#[source] io::Error),

    #[error("failed to read stored attachment {}: {source}", path.display())]
    #[http_error(INTERNAL_SERVER_ERROR)]
    AttachmentRead { path: PathBuf, source: io::Error },

    #[error("mail delivery failed: {0}")]
    #[http_error(INTERNAL_SERVER_ERROR)]
    Mail(#[from] MailError),
}

pub type Result<T> = std::result::Result<T, Error>;

/// JSON body shared by every `/submit` response.
#[derive(Debug, Serialize)]
pub struct Reply {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl Reply {
    pub fn ok() -> Self {
        Reply {
            success: true,
            error: None,
        }
    }

    pub fn failed(error: Option<String>) -> Self {
        Reply {
            success: false,
            error,
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let code = self.http_code();
        // Server errors are only ever reported in the log
        if code.is_server_error() {
            tracing::error!("Error Status {}: {}", code, self);
        } else {
            tracing::debug!("Rejected request ({}): {}", code, self);
        }

        (code, Json(Reply::failed(self.http_message()))).into_response()
    }
}
