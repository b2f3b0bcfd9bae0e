//! Relays petition form submissions, with their proof files, to a fixed mailbox.
//!
//! `POST /submit` runs the [`intake`] validator, then the [`notifier`], which
//! stores every proof in the [`storage`] directory and sends one email through
//! a [`mail::Mailer`].

pub mod config;
pub mod error;
pub mod intake;
pub mod mail;
pub mod notifier;
pub mod routes;
pub mod storage;
pub mod submission;

mod serve;

pub use config::Config;
pub use error::{Error, Reply};
pub use notifier::{DeliveryPolicy, Envelope, Notifier};
pub use routes::{router, RouterOptions};
pub use serve::{serve, shutdown_signal};
pub use storage::UploadStore;
pub use submission::{Attachment, Submission, UploadedFile};
