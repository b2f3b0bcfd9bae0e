use std::sync::Arc;

use anyhow::Context as _;
use petition_relay::mail::SmtpMailer;
use petition_relay::{router, serve, Config, Notifier, RouterOptions, UploadStore};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = Config::from_env().context("could not load configuration from the environment")?;
    tracing::debug!(?config, "configuration loaded");

    let store = UploadStore::new(&config.upload_dir);
    store
        .ensure_dir()
        .await
        .with_context(|| format!("could not create upload directory {}", config.upload_dir.display()))?;

    let mailer = SmtpMailer::from_config(config.mailer_config()).context("invalid SMTP configuration")?;
    tracing::info!(
        host = %config.smtp_host,
        port = config.smtp_port,
        tls = %config.smtp_tls,
        "mail relay configured"
    );

    let notifier = Notifier::new(
        store,
        Arc::new(mailer),
        config.envelope(),
        config.delivery_policy(),
    );
    let app = router(
        notifier,
        RouterOptions {
            test_email: config.test_email_enabled,
        },
    );

    serve((config.bind_address, config.port), app)
        .await
        .context("error running HTTP server")?;
    Ok(())
}
