//! Example: submit one message through an SMTP server with STARTTLS.
//!
//! ## Running
//!
//! ```bash
//! export SMTP_HOST="smtp.example.com"
//! export SMTP_PORT=587
//! export SMTP_USER="alice@example.com"
//! export SMTP_PASSWORD="app-password"
//! export MAIL_TO="bob@example.com"
//! cargo run --package mailpost --example send
//! ```
//!
//! Set `RUST_LOG=mailpost=trace` to see the dialog (credentials redacted).

use std::env;

use anyhow::Context;
use mailpost::{MailRequest, Mailer, MailerConfig};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "mailpost=debug,send=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let host = env::var("SMTP_HOST").context("SMTP_HOST is not set")?;
    let port = env::var("SMTP_PORT")
        .unwrap_or_else(|_| "587".to_string())
        .parse()
        .context("SMTP_PORT is not a port number")?;
    let user = env::var("SMTP_USER").context("SMTP_USER is not set")?;
    let password = env::var("SMTP_PASSWORD").context("SMTP_PASSWORD is not set")?;
    let to = env::var("MAIL_TO").unwrap_or_else(|_| user.clone());

    let config = match env::var("MAILPOST_CONFIG") {
        Ok(json) => MailerConfig::from_json(serde_json::from_str(&json)?)?,
        Err(_) => MailerConfig::default(),
    };
    let mailer = Mailer::new(config)?;

    let delivery = mailer.initiate(
        MailRequest::new(host, port)
            .from(user.as_str())
            .to(to)
            .subject("mailpost test message")
            .body("Sent by the mailpost send example.")
            .credentials(user.as_str(), password),
    )?;
    tracing::info!(id = %delivery.id(), "submission started");

    let receipt = delivery.outcome().await?;
    println!("{receipt}");
    Ok(())
}
