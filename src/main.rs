use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Context;
use tokio::io::BufReader;

use certgen::cli::{Prompter, collect_request};
use certgen::config::{MailConfig, RenderConfig};
use certgen::notifier::{Notifier, SmtpNotifier};
use certgen::pipeline::{EventSink, TracingSink};

#[tokio::main]
async fn main() -> ExitCode {
    // Install rustls crypto provider before any TLS usage
    rustls::crypto::ring::default_provider()
        .install_default()
        .expect("Failed to install rustls crypto provider");

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    dotenvy::dotenv().ok();

    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run() -> anyhow::Result<()> {
    eprintln!("📜 certgen v{}", env!("CARGO_PKG_VERSION"));

    let render_config = RenderConfig::from_env().context("render configuration")?;

    let mut prompter = Prompter::new(BufReader::new(tokio::io::stdin()), tokio::io::stderr());
    let request = collect_request(&mut prompter).await?;

    // ── Mail (only when sending was requested) ──────────────────────────
    let notifier = if request.wants_delivery() {
        let mail_config = MailConfig::from_env().context("email delivery requested")?;
        eprintln!(
            "   SMTP: {}:{} as {}",
            mail_config.smtp_host, mail_config.smtp_port, mail_config.sender_address
        );
        let notifier = SmtpNotifier::new(mail_config)?;
        if let Err(e) = notifier.check_connection().await {
            tracing::warn!(error = %e, "SMTP connection check failed; sending will be attempted anyway");
        }
        Some(notifier)
    } else {
        None
    };

    // ── Run ─────────────────────────────────────────────────────────────
    let sink: Arc<dyn EventSink> = Arc::new(TracingSink);
    let report = certgen::app::run(
        &request,
        &render_config,
        notifier.as_ref().map(|n| n as &dyn Notifier),
        sink,
    )
    .await?;

    println!("\n{report}");
    Ok(())
}
