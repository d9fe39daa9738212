//! Due recurring transaction sweeper for Savora.
//!
//! Runs one sweep over every active auto-create recurring definition whose
//! next run date has arrived, fires the due occurrences, and exits. Intended
//! to be invoked from cron or a systemd timer; concurrent sweeps are safe
//! because each occurrence is claimed with a conditional update.

use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use savora_db::{connect, RecurringRepository};
use savora_shared::AppConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "savora=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = AppConfig::load()?;

    // Connect to database
    let db = connect(&config.database.url).await?;
    info!("Connected to database");

    let today = chrono::Utc::now().date_naive();
    let repository = RecurringRepository::new(db);
    let fired = repository.process_due(today).await?;

    info!(count = fired.len(), %today, "sweep finished");
    for occurrence in fired {
        info!(
            recurring_id = %occurrence.recurring_id,
            transaction_id = %occurrence.transaction_id,
            date = %occurrence.date,
            "occurrence fired"
        );
    }

    Ok(())
}
