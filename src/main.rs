use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Context;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use vacancy_mailer::{
    AppConfig, BookingApiClient, CampaignOrchestrator, LoggingMailer, RateLimiter, ResponseCache,
};

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    init_logger();

    // A missing .env is fine; real deployments use plain env vars.
    let _ = dotenvy::dotenv();
    let config = AppConfig::from_env().context("failed to load configuration")?;
    tracing::info!(
        base_url = %config.api_base_url,
        horizon_days = config.scan_horizon_days,
        "starting vacancy scan"
    );

    let limiter = Arc::new(RateLimiter::new(
        config.rate_limit_calls,
        config.rate_limit_window,
    ));
    let cache = Arc::new(ResponseCache::new(
        config.cache_ttl,
        config.cache_max_entries,
    ));
    let client = Arc::new(
        BookingApiClient::new(&config, Arc::clone(&limiter), Arc::clone(&cache))
            .context("failed to build API client")?,
    );

    let orchestrator = CampaignOrchestrator::new(client, Arc::new(LoggingMailer), config);

    let today = chrono::Local::now().date_naive();
    let summary = orchestrator
        .run(today)
        .await
        .context("run aborted before any apartment could be processed")?;

    print!("{}", summary.render());
    tracing::debug!(
        cache_stats = ?cache.stats(),
        limiter_stats = ?limiter.stats(),
        "upstream access statistics"
    );

    for failure in &summary.failed_sends {
        tracing::warn!("{}", failure);
    }

    if summary.is_success() {
        Ok(ExitCode::SUCCESS)
    } else {
        tracing::error!(
            skipped = summary.skipped_apartments.len(),
            "some apartments could not be fetched"
        );
        Ok(ExitCode::FAILURE)
    }
}

fn init_logger() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("vacancy_mailer=info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .compact(),
        )
        .init();
}
