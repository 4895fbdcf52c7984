// Campaign orchestration: fetch calendars, find gaps, dispatch campaigns

use std::fmt::Write as _;
use std::sync::Arc;
use std::time::Duration;

use chrono::{Duration as ChronoDuration, NaiveDate};
use futures::stream::{self, StreamExt};

use crate::client::BookingApiClient;
use crate::config::{AppConfig, RetryConfig};
use crate::dto::{Apartment, Booking, BookingStatus};
use crate::error::{Result, SendError};
use crate::gaps::{find_free_intervals, FreeInterval, ScanWindow};
use crate::mailer::{CampaignMailer, CampaignTarget, Recipient};
use crate::report::{average_rate_over, occupancy_report, OccupancyReport};

/// Flat discount applied to the average nightly rate when advertising a gap.
const OFFER_DISCOUNT: f64 = 0.57;

/// Outcome of one batch run, for the exit-status decision and the summary
/// printout. Send failures are collected here, never propagated.
#[derive(Debug, Default)]
pub struct RunSummary {
    pub apartments_processed: usize,
    pub skipped_apartments: Vec<SkippedApartment>,
    pub gaps_found: usize,
    pub campaigns_sent: usize,
    pub failed_sends: Vec<SendError>,
    pub occupancy: Vec<OccupancyReport>,
}

#[derive(Debug)]
pub struct SkippedApartment {
    pub apartment_name: String,
    pub reason: String,
}

impl RunSummary {
    /// A fetch failure for any apartment makes the run non-successful;
    /// failed sends alone do not.
    pub fn is_success(&self) -> bool {
        self.skipped_apartments.is_empty()
    }

    pub fn render(&self) -> String {
        let mut out = String::new();
        writeln!(out, "Run summary").unwrap();
        writeln!(out, "===========").unwrap();
        writeln!(out, "Apartments processed: {}", self.apartments_processed).unwrap();
        writeln!(out, "Gaps found:           {}", self.gaps_found).unwrap();
        writeln!(out, "Campaigns sent:       {}", self.campaigns_sent).unwrap();

        for report in &self.occupancy {
            write!(
                out,
                "  {}: booked {} nights, free {} nights, occupancy {:.0}%",
                report.apartment_name,
                report.booked_nights,
                report.free_nights,
                report.occupancy_rate * 100.0
            )
            .unwrap();
            match report.recoverable_revenue {
                Some(revenue) => writeln!(out, ", recoverable ~{:.2}", revenue).unwrap(),
                None => writeln!(out).unwrap(),
            }
        }

        if !self.skipped_apartments.is_empty() {
            writeln!(out, "Skipped apartments:").unwrap();
            for skipped in &self.skipped_apartments {
                writeln!(out, "  {}: {}", skipped.apartment_name, skipped.reason).unwrap();
            }
        }
        if !self.failed_sends.is_empty() {
            writeln!(out, "Failed sends:").unwrap();
            for failure in &self.failed_sends {
                writeln!(out, "  {}", failure).unwrap();
            }
        }
        out
    }
}

struct ApartmentOutcome {
    apartment_name: String,
    skipped_reason: Option<String>,
    gaps_found: usize,
    campaigns_sent: usize,
    failed_sends: Vec<SendError>,
    occupancy: Option<OccupancyReport>,
}

/// Drives one batch run: apartments are fetched in parallel (bounded by
/// config, the shared rate limiter caps total upstream calls), gaps are
/// computed per apartment and qualifying ones become campaign targets.
pub struct CampaignOrchestrator {
    client: Arc<BookingApiClient>,
    mailer: Arc<dyn CampaignMailer>,
    config: AppConfig,
}

impl CampaignOrchestrator {
    pub fn new(
        client: Arc<BookingApiClient>,
        mailer: Arc<dyn CampaignMailer>,
        config: AppConfig,
    ) -> Self {
        Self {
            client,
            mailer,
            config,
        }
    }

    /// Run the whole batch for the scan horizon starting at `today`.
    /// Errors only when the apartment listing itself cannot be fetched;
    /// per-apartment failures are reported in the summary instead.
    pub async fn run(&self, today: NaiveDate) -> Result<RunSummary> {
        let window = ScanWindow::new(
            today,
            today + ChronoDuration::days(self.config.scan_horizon_days),
        );
        tracing::info!(start = %window.start, end = %window.end, "starting gap scan");

        let apartments = self
            .with_retry("apartments", || self.client.list_apartments())
            .await?;
        tracing::info!(count = apartments.len(), "fetched apartment list");

        let outcomes: Vec<ApartmentOutcome> = stream::iter(
            apartments
                .iter()
                .map(|apartment| self.process_apartment(apartment, today, window)),
        )
        .buffer_unordered(self.config.fetch_concurrency)
        .collect()
        .await;

        let mut summary = RunSummary::default();
        for outcome in outcomes {
            match outcome.skipped_reason {
                Some(reason) => summary.skipped_apartments.push(SkippedApartment {
                    apartment_name: outcome.apartment_name,
                    reason,
                }),
                None => summary.apartments_processed += 1,
            }
            summary.gaps_found += outcome.gaps_found;
            summary.campaigns_sent += outcome.campaigns_sent;
            summary.failed_sends.extend(outcome.failed_sends);
            summary.occupancy.extend(outcome.occupancy);
        }
        summary
            .occupancy
            .sort_by_key(|report| report.apartment_id);

        tracing::info!(
            processed = summary.apartments_processed,
            skipped = summary.skipped_apartments.len(),
            gaps = summary.gaps_found,
            sent = summary.campaigns_sent,
            "gap scan finished"
        );
        Ok(summary)
    }

    async fn process_apartment(
        &self,
        apartment: &Apartment,
        today: NaiveDate,
        window: ScanWindow,
    ) -> ApartmentOutcome {
        let mut outcome = ApartmentOutcome {
            apartment_name: apartment.name.clone(),
            skipped_reason: None,
            gaps_found: 0,
            campaigns_sent: 0,
            failed_sends: Vec::new(),
            occupancy: None,
        };

        let bookings = match self
            .with_retry("reservations", || {
                self.client
                    .list_bookings(apartment.id, window.start, window.end)
            })
            .await
        {
            Ok(bookings) => bookings,
            Err(err) => {
                tracing::warn!(apartment = %apartment.name, error = %err, "skipping apartment");
                outcome.skipped_reason = Some(err.to_string());
                return outcome;
            }
        };

        let gaps = find_free_intervals(
            apartment.id,
            &bookings,
            window,
            apartment.minimum_stay_nights,
        );
        outcome.gaps_found = gaps.len();

        // Rate data is optional: occupancy still reports without it and
        // campaigns go out without an offer price.
        let rates = match self
            .with_retry("rates", || {
                self.client.get_rates(apartment.id, window.start, window.end)
            })
            .await
        {
            Ok(rates) => rates,
            Err(err) => {
                tracing::warn!(apartment = %apartment.name, error = %err, "no rate data");
                Vec::new()
            }
        };

        outcome.occupancy = Some(occupancy_report(
            apartment, &bookings, window, &gaps, &rates,
        ));

        for gap in &gaps {
            if !self.has_enough_notice(gap, today) {
                tracing::debug!(
                    apartment = %apartment.name,
                    gap_start = %gap.start,
                    "gap starts too soon to market, skipping"
                );
                continue;
            }

            let recipients = bounding_guests(&bookings, gap);
            if recipients.is_empty() {
                tracing::debug!(
                    apartment = %apartment.name,
                    gap_start = %gap.start,
                    "no reachable guests around gap"
                );
                continue;
            }

            let target = CampaignTarget {
                apartment: apartment.clone(),
                free_interval: gap.clone(),
                recipients,
                template_name: self.config.campaign_template.clone(),
                offer_nightly_price: average_rate_over(gap, &rates)
                    .map(|avg| (avg * OFFER_DISCOUNT * 100.0).round() / 100.0),
            };

            match self.mailer.send(&target).await {
                Ok(()) => outcome.campaigns_sent += 1,
                Err(err) => {
                    tracing::warn!(apartment = %apartment.name, error = %err, "send failed");
                    outcome.failed_sends.push(err);
                }
            }
        }

        outcome
    }

    fn has_enough_notice(&self, gap: &FreeInterval, today: NaiveDate) -> bool {
        (gap.start - today).num_days() >= self.config.min_advance_notice_days
    }

    /// Bounded retry for transient upstream failures; permanent ones return
    /// immediately.
    async fn with_retry<T, F, Fut>(&self, what: &str, mut call: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: std::future::Future<Output = Result<T>>,
    {
        let retry = &self.config.retry;
        let mut attempt = 0;
        loop {
            match call().await {
                Ok(value) => return Ok(value),
                Err(err) if err.is_retryable() && attempt < retry.max_retries => {
                    let backoff = calculate_backoff(attempt, retry);
                    tracing::warn!(
                        what,
                        attempt = attempt + 1,
                        backoff_ms = backoff.as_millis() as u64,
                        error = %err,
                        "transient failure, retrying"
                    );
                    tokio::time::sleep(backoff).await;
                    attempt += 1;
                }
                Err(err) => return Err(err),
            }
        }
    }
}

/// Guests whose stays bound the gap (checking out into it or arriving right
/// after it) are the most likely to extend; they are the campaign audience.
fn bounding_guests(bookings: &[Booking], gap: &FreeInterval) -> Vec<Recipient> {
    let mut recipients: Vec<Recipient> = Vec::new();
    for booking in bookings {
        if booking.status != BookingStatus::Confirmed {
            continue;
        }
        if booking.departure != gap.start && booking.arrival != gap.end {
            continue;
        }
        if !booking.has_contact() {
            continue;
        }
        let email = booking.guest_email.clone().unwrap_or_default();
        if recipients.iter().any(|r| r.email == email) {
            continue;
        }
        recipients.push(Recipient {
            name: booking.guest_name.clone().unwrap_or_default(),
            email,
        });
    }
    recipients
}

/// Exponential backoff with jitter to avoid synchronized retries.
pub fn calculate_backoff(retry_attempt: u32, config: &RetryConfig) -> Duration {
    let base_backoff_ms = (config.initial_backoff_ms as f64
        * config.backoff_multiplier.powf(retry_attempt as f64))
    .min(config.max_backoff_ms as f64);

    let jitter = rand::random::<f64>() * config.jitter_factor * base_backoff_ms;
    let backoff_ms = base_backoff_ms * (1.0 - config.jitter_factor / 2.0) + jitter;

    Duration::from_millis(backoff_ms as u64)
}
