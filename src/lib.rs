// Revenue recovery for short-term rentals: scan the booking calendar for
// unbooked gaps and trigger re-booking email campaigns

pub mod cache;
pub mod client;
pub mod config;
pub mod dto;
pub mod error;
pub mod gaps;
pub mod mailer;
pub mod rate_limiter;
pub mod report;
pub mod service;

// Re-export key types for convenience
pub use cache::{CacheStatsReport, ResponseCache};
pub use client::BookingApiClient;
pub use config::{AppConfig, RetryConfig};
pub use dto::{Apartment, Booking, BookingStatus, DailyRate};
pub use error::{ConfigError, FetchError, SendError};
pub use gaps::{find_free_intervals, FreeInterval, ScanWindow};
pub use mailer::{CampaignMailer, CampaignTarget, LoggingMailer, Recipient};
pub use rate_limiter::{LimiterStatsReport, RateLimiter};
pub use report::{occupancy_report, OccupancyReport};
pub use service::{CampaignOrchestrator, RunSummary};
