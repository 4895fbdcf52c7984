// Campaign dispatch seam: the orchestrator hands targets to an external
// email collaborator through this trait

use async_trait::async_trait;

use crate::dto::Apartment;
use crate::error::SendError;
use crate::gaps::FreeInterval;

/// One qualifying gap, packaged for the email collaborator. Built transiently
/// per gap; rendering and delivery happen on the other side of the trait.
#[derive(Debug, Clone, PartialEq)]
pub struct CampaignTarget {
    pub apartment: Apartment,
    pub free_interval: FreeInterval,
    pub recipients: Vec<Recipient>,
    pub template_name: String,
    /// Discounted per-night price to advertise, when rate data was available.
    pub offer_nightly_price: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Recipient {
    pub name: String,
    pub email: String,
}

#[async_trait]
pub trait CampaignMailer: Send + Sync {
    /// Render `target.template_name` with the gap context and dispatch it to
    /// every recipient. A failure affects this target only.
    async fn send(&self, target: &CampaignTarget) -> Result<(), SendError>;
}

/// Default mailer: logs what would have been sent. Stands in for the real
/// delivery service in local runs and tests.
pub struct LoggingMailer;

#[async_trait]
impl CampaignMailer for LoggingMailer {
    async fn send(&self, target: &CampaignTarget) -> Result<(), SendError> {
        for recipient in &target.recipients {
            tracing::info!(
                apartment = %target.apartment.name,
                gap_start = %target.free_interval.start,
                gap_nights = target.free_interval.nights,
                template = %target.template_name,
                recipient = %recipient.email,
                offer_nightly_price = ?target.offer_nightly_price,
                "campaign email dispatched (logging mailer)"
            );
        }
        Ok(())
    }
}
