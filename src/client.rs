// Rate-limited, caching client for the booking platform API

use std::sync::Arc;

use chrono::NaiveDate;
use serde_json::Value;

use crate::cache::ResponseCache;
use crate::config::AppConfig;
use crate::dto::{
    Apartment, Booking, DailyRate, WireApartmentsPage, WireBookingsPage, WireRatesPage,
};
use crate::error::{ConfigError, FetchError, Result};
use crate::rate_limiter::RateLimiter;

const PAGE_SIZE: u32 = 100;

/// Client for the upstream booking API. Every read goes fingerprint ->
/// cache -> rate limiter -> HTTP; responses are validated into DTOs at this
/// boundary so nothing loosely typed travels further in. The client itself
/// never retries; that policy belongs to the orchestrator.
pub struct BookingApiClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
    limiter: Arc<RateLimiter>,
    cache: Arc<ResponseCache>,
    default_min_stay: i64,
}

impl BookingApiClient {
    pub fn new(
        config: &AppConfig,
        limiter: Arc<RateLimiter>,
        cache: Arc<ResponseCache>,
    ) -> std::result::Result<Self, ConfigError> {
        let http = reqwest::Client::builder()
            .timeout(config.http_timeout)
            .build()
            .map_err(|e| ConfigError(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            http,
            base_url: config.api_base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            limiter,
            cache,
            default_min_stay: config.default_min_stay_nights,
        })
    }

    pub async fn list_apartments(&self) -> Result<Vec<Apartment>> {
        let value = self.get_json("apartments", &[]).await?;
        let page: WireApartmentsPage = decode("apartments", value)?;
        Ok(page
            .apartments
            .into_iter()
            .map(|wire| Apartment::from_wire(wire, self.default_min_stay))
            .collect())
    }

    /// All confirmed bookings of one apartment touching `[from, to)`.
    /// The upstream endpoint paginates; pages are fetched (and cached)
    /// individually.
    pub async fn list_bookings(
        &self,
        apartment_id: i64,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<Booking>> {
        let mut bookings = Vec::new();
        let mut page = 1u32;

        loop {
            let params = [
                ("apartmentId", apartment_id.to_string()),
                ("from", from.to_string()),
                ("to", to.to_string()),
                ("pageSize", PAGE_SIZE.to_string()),
                ("page", page.to_string()),
            ];
            let value = self.get_json("reservations", &params).await?;
            let wire_page: WireBookingsPage = decode("reservations", value)?;

            let page_count = wire_page.page_count.max(1);
            for wire in wire_page.bookings {
                bookings.push(Booking::try_from(wire)?);
            }

            if page >= page_count {
                break;
            }
            page += 1;
        }

        tracing::debug!(apartment_id, count = bookings.len(), "fetched bookings");
        Ok(bookings)
    }

    /// Nightly rates of one apartment over `[from, to)`, chronological.
    /// Dates the platform has no price for are omitted.
    pub async fn get_rates(
        &self,
        apartment_id: i64,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<DailyRate>> {
        let params = [
            ("apartments[]", apartment_id.to_string()),
            ("start_date", from.to_string()),
            ("end_date", to.to_string()),
        ];
        let value = self.get_json("rates", &params).await?;
        let page: WireRatesPage = decode("rates", value)?;

        let mut rates: Vec<DailyRate> = page
            .data
            .get(&apartment_id.to_string())
            .map(|by_date| {
                by_date
                    .iter()
                    .filter_map(|(date, rate)| {
                        rate.price.map(|price| DailyRate { date: *date, price })
                    })
                    .collect()
            })
            .unwrap_or_default();
        rates.sort_by_key(|r| r.date);
        Ok(rates)
    }

    /// Cached GET: on a fingerprint miss, acquire a rate-limit slot and hit
    /// the network.
    async fn get_json(&self, endpoint: &str, params: &[(&str, String)]) -> Result<Value> {
        let fingerprint = fingerprint(endpoint, params);
        self.cache
            .get_or_fetch(&fingerprint, None, || self.fetch(endpoint, params))
            .await
    }

    async fn fetch(&self, endpoint: &str, params: &[(&str, String)]) -> Result<Value> {
        self.limiter.acquire().await;

        let url = format!("{}/{}", self.base_url, endpoint);
        tracing::debug!(%url, "GET");
        let response = self
            .http
            .get(&url)
            .header("Api-Key", &self.api_key)
            .query(params)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::from_status(status.as_u16(), endpoint));
        }

        let body = response.text().await?;
        serde_json::from_str(&body).map_err(|e| {
            FetchError::Permanent(format!("invalid JSON from {}: {}", endpoint, e))
        })
    }
}

/// Deterministic cache key for a request: endpoint plus its parameters in
/// call order.
fn fingerprint(endpoint: &str, params: &[(&str, String)]) -> String {
    let mut key = endpoint.to_string();
    for (name, value) in params {
        key.push_str(&format!(":{}={}", name, value));
    }
    key
}

fn decode<T: serde::de::DeserializeOwned>(endpoint: &str, value: Value) -> Result<T> {
    serde_json::from_value(value).map_err(|e| {
        FetchError::Permanent(format!("schema mismatch on {}: {}", endpoint, e))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;
    use serde_json::json;
    use std::time::Duration;

    fn client_for(server: &MockServer) -> BookingApiClient {
        let config = AppConfig {
            api_base_url: server.base_url(),
            api_key: "test-key".to_string(),
            ..AppConfig::default()
        };
        BookingApiClient::new(
            &config,
            Arc::new(RateLimiter::new(100, Duration::from_secs(1))),
            Arc::new(ResponseCache::new(Duration::from_secs(60), 50)),
        )
        .unwrap()
    }

    #[test]
    fn fingerprint_is_deterministic_and_parameter_sensitive() {
        let a = fingerprint("reservations", &[("page", "1".to_string())]);
        let b = fingerprint("reservations", &[("page", "1".to_string())]);
        let c = fingerprint("reservations", &[("page", "2".to_string())]);
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_ne!(a, fingerprint("apartments", &[("page", "1".to_string())]));
    }

    #[tokio::test]
    async fn lists_apartments_with_api_key_header() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(GET)
                    .path("/apartments")
                    .header("Api-Key", "test-key");
                then.status(200).json_body(json!({
                    "apartments": [
                        {"id": 1, "name": "Seaside Loft", "minLengthOfStay": 3},
                        {"id": 2, "name": "Garden Flat"}
                    ]
                }));
            })
            .await;

        let apartments = client_for(&server).list_apartments().await.unwrap();
        mock.assert_async().await;

        assert_eq!(apartments.len(), 2);
        assert_eq!(apartments[0].minimum_stay_nights, 3);
        assert_eq!(apartments[1].minimum_stay_nights, 2); // config default
    }

    #[tokio::test]
    async fn paginates_bookings_across_pages() {
        let server = MockServer::start_async().await;
        let page1 = server
            .mock_async(|when, then| {
                when.method(GET)
                    .path("/reservations")
                    .query_param("apartmentId", "7")
                    .query_param("page", "1");
                then.status(200).json_body(json!({
                    "bookings": [{
                        "id": 10,
                        "guest-name": "Ada",
                        "email": "ada@example.com",
                        "arrival": "2026-09-01",
                        "departure": "2026-09-05",
                        "apartment": {"id": 7, "name": "Loft"}
                    }],
                    "page_count": 2,
                    "total_items": 2
                }));
            })
            .await;
        let page2 = server
            .mock_async(|when, then| {
                when.method(GET)
                    .path("/reservations")
                    .query_param("page", "2");
                then.status(200).json_body(json!({
                    "bookings": [{
                        "id": 11,
                        "guest-name": "Grace",
                        "email": "grace@example.com",
                        "arrival": "2026-09-10",
                        "departure": "2026-09-12",
                        "apartment": {"id": 7, "name": "Loft"}
                    }],
                    "page_count": 2,
                    "total_items": 2
                }));
            })
            .await;

        let bookings = client_for(&server)
            .list_bookings(7, "2026-09-01".parse().unwrap(), "2026-10-01".parse().unwrap())
            .await
            .unwrap();

        page1.assert_async().await;
        page2.assert_async().await;
        assert_eq!(bookings.len(), 2);
        assert_eq!(bookings[1].id, 11);
    }

    #[tokio::test]
    async fn repeated_call_within_ttl_hits_cache_not_network() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(GET).path("/apartments");
                then.status(200).json_body(json!({"apartments": []}));
            })
            .await;

        let client = client_for(&server);
        client.list_apartments().await.unwrap();
        client.list_apartments().await.unwrap();

        assert_eq!(mock.hits_async().await, 1);
    }

    #[tokio::test]
    async fn server_error_maps_to_transient() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/apartments");
                then.status(503);
            })
            .await;

        let err = client_for(&server).list_apartments().await.unwrap_err();
        assert!(err.is_retryable());
    }

    #[tokio::test]
    async fn client_error_maps_to_permanent() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/apartments");
                then.status(404);
            })
            .await;

        let err = client_for(&server).list_apartments().await.unwrap_err();
        assert!(!err.is_retryable());
    }

    #[tokio::test]
    async fn failed_fetch_is_not_cached() {
        let server = MockServer::start_async().await;
        let mut failing = server
            .mock_async(|when, then| {
                when.method(GET).path("/apartments");
                then.status(500);
            })
            .await;

        let client = client_for(&server);
        assert!(client.list_apartments().await.is_err());

        failing.delete_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/apartments");
                then.status(200).json_body(json!({"apartments": []}));
            })
            .await;

        assert!(client.list_apartments().await.is_ok());
    }

    #[tokio::test]
    async fn schema_mismatch_maps_to_permanent() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/apartments");
                then.status(200).json_body(json!({"unexpected": true}));
            })
            .await;

        let err = client_for(&server).list_apartments().await.unwrap_err();
        assert!(!err.is_retryable());
        assert!(err.to_string().contains("schema mismatch"));
    }

    #[tokio::test]
    async fn malformed_booking_interval_maps_to_permanent() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/reservations");
                then.status(200).json_body(json!({
                    "bookings": [{
                        "id": 10,
                        "arrival": "2026-09-05",
                        "departure": "2026-09-01",
                        "apartment": {"id": 7, "name": "Loft"}
                    }],
                    "page_count": 1,
                    "total_items": 1
                }));
            })
            .await;

        let err = client_for(&server)
            .list_bookings(7, "2026-09-01".parse().unwrap(), "2026-10-01".parse().unwrap())
            .await
            .unwrap_err();
        assert!(!err.is_retryable());
    }

    #[tokio::test]
    async fn rates_are_sorted_and_priceless_dates_dropped() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/rates");
                then.status(200).json_body(json!({
                    "data": {
                        "7": {
                            "2026-09-02": {"price": 90.0},
                            "2026-09-01": {"price": 100.0},
                            "2026-09-03": {"price": null}
                        }
                    }
                }));
            })
            .await;

        let rates = client_for(&server)
            .get_rates(7, "2026-09-01".parse().unwrap(), "2026-09-04".parse().unwrap())
            .await
            .unwrap();

        assert_eq!(rates.len(), 2);
        assert_eq!(rates[0].price, 100.0);
        assert_eq!(rates[1].price, 90.0);
    }
}
