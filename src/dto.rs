// Wire format of the booking platform and the validated domain types

use chrono::NaiveDate;
use serde::Deserialize;
use std::collections::HashMap;

use crate::error::FetchError;

// ---- wire structs (upstream JSON, field names as the API sends them) ----

#[derive(Debug, Deserialize)]
pub struct WireBookingsPage {
    pub bookings: Vec<WireBooking>,
    #[serde(default)]
    pub page_count: u32,
    #[serde(default)]
    pub total_items: u32,
}

#[derive(Debug, Deserialize)]
pub struct WireBooking {
    pub id: i64,
    #[serde(rename = "reference-id", default)]
    pub reference_id: Option<String>,
    #[serde(rename = "guest-name", default)]
    pub guest_name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    pub arrival: NaiveDate,
    pub departure: NaiveDate,
    #[serde(default)]
    pub price: Option<f64>,
    pub apartment: WireApartment,
    #[serde(rename = "type", default)]
    pub booking_type: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct WireApartmentsPage {
    pub apartments: Vec<WireApartment>,
}

#[derive(Debug, Deserialize)]
pub struct WireApartment {
    pub id: i64,
    pub name: String,
    #[serde(rename = "minLengthOfStay", default)]
    pub min_length_of_stay: Option<i64>,
}

/// Rates endpoint shape: apartment id -> date -> rate record.
#[derive(Debug, Deserialize)]
pub struct WireRatesPage {
    pub data: HashMap<String, HashMap<NaiveDate, WireRate>>,
}

#[derive(Debug, Deserialize)]
pub struct WireRate {
    #[serde(default)]
    pub price: Option<f64>,
}

// ---- validated domain types ----

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BookingStatus {
    Confirmed,
    Cancelled,
}

/// A confirmed stay as fetched from upstream. Immutable; a fresher fetch
/// supersedes rather than mutates. `arrival < departure` always holds.
#[derive(Debug, Clone, PartialEq)]
pub struct Booking {
    pub id: i64,
    pub apartment_id: i64,
    pub arrival: NaiveDate,
    pub departure: NaiveDate,
    pub guest_name: Option<String>,
    pub guest_email: Option<String>,
    pub price: Option<f64>,
    pub status: BookingStatus,
}

impl Booking {
    pub fn nights(&self) -> i64 {
        (self.departure - self.arrival).num_days()
    }

    /// Average price per night, when the platform reported a total price.
    pub fn nightly_price(&self) -> Option<f64> {
        self.price.map(|p| p / self.nights() as f64)
    }

    /// Whether this booking carries enough guest data to be a campaign
    /// recipient. Bookings without contact data still occupy the calendar.
    pub fn has_contact(&self) -> bool {
        self.guest_email.is_some() && self.guest_name.is_some()
    }
}

impl TryFrom<WireBooking> for Booking {
    type Error = FetchError;

    fn try_from(wire: WireBooking) -> Result<Self, Self::Error> {
        if wire.arrival >= wire.departure {
            return Err(FetchError::Permanent(format!(
                "booking {} has arrival {} not before departure {}",
                wire.id, wire.arrival, wire.departure
            )));
        }

        let status = match wire.booking_type.as_deref() {
            Some("cancellation") => BookingStatus::Cancelled,
            _ => BookingStatus::Confirmed,
        };

        Ok(Booking {
            id: wire.id,
            apartment_id: wire.apartment.id,
            arrival: wire.arrival,
            departure: wire.departure,
            guest_name: wire.guest_name,
            guest_email: wire.email,
            price: wire.price,
            status,
        })
    }
}

/// Read-only apartment reference data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Apartment {
    pub id: i64,
    pub name: String,
    pub minimum_stay_nights: i64,
}

impl Apartment {
    pub fn from_wire(wire: WireApartment, default_min_stay: i64) -> Self {
        Apartment {
            id: wire.id,
            name: wire.name,
            minimum_stay_nights: wire.min_length_of_stay.unwrap_or(default_min_stay),
        }
    }
}

/// Nightly rate for one apartment on one date.
#[derive(Debug, Clone, PartialEq)]
pub struct DailyRate {
    pub date: NaiveDate,
    pub price: f64,
}
