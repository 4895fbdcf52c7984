// Occupancy and revenue aggregation; pure computation, no side effects

use std::collections::HashMap;

use chrono::NaiveDate;

use crate::dto::{Apartment, Booking, DailyRate};
use crate::gaps::{occupied_nights, FreeInterval, ScanWindow};

/// Per-apartment occupancy figures over one scan window.
#[derive(Debug, Clone, PartialEq)]
pub struct OccupancyReport {
    pub apartment_id: i64,
    pub apartment_name: String,
    pub booked_nights: i64,
    pub free_nights: i64,
    /// booked / (booked + free); zero for an empty window.
    pub occupancy_rate: f64,
    /// Sum over free intervals of nights priced by the rate calendar.
    /// `None` when no rate data was available.
    pub recoverable_revenue: Option<f64>,
}

pub fn occupancy_report(
    apartment: &Apartment,
    bookings: &[Booking],
    window: ScanWindow,
    gaps: &[FreeInterval],
    rates: &[DailyRate],
) -> OccupancyReport {
    let booked_nights = occupied_nights(apartment.id, bookings, window);
    let free_nights = window.nights() - booked_nights;
    let occupancy_rate = if window.nights() > 0 {
        booked_nights as f64 / window.nights() as f64
    } else {
        0.0
    };

    OccupancyReport {
        apartment_id: apartment.id,
        apartment_name: apartment.name.clone(),
        booked_nights,
        free_nights,
        occupancy_rate,
        recoverable_revenue: recoverable_revenue(gaps, rates),
    }
}

/// Price every free night that has a rate; `None` when the rate calendar is
/// empty.
fn recoverable_revenue(gaps: &[FreeInterval], rates: &[DailyRate]) -> Option<f64> {
    if rates.is_empty() {
        return None;
    }
    let by_date: HashMap<NaiveDate, f64> = rates.iter().map(|r| (r.date, r.price)).collect();

    let mut total = 0.0;
    for gap in gaps {
        let mut night = gap.start;
        while night < gap.end {
            if let Some(price) = by_date.get(&night) {
                total += price;
            }
            night = night.succ_opt().expect("date overflow");
        }
    }
    Some(total)
}

/// Mean nightly rate across the dates of one interval, for offer pricing.
pub fn average_rate_over(interval: &FreeInterval, rates: &[DailyRate]) -> Option<f64> {
    let in_range: Vec<f64> = rates
        .iter()
        .filter(|r| r.date >= interval.start && r.date < interval.end)
        .map(|r| r.price)
        .collect();
    if in_range.is_empty() {
        None
    } else {
        Some(in_range.iter().sum::<f64>() / in_range.len() as f64)
    }
}
