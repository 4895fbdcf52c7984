// Gap detection over an apartment's booking calendar

use chrono::NaiveDate;

use crate::dto::{Booking, BookingStatus};

/// Half-open date range `[start, end)` the scan covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScanWindow {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl ScanWindow {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        debug_assert!(start < end, "scan window must be non-empty");
        Self { start, end }
    }

    pub fn nights(&self) -> i64 {
        (self.end - self.start).num_days()
    }
}

/// A contiguous unbooked span for one apartment: `[start, end)`,
/// `nights = end - start > 0`, no confirmed booking overlaps it.
/// Derived on every scan, never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FreeInterval {
    pub apartment_id: i64,
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub nights: i64,
}

impl FreeInterval {
    fn new(apartment_id: i64, start: NaiveDate, end: NaiveDate) -> Self {
        Self {
            apartment_id,
            start,
            end,
            nights: (end - start).num_days(),
        }
    }
}

/// Compute the maximal free intervals of `apartment_id` within `window`.
///
/// Confirmed bookings are clipped to the window, sorted by arrival (booking
/// id breaks ties so the result is deterministic), merged where they overlap
/// or touch (a departure equal to the next arrival produces no gap), and the
/// uncovered spans in between are emitted. Gaps shorter than
/// `min_stay_nights` are dropped: too short to be bookable.
///
/// Pure over its inputs; interval validity is enforced at DTO construction.
pub fn find_free_intervals(
    apartment_id: i64,
    bookings: &[Booking],
    window: ScanWindow,
    min_stay_nights: i64,
) -> Vec<FreeInterval> {
    let occupied = merge_occupied(apartment_id, bookings, window);

    let mut gaps = Vec::new();
    let mut cursor = window.start;
    for (start, end) in occupied {
        if start > cursor {
            gaps.push(FreeInterval::new(apartment_id, cursor, start));
        }
        cursor = cursor.max(end);
    }
    if cursor < window.end {
        gaps.push(FreeInterval::new(apartment_id, cursor, window.end));
    }

    gaps.retain(|gap| gap.nights >= min_stay_nights);
    gaps
}

/// Total nights of `apartment_id` occupied within `window`, overlap-free.
pub fn occupied_nights(apartment_id: i64, bookings: &[Booking], window: ScanWindow) -> i64 {
    merge_occupied(apartment_id, bookings, window)
        .iter()
        .map(|(start, end)| (*end - *start).num_days())
        .sum()
}

/// Consolidated occupied date ranges within the window, sorted and disjoint.
fn merge_occupied(
    apartment_id: i64,
    bookings: &[Booking],
    window: ScanWindow,
) -> Vec<(NaiveDate, NaiveDate)> {
    let mut clipped: Vec<(NaiveDate, NaiveDate, i64)> = bookings
        .iter()
        .filter(|b| {
            b.apartment_id == apartment_id
                && b.status == BookingStatus::Confirmed
                && b.departure > window.start
                && b.arrival < window.end
        })
        .map(|b| {
            (
                b.arrival.max(window.start),
                b.departure.min(window.end),
                b.id,
            )
        })
        .collect();

    clipped.sort_by_key(|&(arrival, _, id)| (arrival, id));

    let mut merged: Vec<(NaiveDate, NaiveDate)> = Vec::with_capacity(clipped.len());
    for (start, end, _) in clipped {
        match merged.last_mut() {
            // Touching boundaries count as contiguous occupancy.
            Some(last) if start <= last.1 => last.1 = last.1.max(end),
            _ => merged.push((start, end)),
        }
    }
    merged
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    fn date(s: &str) -> NaiveDate {
        s.parse().unwrap()
    }

    fn booking(id: i64, arrival: &str, departure: &str) -> Booking {
        Booking {
            id,
            apartment_id: 1,
            arrival: date(arrival),
            departure: date(departure),
            guest_name: Some(format!("Guest {}", id)),
            guest_email: Some(format!("guest{}@example.com", id)),
            price: Some(100.0),
            status: BookingStatus::Confirmed,
        }
    }

    fn january() -> ScanWindow {
        ScanWindow::new(date("2026-01-01"), date("2026-01-31"))
    }

    #[test]
    fn two_bookings_yield_three_gaps() {
        let bookings = vec![
            booking(1, "2026-01-10", "2026-01-15"),
            booking(2, "2026-01-20", "2026-01-25"),
        ];
        let gaps = find_free_intervals(1, &bookings, january(), 2);

        assert_eq!(
            gaps,
            vec![
                FreeInterval::new(1, date("2026-01-01"), date("2026-01-10")),
                FreeInterval::new(1, date("2026-01-15"), date("2026-01-20")),
                FreeInterval::new(1, date("2026-01-25"), date("2026-01-31")),
            ]
        );
        assert_eq!(gaps[0].nights, 9);
        assert_eq!(gaps[1].nights, 5);
        assert_eq!(gaps[2].nights, 6);
    }

    #[test]
    fn empty_calendar_yields_whole_window() {
        let gaps = find_free_intervals(1, &[], january(), 2);
        assert_eq!(
            gaps,
            vec![FreeInterval::new(1, date("2026-01-01"), date("2026-01-31"))]
        );
        assert_eq!(gaps[0].nights, 30);
    }

    #[test]
    fn fully_booked_window_yields_no_gaps() {
        let bookings = vec![booking(1, "2025-12-20", "2026-02-10")];
        assert!(find_free_intervals(1, &bookings, january(), 1).is_empty());
    }

    #[test]
    fn adjacent_bookings_produce_no_gap_between_them() {
        let bookings = vec![
            booking(1, "2026-01-01", "2026-01-05"),
            booking(2, "2026-01-05", "2026-01-10"),
        ];
        let gaps = find_free_intervals(1, &bookings, january(), 1);
        assert_eq!(
            gaps,
            vec![FreeInterval::new(1, date("2026-01-10"), date("2026-01-31"))]
        );
    }

    #[test]
    fn overlapping_bookings_are_consolidated() {
        let bookings = vec![
            booking(1, "2026-01-05", "2026-01-12"),
            booking(2, "2026-01-10", "2026-01-18"),
            booking(3, "2026-01-06", "2026-01-08"),
        ];
        let gaps = find_free_intervals(1, &bookings, january(), 1);
        assert_eq!(
            gaps,
            vec![
                FreeInterval::new(1, date("2026-01-01"), date("2026-01-05")),
                FreeInterval::new(1, date("2026-01-18"), date("2026-01-31")),
            ]
        );
    }

    #[test]
    fn booking_outside_window_is_ignored() {
        let bookings = vec![
            booking(1, "2025-11-01", "2025-11-10"),
            booking(2, "2026-03-01", "2026-03-05"),
        ];
        let gaps = find_free_intervals(1, &bookings, january(), 1);
        assert_eq!(gaps.len(), 1);
        assert_eq!(gaps[0].start, date("2026-01-01"));
        assert_eq!(gaps[0].end, date("2026-01-31"));
    }

    #[test]
    fn booking_straddling_window_edge_is_clipped() {
        let bookings = vec![booking(1, "2025-12-28", "2026-01-04")];
        let gaps = find_free_intervals(1, &bookings, january(), 1);
        assert_eq!(
            gaps,
            vec![FreeInterval::new(1, date("2026-01-04"), date("2026-01-31"))]
        );
    }

    #[test_case(2, 3 ; "min stay two keeps all three")]
    #[test_case(6, 2 ; "min stay six drops the middle gap")]
    #[test_case(7, 1 ; "min stay seven keeps only the widest")]
    #[test_case(10, 0 ; "min stay ten drops everything")]
    fn minimum_stay_filter(min_stay: i64, expected: usize) {
        let bookings = vec![
            booking(1, "2026-01-10", "2026-01-15"),
            booking(2, "2026-01-20", "2026-01-25"),
        ];
        // Gap lengths are 9, 5 and 6 nights.
        let gaps = find_free_intervals(1, &bookings, january(), min_stay);
        assert_eq!(gaps.len(), expected);
    }

    #[test]
    fn cancelled_bookings_do_not_occupy_the_calendar() {
        let mut cancelled = booking(1, "2026-01-10", "2026-01-15");
        cancelled.status = BookingStatus::Cancelled;
        let gaps = find_free_intervals(1, &[cancelled], january(), 1);
        assert_eq!(gaps.len(), 1);
        assert_eq!(gaps[0].nights, 30);
    }

    #[test]
    fn other_apartments_bookings_are_ignored() {
        let mut other = booking(1, "2026-01-10", "2026-01-15");
        other.apartment_id = 99;
        let gaps = find_free_intervals(1, &[other], january(), 1);
        assert_eq!(gaps.len(), 1);
        assert_eq!(gaps[0].nights, 30);
    }

    #[test]
    fn result_is_deterministic_regardless_of_input_order() {
        let mut bookings = vec![
            booking(3, "2026-01-20", "2026-01-25"),
            booking(1, "2026-01-10", "2026-01-15"),
            booking(2, "2026-01-04", "2026-01-07"),
        ];
        let forward = find_free_intervals(1, &bookings, january(), 1);
        bookings.reverse();
        let reversed = find_free_intervals(1, &bookings, january(), 1);
        assert_eq!(forward, reversed);

        let again = find_free_intervals(1, &bookings, january(), 1);
        assert_eq!(reversed, again);
    }

    #[test]
    fn gaps_never_overlap_bookings_or_each_other() {
        let bookings = vec![
            booking(1, "2026-01-03", "2026-01-06"),
            booking(2, "2026-01-06", "2026-01-09"),
            booking(3, "2026-01-14", "2026-01-20"),
            booking(4, "2026-01-25", "2026-01-29"),
        ];
        let window = january();
        let gaps = find_free_intervals(1, &bookings, window, 1);

        for pair in gaps.windows(2) {
            assert!(pair[0].end <= pair[1].start, "gaps must not overlap");
        }
        for gap in &gaps {
            assert!(gap.nights > 0);
            for b in &bookings {
                let overlaps = b.arrival < gap.end && b.departure > gap.start;
                assert!(!overlaps, "gap {:?} overlaps booking {}", gap, b.id);
            }
        }

        // With no minimum-stay filter, occupied plus free nights cover the
        // window exactly.
        let free: i64 = gaps.iter().map(|g| g.nights).sum();
        let occupied: i64 = super::merge_occupied(1, &bookings, window)
            .iter()
            .map(|(s, e)| (*e - *s).num_days())
            .sum();
        assert_eq!(free + occupied, window.nights());
    }
}
