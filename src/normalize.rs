use chrono::{DateTime, Utc};

use crate::models::SubscriptionStatus;
use crate::stripe::Interval;

/// Minor currency units (cents) to major units. No rounding.
pub fn normalize_amount(minor: i64) -> f64 {
    minor as f64 / 100.0
}

/// A recurring price expressed as if it were billed monthly.
///
/// `amount` is in major units. A `month` interval ignores `interval_count`.
pub fn monthly_equivalent(amount: f64, interval: Interval, interval_count: u32) -> f64 {
    let count = interval_count as f64;
    match interval {
        Interval::Year => amount / (12.0 * count),
        Interval::Week => amount * 4.0 * count,
        Interval::Day => amount * 30.0 * count,
        Interval::Month => amount,
    }
}

/// Collapse Stripe's subscription statuses into the five the dashboard tracks.
/// Unrecognized values map to `Canceled`.
pub fn map_subscription_status(status: &str) -> SubscriptionStatus {
    match status {
        "active" => SubscriptionStatus::Active,
        "past_due" => SubscriptionStatus::PastDue,
        "unpaid" => SubscriptionStatus::Unpaid,
        "canceled" | "cancelled" => SubscriptionStatus::Canceled,
        "incomplete" | "incomplete_expired" => SubscriptionStatus::Incomplete,
        _ => SubscriptionStatus::Canceled,
    }
}

pub fn epoch_to_datetime(epoch: i64) -> DateTime<Utc> {
    DateTime::from_timestamp(epoch, 0).unwrap_or_default()
}

pub fn round2(val: f64) -> f64 {
    (val * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_amount() {
        assert_eq!(normalize_amount(50000), 500.0);
        assert_eq!(normalize_amount(1999), 19.99);
        assert_eq!(normalize_amount(0), 0.0);
        assert_eq!(normalize_amount(-250), -2.5);
    }

    #[test]
    fn test_monthly_equivalent_month_and_year() {
        assert_eq!(monthly_equivalent(normalize_amount(10000), Interval::Month, 1), 100.0);
        assert_eq!(monthly_equivalent(normalize_amount(120000), Interval::Year, 1), 100.0);
        assert_eq!(monthly_equivalent(1200.0, Interval::Year, 2), 50.0);
    }

    #[test]
    fn test_monthly_equivalent_month_ignores_interval_count() {
        assert_eq!(monthly_equivalent(300.0, Interval::Month, 3), 300.0);
    }

    #[test]
    fn test_monthly_equivalent_week_and_day() {
        assert_eq!(monthly_equivalent(25.0, Interval::Week, 1), 100.0);
        assert_eq!(monthly_equivalent(25.0, Interval::Week, 2), 200.0);
        assert_eq!(monthly_equivalent(2.0, Interval::Day, 1), 60.0);
    }

    #[test]
    fn test_map_subscription_status() {
        assert_eq!(map_subscription_status("active"), SubscriptionStatus::Active);
        assert_eq!(map_subscription_status("past_due"), SubscriptionStatus::PastDue);
        assert_eq!(map_subscription_status("unpaid"), SubscriptionStatus::Unpaid);
        assert_eq!(map_subscription_status("canceled"), SubscriptionStatus::Canceled);
        assert_eq!(map_subscription_status("cancelled"), SubscriptionStatus::Canceled);
        assert_eq!(map_subscription_status("incomplete"), SubscriptionStatus::Incomplete);
        assert_eq!(map_subscription_status("incomplete_expired"), SubscriptionStatus::Incomplete);
    }

    #[test]
    fn test_unknown_status_defaults_to_canceled() {
        assert_eq!(map_subscription_status("trialing"), SubscriptionStatus::Canceled);
        assert_eq!(map_subscription_status("paused"), SubscriptionStatus::Canceled);
        assert_eq!(map_subscription_status(""), SubscriptionStatus::Canceled);
    }

    #[test]
    fn test_epoch_to_datetime() {
        assert_eq!(
            epoch_to_datetime(1768435200).format("%Y-%m-%d").to_string(),
            "2026-01-15"
        );
    }

    #[test]
    fn test_round2() {
        assert_eq!(round2(8.3333), 8.33);
        assert_eq!(round2(0.005), 0.01);
    }
}
