use chrono::NaiveDate;

use crate::model::AgeBucket;

/// Inclusive upper bounds in days, paired with their bucket.
const BOUNDS: [(i64, AgeBucket); 4] = [
    (30, AgeBucket::UnderOneMonth),
    (90, AgeBucket::OneToThreeMonths),
    (180, AgeBucket::ThreeToSixMonths),
    (365, AgeBucket::SixToTwelveMonths),
];

/// Whole days from `invoice_date` to `cutoff`. Negative when the invoice is
/// dated after the cutoff.
pub fn age_days(invoice_date: NaiveDate, cutoff: NaiveDate) -> i64 {
    (cutoff - invoice_date).num_days()
}

/// Bucket for an invoice relative to the cutoff.
///
/// Boundaries are inclusive on the upper side: 30 days is `<1mo`, 31 is
/// `1-3mo`. Future-dated invoices land in `<1mo`.
pub fn classify_age(invoice_date: NaiveDate, cutoff: NaiveDate) -> AgeBucket {
    bucket_for_days(age_days(invoice_date, cutoff))
}

pub fn bucket_for_days(days: i64) -> AgeBucket {
    BOUNDS
        .iter()
        .find(|(max, _)| days <= *max)
        .map(|(_, bucket)| *bucket)
        .unwrap_or(AgeBucket::OverOneYear)
}
