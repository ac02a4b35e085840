use super::models::RatingSummary;

pub const MIN_RATING: i64 = 1;
pub const MAX_RATING: i64 = 5;

pub fn is_valid_rating(value: i64) -> bool {
    (MIN_RATING..=MAX_RATING).contains(&value)
}

pub fn round_one_decimal(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

/// Mean of every individual rating, rounded to one decimal, with the count.
/// No ratings gives `0.0` and `0`.
pub fn summarize(values: &[i64]) -> RatingSummary {
    if values.is_empty() {
        return RatingSummary::default();
    }
    let total: i64 = values.iter().sum();
    RatingSummary {
        rating: round_one_decimal(total as f64 / values.len() as f64),
        rating_count: values.len() as u32,
    }
}

/// Best local estimate of a media item's rating after one user's upsert,
/// starting from the rounded summary the client holds. The collaborator's
/// recomputed summary replaces it on confirmation.
pub fn estimate_after_upsert(current: RatingSummary, previous: Option<i64>, value: i64) -> RatingSummary {
    let count = f64::from(current.rating_count);
    let total = current.rating * count;
    match previous {
        Some(old) if current.rating_count > 0 => RatingSummary {
            rating: round_one_decimal((total - old as f64 + value as f64) / count),
            rating_count: current.rating_count,
        },
        _ => RatingSummary {
            rating: round_one_decimal((total + value as f64) / (count + 1.0)),
            rating_count: current.rating_count + 1,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn mean_of_three_ratings() {
        assert_eq!(
            summarize(&[4, 5, 3]),
            RatingSummary { rating: 4.0, rating_count: 3 }
        );
    }

    #[test]
    fn upsert_keeps_count_and_rounds() {
        let summary = summarize(&[2, 5, 3]);
        assert_eq!(summary.rating_count, 3);
        assert!((summary.rating - 3.3).abs() < 1e-9);
    }

    #[test]
    fn no_ratings_is_zero() {
        assert_eq!(summarize(&[]), RatingSummary::default());
    }

    #[rstest]
    #[case(0, false)]
    #[case(1, true)]
    #[case(5, true)]
    #[case(6, false)]
    fn rating_bounds(#[case] value: i64, #[case] valid: bool) {
        assert_eq!(is_valid_rating(value), valid);
    }

    #[test]
    fn estimate_matches_exact_recompute_for_simple_cases() {
        let current = summarize(&[4, 5, 3]);
        let updated = estimate_after_upsert(current, Some(4), 2);
        assert_eq!(updated, summarize(&[2, 5, 3]));

        let added = estimate_after_upsert(current, None, 4);
        assert_eq!(added, summarize(&[4, 5, 3, 4]));

        let first = estimate_after_upsert(RatingSummary::default(), None, 5);
        assert_eq!(first, RatingSummary { rating: 5.0, rating_count: 1 });
    }
}
