//! Winter season gating.
//!
//! Dynamic-rate peak periods are only active from December 1st through
//! March 31st of the following year. All season checks handle the
//! Dec/Jan year rollover.

use chrono::{Datelike, NaiveDate};

/// Returns true if `date` falls within the winter season (Dec 1 - Mar 31).
pub fn is_winter_season(date: NaiveDate) -> bool {
    let key = (date.month(), date.day());
    key >= (12, 1) || key <= (3, 31)
}

/// Returns the bounds of the winter season relevant to `date`.
///
/// Dec dates map to the season starting that December; Jan-Mar dates map
/// to the season started the previous December; Apr-Nov dates map to the
/// upcoming season.
pub fn winter_season_bounds(date: NaiveDate) -> (NaiveDate, NaiveDate) {
    let (start_year, end_year) = if date.month() == 12 {
        (date.year(), date.year() + 1)
    } else if date.month() <= 3 {
        (date.year() - 1, date.year())
    } else {
        (date.year(), date.year() + 1)
    };
    (
        NaiveDate::from_ymd_opt(start_year, 12, 1).expect("valid date"),
        NaiveDate::from_ymd_opt(end_year, 3, 31).expect("valid date"),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn season_membership() {
        assert!(!is_winter_season(date(2024, 11, 30)));
        assert!(is_winter_season(date(2024, 12, 1)));
        assert!(is_winter_season(date(2024, 12, 31)));
        assert!(is_winter_season(date(2025, 1, 15)));
        assert!(is_winter_season(date(2025, 3, 31)));
        assert!(!is_winter_season(date(2025, 4, 1)));
        assert!(!is_winter_season(date(2025, 7, 1)));
    }

    #[test]
    fn bounds_december() {
        assert_eq!(
            winter_season_bounds(date(2024, 12, 15)),
            (date(2024, 12, 1), date(2025, 3, 31))
        );
    }

    #[test]
    fn bounds_after_rollover() {
        assert_eq!(
            winter_season_bounds(date(2025, 2, 1)),
            (date(2024, 12, 1), date(2025, 3, 31))
        );
    }

    #[test]
    fn bounds_off_season_points_forward() {
        assert_eq!(
            winter_season_bounds(date(2025, 7, 1)),
            (date(2025, 12, 1), date(2026, 3, 31))
        );
    }
}
