use chrono::{Datelike, NaiveDate};

use super::super::domain::Season;

/// Map a zero-based month index (January = 0) to its season.
pub fn season_of(month0: u32) -> Season {
    match month0 {
        2..=4 => Season::Spring,
        5..=7 => Season::Summer,
        8..=10 => Season::Autumn,
        _ => Season::Winter,
    }
}

pub fn season_for_date(date: NaiveDate) -> Season {
    season_of(date.month0())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spring_covers_march_to_may() {
        assert_eq!(season_of(2), Season::Spring);
        assert_eq!(season_of(3), Season::Spring);
        assert_eq!(season_of(4), Season::Spring);
    }

    #[test]
    fn winter_wraps_the_year_end() {
        assert_eq!(season_of(11), Season::Winter);
        assert_eq!(season_of(0), Season::Winter);
        assert_eq!(season_of(1), Season::Winter);
    }

    #[test]
    fn summer_and_autumn_boundaries() {
        assert_eq!(season_of(5), Season::Summer);
        assert_eq!(season_of(7), Season::Summer);
        assert_eq!(season_of(8), Season::Autumn);
        assert_eq!(season_of(10), Season::Autumn);
    }

    #[test]
    fn dates_use_their_calendar_month() {
        let july = NaiveDate::from_ymd_opt(2024, 7, 15).expect("valid date");
        let january = NaiveDate::from_ymd_opt(2024, 1, 15).expect("valid date");
        assert_eq!(season_for_date(july), Season::Summer);
        assert_eq!(season_for_date(january), Season::Winter);
    }
}
