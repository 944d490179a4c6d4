use chrono::NaiveDate;

use crate::core::error::CoreError;

pub const MAX_TOPICS: usize = 5;
pub const MAX_IDEAS_PER_TOPIC: usize = 2;

/// Validates the event's time window at creation time.
pub fn validate_window(
    start_date: NaiveDate,
    end_date: NaiveDate,
    today: NaiveDate,
) -> Result<(), CoreError> {
    if start_date < today || end_date <= today || end_date <= start_date {
        return Err(CoreError::validation("dates", "invalid range"));
    }
    Ok(())
}

/// Validates an invitee's availability dates against the event window.
/// Same-day votes are rejected: the event could never be announced in time.
pub fn validate_vote_dates(
    dates: &[NaiveDate],
    start_date: NaiveDate,
    end_date: NaiveDate,
    today: NaiveDate,
) -> Result<(), CoreError> {
    if dates.is_empty() {
        return Err(CoreError::validation("dates", "pick at least 1 date"));
    }
    for date in dates {
        if *date < start_date || *date > end_date {
            return Err(CoreError::validation("dates", "out of range"));
        }
        if *date == today {
            return Err(CoreError::validation("dates", "date too soon"));
        }
    }
    Ok(())
}

/// Trims, drops empties and caps a submitted idea list at the per-topic
/// maximum. Excess entries are discarded silently, never rejected.
pub fn clean_ideas(raw: &[String]) -> Vec<String> {
    raw.iter()
        .map(|idea| idea.trim())
        .filter(|idea| !idea.is_empty())
        .take(MAX_IDEAS_PER_TOPIC)
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, m, d).unwrap()
    }

    #[test]
    fn window_must_lie_ahead_of_today() {
        let today = day(9, 1);
        assert!(validate_window(day(9, 2), day(9, 10), today).is_ok());
        assert!(validate_window(day(8, 30), day(9, 10), today).is_err());
        assert!(validate_window(day(9, 2), day(9, 1), today).is_err());
        assert!(validate_window(day(9, 5), day(9, 5), today).is_err());
    }

    #[test]
    fn vote_dates_must_be_inside_window() {
        let today = day(9, 1);
        assert!(validate_vote_dates(&[day(9, 5)], day(9, 2), day(9, 10), today).is_ok());
        assert!(validate_vote_dates(&[day(9, 11)], day(9, 2), day(9, 10), today).is_err());
        assert!(validate_vote_dates(&[], day(9, 2), day(9, 10), today).is_err());
    }

    #[test]
    fn same_day_vote_rejected() {
        let today = day(9, 3);
        assert!(validate_vote_dates(&[day(9, 3)], day(9, 1), day(9, 10), today).is_err());
    }

    #[test]
    fn ideas_trimmed_and_capped() {
        let raw = vec![
            "  bowling ".to_string(),
            String::new(),
            "karaoke".to_string(),
            "darts".to_string(),
        ];
        assert_eq!(clean_ideas(&raw), vec!["bowling", "karaoke"]);
    }
}
