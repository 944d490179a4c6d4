use std::collections::BTreeMap;

use chrono::NaiveDate;

/// The creator never records a date vote but is credited as one
/// confirmation toward quorum, so a date needs `pass_limit - 1`
/// supporting votes from the other invitees.
const CREATOR_CREDIT: i64 = 1;

/// Picks the agreed-upon date from the submitted availability votes.
///
/// Tallies occurrences per distinct date and keeps the dates whose count
/// reaches the non-creator threshold. Among those the highest count wins;
/// on a tie the earliest date is chosen. Returns `None` when no date
/// reaches the threshold (including when no votes exist at all).
pub fn resolve_date(votes: &[NaiveDate], pass_limit: i32) -> Option<NaiveDate> {
    let needed = (i64::from(pass_limit) - CREATOR_CREDIT).max(0);

    let mut tally: BTreeMap<NaiveDate, i64> = BTreeMap::new();
    for date in votes {
        *tally.entry(*date).or_insert(0) += 1;
    }

    // Ascending date order plus a strictly-greater comparison gives the
    // earliest date among equally supported candidates.
    let mut best: Option<(NaiveDate, i64)> = None;
    for (date, count) in tally {
        if count < needed {
            continue;
        }
        match best {
            Some((_, top)) if count <= top => {}
            _ => best = Some((date, count)),
        }
    }

    best.map(|(date, _)| date)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 9, d).unwrap()
    }

    #[test]
    fn picks_date_with_most_votes() {
        let votes = vec![day(1), day(1), day(2)];
        assert_eq!(resolve_date(&votes, 3), Some(day(1)));
    }

    #[test]
    fn none_when_no_date_reaches_threshold() {
        let votes = vec![day(1), day(2)];
        assert_eq!(resolve_date(&votes, 3), None);
    }

    #[test]
    fn none_when_no_votes() {
        assert_eq!(resolve_date(&[], 2), None);
    }

    #[test]
    fn tie_broken_by_earliest_date() {
        let votes = vec![day(5), day(5), day(2), day(2)];
        assert_eq!(resolve_date(&votes, 3), Some(day(2)));
    }

    #[test]
    fn pass_limit_one_accepts_any_voted_date() {
        // Threshold drops to zero; a single vote decides.
        let votes = vec![day(4)];
        assert_eq!(resolve_date(&votes, 1), Some(day(4)));
    }

    #[test]
    fn threshold_excludes_creator_from_vote_count() {
        // pass_limit 2 means one non-creator vote is enough.
        let votes = vec![day(3)];
        assert_eq!(resolve_date(&votes, 2), Some(day(3)));
    }

    #[test]
    fn chosen_date_is_always_one_of_the_votes() {
        // Votes are range-checked at submission, so this keeps the
        // confirmed date inside the event window.
        let votes = vec![day(7), day(9), day(7), day(12)];
        let chosen = resolve_date(&votes, 3).unwrap();
        assert!(votes.contains(&chosen));
    }
}
