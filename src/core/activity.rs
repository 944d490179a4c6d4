use rand::seq::SliceRandom;
use rand::Rng;
use sqlx::PgConnection;
use uuid::Uuid;

use crate::core::error::CoreError;

/// Recorded for topics that collected no ideas at all.
pub const NO_SUGGESTION: &str = "No suggestions.";

/// Picks one idea uniformly at random, or the sentinel when none exist.
pub fn pick_idea<R: Rng>(ideas: &[String], rng: &mut R) -> String {
    ideas
        .choose(rng)
        .cloned()
        .unwrap_or_else(|| NO_SUGGESTION.to_string())
}

/// Writes one confirmed activity per topic of the event.
///
/// Runs exactly once per event, after it reaches confirmed status. The
/// caller must check `confirmed_activities` for existing rows first; this
/// function inserts unconditionally.
pub async fn choose_activities<R: Rng>(
    conn: &mut PgConnection,
    event_id: Uuid,
    rng: &mut R,
) -> Result<(), CoreError> {
    let topics: Vec<(Uuid, String)> =
        sqlx::query_as("SELECT id, topic FROM activity_topics WHERE event_id = $1 ORDER BY id")
            .bind(event_id)
            .fetch_all(&mut *conn)
            .await?;

    for (topic_id, topic) in topics {
        let ideas: Vec<String> =
            sqlx::query_scalar("SELECT idea FROM activity_ideas WHERE topic_id = $1")
                .bind(topic_id)
                .fetch_all(&mut *conn)
                .await?;

        let activity = pick_idea(&ideas, rng);

        sqlx::query(
            r#"
            INSERT INTO confirmed_activities (event_id, topic_label, activity_label)
            VALUES ($1, $2, $3)
            "#,
        )
        .bind(event_id)
        .bind(&topic)
        .bind(&activity)
        .execute(&mut *conn)
        .await?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn picks_from_available_ideas() {
        let ideas = vec!["bowling".to_string(), "karaoke".to_string()];
        let mut rng = StdRng::seed_from_u64(7);
        let picked = pick_idea(&ideas, &mut rng);
        assert!(ideas.contains(&picked));
    }

    #[test]
    fn same_seed_same_pick() {
        let ideas: Vec<String> = (0..10).map(|i| format!("idea-{i}")).collect();
        let a = pick_idea(&ideas, &mut StdRng::seed_from_u64(42));
        let b = pick_idea(&ideas, &mut StdRng::seed_from_u64(42));
        assert_eq!(a, b);
    }

    #[test]
    fn empty_topic_gets_sentinel() {
        let mut rng = StdRng::seed_from_u64(0);
        assert_eq!(pick_idea(&[], &mut rng), NO_SUGGESTION);
    }
}
