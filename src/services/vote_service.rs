use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    error::{AppError, Result},
    models::{AggregatedSave, Save, SaveAuthor, SaveVote, VoteType},
    services::save_service,
};

/// Outcome of applying a vote to the caller's current state on a save.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoteTransition {
    /// No prior vote: insert a new row.
    Cast,
    /// Prior vote in the other direction: update the row in place.
    Flip,
    /// Prior vote in the same direction: delete the row.
    Retract,
}

/// The full 3-state toggle table. Re-voting the same direction retracts,
/// voting the other direction flips, and a fresh vote casts.
pub fn transition_for(existing: Option<VoteType>, requested: VoteType) -> VoteTransition {
    match existing {
        None => VoteTransition::Cast,
        Some(current) if current == requested => VoteTransition::Retract,
        Some(_) => VoteTransition::Flip,
    }
}

/// Derives a save's score and the requesting user's own vote from the vote
/// list. Single pass; result does not depend on vote ordering.
pub fn aggregate(
    save: Save,
    author: Option<SaveAuthor>,
    votes: &[SaveVote],
    customer_uuid: Option<Uuid>,
) -> AggregatedSave {
    let mut upvotes: i64 = 0;
    let mut downvotes: i64 = 0;
    let mut customer_vote = None;

    for vote in votes {
        match vote.vote_type {
            VoteType::Up => upvotes += 1,
            VoteType::Down => downvotes += 1,
        }
        if Some(vote.user_uuid) == customer_uuid {
            customer_vote = Some(vote.vote_type);
        }
    }

    AggregatedSave {
        uuid: save.uuid,
        game_uuid: save.game_uuid,
        author_uuid: save.author_uuid,
        title: save.title,
        description: save.description,
        download_url: save.download_url,
        thumbnail_url: save.thumbnail_url,
        author,
        score: upvotes - downvotes,
        customer_vote,
        created_at: save.created_at,
        updated_at: save.updated_at,
    }
}

/// Applies one vote from `user_uuid` on `save_uuid` and returns the
/// re-aggregated save. The service does a read-then-write; the unique
/// constraint on (save_uuid, user_uuid) is what keeps concurrent identical
/// votes from producing duplicate rows.
pub async fn vote(
    db: &PgPool,
    save_uuid: Uuid,
    user_uuid: Uuid,
    vote_type: VoteType,
) -> Result<AggregatedSave> {
    let _save = save_service::get_save_raw(db, save_uuid)
        .await?
        .ok_or_else(|| AppError::NotFound("Save not found".to_string()))?;

    let existing = sqlx::query_as::<_, SaveVote>(
        "SELECT * FROM save_votes WHERE save_uuid = $1 AND user_uuid = $2",
    )
    .bind(save_uuid)
    .bind(user_uuid)
    .fetch_optional(db)
    .await?;

    let now = chrono::Utc::now();

    match transition_for(existing.map(|v| v.vote_type), vote_type) {
        VoteTransition::Retract => {
            sqlx::query("DELETE FROM save_votes WHERE save_uuid = $1 AND user_uuid = $2")
                .bind(save_uuid)
                .bind(user_uuid)
                .execute(db)
                .await?;
        }
        VoteTransition::Flip => {
            sqlx::query(
                r#"
                UPDATE save_votes SET vote_type = $3, updated_at = $4
                WHERE save_uuid = $1 AND user_uuid = $2
                "#,
            )
            .bind(save_uuid)
            .bind(user_uuid)
            .bind(vote_type)
            .bind(now)
            .execute(db)
            .await?;
        }
        VoteTransition::Cast => {
            sqlx::query(
                r#"
                INSERT INTO save_votes (uuid, save_uuid, user_uuid, vote_type, created_at, updated_at)
                VALUES ($1, $2, $3, $4, $5, $5)
                ON CONFLICT (save_uuid, user_uuid)
                DO UPDATE SET vote_type = $4, updated_at = $5
                "#,
            )
            .bind(Uuid::new_v4())
            .bind(save_uuid)
            .bind(user_uuid)
            .bind(vote_type)
            .bind(now)
            .execute(db)
            .await?;
        }
    }

    // Keep the denormalized counter in step; the popular tab orders by it.
    sqlx::query(
        r#"
        UPDATE saves SET upvote_count = (
            SELECT COUNT(*) FROM save_votes
            WHERE save_uuid = $1 AND vote_type = 'UP'
        )
        WHERE uuid = $1
        "#,
    )
    .bind(save_uuid)
    .execute(db)
    .await?;

    save_service::get_game_save(db, save_uuid, Some(user_uuid)).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn sample_save() -> Save {
        Save {
            uuid: Uuid::new_v4(),
            game_uuid: Uuid::new_v4(),
            author_uuid: Uuid::new_v4(),
            title: "100% completion".to_string(),
            description: None,
            download_url: "https://drive.google.com/file/d/abc".to_string(),
            thumbnail_url: None,
            upvote_count: 0,
            created_at: Utc::now(),
            updated_at: Utc::now(),
            deleted_at: None,
        }
    }

    fn vote_row(save_uuid: Uuid, user_uuid: Uuid, vote_type: VoteType) -> SaveVote {
        SaveVote {
            uuid: Uuid::new_v4(),
            save_uuid,
            user_uuid,
            vote_type,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn transition_table_is_a_strict_toggle() {
        assert_eq!(transition_for(None, VoteType::Up), VoteTransition::Cast);
        assert_eq!(transition_for(None, VoteType::Down), VoteTransition::Cast);
        assert_eq!(
            transition_for(Some(VoteType::Up), VoteType::Up),
            VoteTransition::Retract
        );
        assert_eq!(
            transition_for(Some(VoteType::Down), VoteType::Down),
            VoteTransition::Retract
        );
        assert_eq!(
            transition_for(Some(VoteType::Up), VoteType::Down),
            VoteTransition::Flip
        );
        assert_eq!(
            transition_for(Some(VoteType::Down), VoteType::Up),
            VoteTransition::Flip
        );
    }

    #[test]
    fn score_is_upvotes_minus_downvotes() {
        let save = sample_save();
        let votes: Vec<SaveVote> = (0..5)
            .map(|i| {
                let vote_type = if i < 3 { VoteType::Up } else { VoteType::Down };
                vote_row(save.uuid, Uuid::new_v4(), vote_type)
            })
            .collect();

        let aggregated = aggregate(save, None, &votes, None);
        assert_eq!(aggregated.score, 1);
        assert_eq!(aggregated.customer_vote, None);
    }

    #[test]
    fn score_is_independent_of_vote_order() {
        let save = sample_save();
        let mut votes = vec![
            vote_row(save.uuid, Uuid::new_v4(), VoteType::Down),
            vote_row(save.uuid, Uuid::new_v4(), VoteType::Up),
            vote_row(save.uuid, Uuid::new_v4(), VoteType::Up),
        ];

        let forward = aggregate(save.clone(), None, &votes, None);
        votes.reverse();
        let backward = aggregate(save, None, &votes, None);
        assert_eq!(forward.score, backward.score);
        assert_eq!(forward.score, 1);
    }

    #[test]
    fn customer_vote_is_found_regardless_of_position() {
        let save = sample_save();
        let customer = Uuid::new_v4();
        let votes = vec![
            vote_row(save.uuid, Uuid::new_v4(), VoteType::Up),
            vote_row(save.uuid, customer, VoteType::Down),
            vote_row(save.uuid, Uuid::new_v4(), VoteType::Up),
        ];

        let aggregated = aggregate(save, None, &votes, Some(customer));
        assert_eq!(aggregated.customer_vote, Some(VoteType::Down));
        assert_eq!(aggregated.score, 1);
    }

    #[test]
    fn empty_ledger_aggregates_to_zero() {
        let aggregated = aggregate(sample_save(), None, &[], Some(Uuid::new_v4()));
        assert_eq!(aggregated.score, 0);
        assert_eq!(aggregated.customer_vote, None);
    }
}
