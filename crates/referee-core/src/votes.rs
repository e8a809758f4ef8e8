use referee_db::queries;
use referee_types::models::VoteDirection;
use tracing::debug;

use crate::{Engine, Result, ServiceError};

impl Engine {
    /// Apply one up or down vote and return the persisted score.
    ///
    /// The increment happens in SQL against the stored value, so concurrent
    /// votes on the same post never overwrite each other.
    pub fn vote(&self, post_id: i64, direction: &str) -> Result<i64> {
        self.db().with_tx(|tx| {
            if queries::query_post(tx, post_id)?.is_none() {
                return Err(ServiceError::not_found("Comment post does not exist."));
            }

            let direction: VoteDirection = direction
                .parse()
                .map_err(|_| ServiceError::invalid("Vote must be 'up' or 'down'."))?;

            let score = queries::add_to_score(tx, post_id, direction.delta())?
                .ok_or_else(|| ServiceError::not_found("Comment post does not exist."))?;

            debug!("Post {} voted {:?}, score now {}", post_id, direction, score);
            Ok(score)
        })
    }
}
