//! Chat history queries.

use parentic_core::db::{DatabaseError, unix_timestamp};

use super::db::ChatDatabase;
use super::models::{ChatTurn, NewChatTurn};

impl ChatDatabase {
    /// Record a completed turn and return the stored row.
    pub async fn append_chat_turn(&self, turn: &NewChatTurn<'_>) -> Result<ChatTurn, DatabaseError> {
        let child_context = if turn.child_context.is_empty() {
            None
        } else {
            serde_json::to_string(turn.child_context).ok()
        };

        let row = sqlx::query_as::<_, ChatTurn>(
            "INSERT INTO chat_history (account_id, child_id, message, response, child_context, created_at) \
             VALUES (?, ?, ?, ?, ?, ?) RETURNING *",
        )
        .bind(turn.account_id)
        .bind(turn.child_id)
        .bind(turn.message)
        .bind(turn.response)
        .bind(child_context)
        .bind(unix_timestamp())
        .fetch_one(self.pool())
        .await?;

        Ok(row)
    }

    /// The most recent `limit` turns for an account, oldest first.
    ///
    /// With `child_id` only that child's turns are returned; without it only
    /// turns recorded with no child.
    pub async fn read_chat_history(
        &self,
        account_id: &str,
        child_id: Option<i64>,
        limit: u32,
    ) -> Result<Vec<ChatTurn>, DatabaseError> {
        let mut turns = match child_id {
            Some(child_id) => {
                sqlx::query_as::<_, ChatTurn>(
                    "SELECT * FROM chat_history WHERE account_id = ? AND child_id = ? \
                     ORDER BY created_at DESC, id DESC LIMIT ?",
                )
                .bind(account_id)
                .bind(child_id)
                .bind(i64::from(limit))
                .fetch_all(self.pool())
                .await?
            }
            None => {
                sqlx::query_as::<_, ChatTurn>(
                    "SELECT * FROM chat_history WHERE account_id = ? AND child_id IS NULL \
                     ORDER BY created_at DESC, id DESC LIMIT ?",
                )
                .bind(account_id)
                .bind(i64::from(limit))
                .fetch_all(self.pool())
                .await?
            }
        };

        turns.reverse();
        Ok(turns)
    }
}
