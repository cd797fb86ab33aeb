//! Correlation store on Postgres: the `work_item_records` table.

use super::Db;
use crate::error::Result;
use crate::model::{ConversationId, RequestId, WorkItemRecord};
use crate::store::CorrelationStore;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

#[async_trait]
impl CorrelationStore for Db {
    async fn upsert(&self, record: &WorkItemRecord) -> Result<()> {
        // Unconditional replace: the last execution for a key wins.
        sqlx::query(
            "INSERT INTO work_item_records (conversation_id, request_id, intent, request, response, status, error, completed_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
             ON CONFLICT (conversation_id, request_id) DO UPDATE SET
                intent = EXCLUDED.intent,
                request = EXCLUDED.request,
                response = EXCLUDED.response,
                status = EXCLUDED.status,
                error = EXCLUDED.error,
                completed_at = EXCLUDED.completed_at",
        )
        .bind(record.conversation_id.as_str())
        .bind(record.request_id.0)
        .bind(record.intent.as_str())
        .bind(&record.request)
        .bind(&record.response)
        .bind(record.status.to_string())
        .bind(&record.error)
        .bind(record.completed_at)
        .execute(self.pool())
        .await?;
        Ok(())
    }

    async fn query_conversation(
        &self,
        conversation_id: &ConversationId,
    ) -> Result<Vec<WorkItemRecord>> {
        let rows: Vec<RecordRow> = sqlx::query_as(
            "SELECT conversation_id, request_id, intent, request, response, status, error, completed_at
             FROM work_item_records WHERE conversation_id = $1",
        )
        .bind(conversation_id.as_str())
        .fetch_all(self.pool())
        .await?;

        rows.into_iter().map(RecordRow::try_into_record).collect()
    }

    async fn get(
        &self,
        conversation_id: &ConversationId,
        request_id: RequestId,
    ) -> Result<Option<WorkItemRecord>> {
        let row: Option<RecordRow> = sqlx::query_as(
            "SELECT conversation_id, request_id, intent, request, response, status, error, completed_at
             FROM work_item_records WHERE conversation_id = $1 AND request_id = $2",
        )
        .bind(conversation_id.as_str())
        .bind(request_id.0)
        .fetch_optional(self.pool())
        .await?;

        row.map(RecordRow::try_into_record).transpose()
    }

    async fn purge_completed_before(&self, cutoff: DateTime<Utc>) -> Result<u64> {
        let result = sqlx::query("DELETE FROM work_item_records WHERE completed_at < $1")
            .bind(cutoff)
            .execute(self.pool())
            .await?;
        Ok(result.rows_affected())
    }
}

/// Internal row type for sqlx::FromRow.
#[derive(sqlx::FromRow)]
struct RecordRow {
    conversation_id: String,
    request_id: Uuid,
    intent: String,
    request: String,
    response: Option<String>,
    status: String,
    error: Option<String>,
    completed_at: DateTime<Utc>,
}

impl RecordRow {
    fn try_into_record(self) -> Result<WorkItemRecord> {
        Ok(WorkItemRecord {
            conversation_id: ConversationId::parse(&self.conversation_id)?,
            request_id: RequestId(self.request_id),
            intent: self.intent.parse()?,
            request: self.request,
            response: self.response,
            status: self.status.parse()?,
            error: self.error,
            completed_at: self.completed_at,
        })
    }
}
