//! # PostgreSQL Task Store
//!
//! [`TaskStore`] over the `face_scan_tasks` / `face_scan_images` tables.
//!
//! ## Database Schema
//!
//! ```sql
//! CREATE TABLE face_scan_tasks (
//!   task_uuid UUID PRIMARY KEY,
//!   status VARCHAR(32) NOT NULL DEFAULT 'new',
//!   created_at TIMESTAMPTZ NOT NULL,
//!   updated_at TIMESTAMPTZ NOT NULL
//! );
//!
//! CREATE TABLE face_scan_images (
//!   image_uuid UUID PRIMARY KEY,
//!   task_uuid UUID NOT NULL REFERENCES face_scan_tasks ON DELETE CASCADE,
//!   file_name TEXT NOT NULL,
//!   image_data BYTEA NOT NULL,
//!   api_response TEXT,
//!   recognition_error TEXT,
//!   created_at TIMESTAMPTZ NOT NULL,
//!   recognized_at TIMESTAMPTZ
//! );
//! ```
//!
//! An image outcome is `Pending` while both `api_response` and
//! `recognition_error` are NULL; a CHECK constraint keeps at most one set.

use super::{StoreError, StoreResult, TaskStore};
use crate::models::{ImageOutcome, ImageRecord, NewImage, RecognitionResult, Task};
use crate::state_machine::TaskState;
use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool, Postgres, Transaction};
use tracing::debug;
use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct PgTaskStore {
    pool: PgPool,
}

#[derive(Debug, FromRow)]
struct TaskRow {
    task_uuid: Uuid,
    status: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

#[derive(Debug, FromRow)]
struct ImageRow {
    image_uuid: Uuid,
    file_name: String,
    image_data: Vec<u8>,
    api_response: Option<String>,
    recognition_error: Option<String>,
    created_at: DateTime<Utc>,
}

impl ImageRow {
    fn into_record(self) -> StoreResult<ImageRecord> {
        let outcome = match (self.api_response, self.recognition_error) {
            (Some(raw), None) => {
                let result =
                    RecognitionResult::from_raw(raw).map_err(|e| StoreError::CorruptRecord {
                        reason: format!(
                            "Unparseable api_response for image {}: {e}",
                            self.image_uuid
                        ),
                    })?;
                ImageOutcome::Succeeded(result)
            }
            (None, Some(reason)) => ImageOutcome::Failed { reason },
            (None, None) => ImageOutcome::Pending,
            (Some(_), Some(_)) => {
                return Err(StoreError::CorruptRecord {
                    reason: format!("Image {} has both a result and an error", self.image_uuid),
                })
            }
        };

        Ok(ImageRecord {
            image_uuid: self.image_uuid,
            file_name: self.file_name,
            raw_image: Bytes::from(self.image_data),
            outcome,
            created_at: self.created_at,
        })
    }
}

fn parse_status(raw: &str) -> StoreResult<TaskState> {
    raw.parse().map_err(|reason| StoreError::CorruptRecord { reason })
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db) if db.is_unique_violation())
}

impl PgTaskStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    async fn insert_image(
        tx: &mut Transaction<'_, Postgres>,
        task_uuid: Uuid,
        image: &NewImage,
    ) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO face_scan_images (image_uuid, task_uuid, file_name, image_data, created_at)
            VALUES ($1, $2, $3, $4, NOW())
            "#,
        )
        .bind(image.image_uuid)
        .bind(task_uuid)
        .bind(&image.file_name)
        .bind(image.raw_image.as_ref())
        .execute(&mut **tx)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                StoreError::DuplicateImage {
                    image_uuid: image.image_uuid,
                }
            } else {
                StoreError::Database(e)
            }
        })?;

        Ok(())
    }

    async fn fetch_status(&self, task_uuid: Uuid) -> StoreResult<Option<TaskState>> {
        let status: Option<String> =
            sqlx::query_scalar("SELECT status FROM face_scan_tasks WHERE task_uuid = $1")
                .bind(task_uuid)
                .fetch_optional(&self.pool)
                .await?;

        status.as_deref().map(parse_status).transpose()
    }
}

#[async_trait]
impl TaskStore for PgTaskStore {
    async fn get_task(&self, task_uuid: Uuid) -> StoreResult<Task> {
        let row = sqlx::query_as::<_, TaskRow>(
            r#"
            SELECT task_uuid, status, created_at, updated_at
            FROM face_scan_tasks
            WHERE task_uuid = $1
            "#,
        )
        .bind(task_uuid)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(StoreError::NotFound { task_uuid })?;

        let image_rows = sqlx::query_as::<_, ImageRow>(
            r#"
            SELECT image_uuid, file_name, image_data, api_response, recognition_error, created_at
            FROM face_scan_images
            WHERE task_uuid = $1
            ORDER BY created_at, image_uuid
            "#,
        )
        .bind(task_uuid)
        .fetch_all(&self.pool)
        .await?;

        let images = image_rows
            .into_iter()
            .map(ImageRow::into_record)
            .collect::<StoreResult<Vec<_>>>()?;

        Ok(Task {
            task_uuid: row.task_uuid,
            status: parse_status(&row.status)?,
            images,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }

    async fn get_status(&self, task_uuid: Uuid) -> StoreResult<TaskState> {
        self.fetch_status(task_uuid)
            .await?
            .ok_or(StoreError::NotFound { task_uuid })
    }

    async fn create_task(&self, task_uuid: Uuid, first_image: NewImage) -> StoreResult<()> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO face_scan_tasks (task_uuid, status, created_at, updated_at)
            VALUES ($1, $2, NOW(), NOW())
            "#,
        )
        .bind(task_uuid)
        .bind(TaskState::New.as_str())
        .execute(&mut *tx)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                StoreError::DuplicateTask { task_uuid }
            } else {
                StoreError::Database(e)
            }
        })?;

        Self::insert_image(&mut tx, task_uuid, &first_image).await?;

        tx.commit().await?;
        debug!(task_uuid = %task_uuid, "Task row created");
        Ok(())
    }

    async fn extend_task(&self, task_uuid: Uuid, image: NewImage) -> StoreResult<()> {
        let mut tx = self.pool.begin().await?;

        // Row lock serializes this insert against a concurrent New -> Pending update
        let status: Option<String> = sqlx::query_scalar(
            "SELECT status FROM face_scan_tasks WHERE task_uuid = $1 FOR UPDATE",
        )
        .bind(task_uuid)
        .fetch_optional(&mut *tx)
        .await?;

        let status = match status {
            Some(raw) => parse_status(&raw)?,
            None => return Err(StoreError::NotFound { task_uuid }),
        };

        if !status.accepts_images() {
            return Err(StoreError::NotAcceptingImages { task_uuid, status });
        }

        Self::insert_image(&mut tx, task_uuid, &image).await?;

        sqlx::query("UPDATE face_scan_tasks SET updated_at = NOW() WHERE task_uuid = $1")
            .bind(task_uuid)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(())
    }

    async fn set_status(
        &self,
        task_uuid: Uuid,
        expected: TaskState,
        new_status: TaskState,
    ) -> StoreResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE face_scan_tasks
            SET status = $3, updated_at = NOW()
            WHERE task_uuid = $1 AND status = $2
            "#,
        )
        .bind(task_uuid)
        .bind(expected.as_str())
        .bind(new_status.as_str())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 1 {
            return Ok(());
        }

        match self.fetch_status(task_uuid).await? {
            None => Err(StoreError::NotFound { task_uuid }),
            actual => Err(StoreError::StatusConflict {
                task_uuid,
                expected,
                actual,
            }),
        }
    }

    async fn set_image_outcome(
        &self,
        task_uuid: Uuid,
        image_uuid: Uuid,
        outcome: &ImageOutcome,
    ) -> StoreResult<()> {
        let (api_response, recognition_error) = match outcome {
            ImageOutcome::Succeeded(result) => (Some(result.raw_response.as_str()), None),
            ImageOutcome::Failed { reason } => (None, Some(reason.as_str())),
            ImageOutcome::Pending => return Err(StoreError::InvalidOutcome { image_uuid }),
        };

        let result = sqlx::query(
            r#"
            UPDATE face_scan_images
            SET api_response = $3, recognition_error = $4, recognized_at = NOW()
            WHERE image_uuid = $1
              AND task_uuid = $2
              AND api_response IS NULL
              AND recognition_error IS NULL
            "#,
        )
        .bind(image_uuid)
        .bind(task_uuid)
        .bind(api_response)
        .bind(recognition_error)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 1 {
            return Ok(());
        }

        let already_resolved: Option<bool> = sqlx::query_scalar(
            r#"
            SELECT (api_response IS NOT NULL OR recognition_error IS NOT NULL)
            FROM face_scan_images
            WHERE image_uuid = $1 AND task_uuid = $2
            "#,
        )
        .bind(image_uuid)
        .bind(task_uuid)
        .fetch_optional(&self.pool)
        .await?;

        match already_resolved {
            Some(true) => Err(StoreError::OutcomeAlreadyRecorded { image_uuid }),
            Some(false) => Err(StoreError::CorruptRecord {
                reason: format!("Conditional update of image {image_uuid} matched no row"),
            }),
            None => match self.fetch_status(task_uuid).await? {
                None => Err(StoreError::NotFound { task_uuid }),
                Some(_) => Err(StoreError::ImageNotFound {
                    task_uuid,
                    image_uuid,
                }),
            },
        }
    }

    async fn delete_task(&self, task_uuid: Uuid) -> StoreResult<Vec<Uuid>> {
        let mut tx = self.pool.begin().await?;

        let image_uuids: Vec<Uuid> = sqlx::query_scalar(
            "DELETE FROM face_scan_images WHERE task_uuid = $1 RETURNING image_uuid",
        )
        .bind(task_uuid)
        .fetch_all(&mut *tx)
        .await?;

        let deleted = sqlx::query("DELETE FROM face_scan_tasks WHERE task_uuid = $1")
            .bind(task_uuid)
            .execute(&mut *tx)
            .await?;

        if deleted.rows_affected() == 0 {
            tx.rollback().await?;
            return Err(StoreError::NotFound { task_uuid });
        }

        tx.commit().await?;
        debug!(
            task_uuid = %task_uuid,
            image_count = image_uuids.len(),
            "Task rows deleted"
        );
        Ok(image_uuids)
    }
}
