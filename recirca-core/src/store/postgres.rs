//! PostgreSQL request store.
//!
//! The claim check-and-set is a single conditional UPDATE keyed by request
//! id and expected state; the database serializes competing transitions on
//! the same row, so no process-level locking is needed.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use recirca_model::{
    GeoPoint, PickupRequest, RequestId, RequestState, UserId,
};
use sqlx::postgres::{PgPool, PgPoolOptions, PgRow};
use sqlx::Row;
use uuid::Uuid;

use crate::error::{DispatchError, Result};
use crate::store::{RequestStore, TransitionFields};

const REQUEST_COLUMNS: &str = "id, requester_id, claimant_id, materials, \
     latitude, longitude, state, created_at, claimed_at, terminal_at, \
     collected_kg";

#[derive(Debug, Clone)]
pub struct PostgresRequestStore {
    pool: PgPool,
}

impl PostgresRequestStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Connect with bounded retry. Deployments start the service and the
    /// database together; the database is routinely a few seconds behind.
    pub async fn connect(url: &str, max_attempts: u32) -> Result<Self> {
        let mut attempt = 0;
        loop {
            attempt += 1;
            match PgPoolOptions::new()
                .max_connections(16)
                .connect(url)
                .await
            {
                Ok(pool) => return Ok(Self { pool }),
                Err(err) if attempt < max_attempts => {
                    tracing::info!(
                        attempt,
                        error = %err,
                        "database not ready, retrying"
                    );
                    tokio::time::sleep(Duration::from_secs(2)).await;
                }
                Err(err) => return Err(err.into()),
            }
        }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Create the requests table if it does not exist yet.
    pub async fn ensure_schema(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS pickup_requests (
                id UUID PRIMARY KEY,
                requester_id UUID NOT NULL,
                claimant_id UUID,
                materials JSONB NOT NULL,
                latitude DOUBLE PRECISION NOT NULL,
                longitude DOUBLE PRECISION NOT NULL,
                state TEXT NOT NULL,
                created_at TIMESTAMPTZ NOT NULL,
                claimed_at TIMESTAMPTZ,
                terminal_at TIMESTAMPTZ,
                collected_kg DOUBLE PRECISION
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_pickup_requests_state \
             ON pickup_requests (state)",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_pickup_requests_requester \
             ON pickup_requests (requester_id)",
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

fn request_from_row(row: &PgRow) -> Result<PickupRequest> {
    let state_raw: String = row.try_get("state")?;
    let state = RequestState::parse(&state_raw).ok_or_else(|| {
        DispatchError::Store(format!("unknown request state: {state_raw}"))
    })?;

    let materials_json: serde_json::Value = row.try_get("materials")?;
    let materials = serde_json::from_value(materials_json)
        .map_err(|err| DispatchError::Store(err.to_string()))?;

    Ok(PickupRequest {
        id: RequestId(row.try_get::<Uuid, _>("id")?),
        requester_id: UserId(row.try_get::<Uuid, _>("requester_id")?),
        claimant_id: row
            .try_get::<Option<Uuid>, _>("claimant_id")?
            .map(UserId),
        materials,
        location: GeoPoint {
            latitude: row.try_get("latitude")?,
            longitude: row.try_get("longitude")?,
        },
        state,
        created_at: row.try_get::<DateTime<Utc>, _>("created_at")?,
        claimed_at: row.try_get::<Option<DateTime<Utc>>, _>("claimed_at")?,
        terminal_at: row.try_get::<Option<DateTime<Utc>>, _>("terminal_at")?,
        collected_kg: row.try_get::<Option<f64>, _>("collected_kg")?,
    })
}

#[async_trait]
impl RequestStore for PostgresRequestStore {
    async fn create(&self, request: &PickupRequest) -> Result<()> {
        let materials = serde_json::to_value(&request.materials)
            .map_err(|err| DispatchError::Store(err.to_string()))?;

        sqlx::query(
            "INSERT INTO pickup_requests \
             (id, requester_id, claimant_id, materials, latitude, longitude, \
              state, created_at, claimed_at, terminal_at, collected_kg) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)",
        )
        .bind(request.id.to_uuid())
        .bind(request.requester_id.to_uuid())
        .bind(request.claimant_id.map(|id| id.to_uuid()))
        .bind(materials)
        .bind(request.location.latitude)
        .bind(request.location.longitude)
        .bind(request.state.as_str())
        .bind(request.created_at)
        .bind(request.claimed_at)
        .bind(request.terminal_at)
        .bind(request.collected_kg)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn get(&self, id: RequestId) -> Result<Option<PickupRequest>> {
        let row = sqlx::query(&format!(
            "SELECT {REQUEST_COLUMNS} FROM pickup_requests WHERE id = $1"
        ))
        .bind(id.to_uuid())
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(request_from_row).transpose()
    }

    async fn list_pending(&self) -> Result<Vec<PickupRequest>> {
        let rows = sqlx::query(&format!(
            "SELECT {REQUEST_COLUMNS} FROM pickup_requests \
             WHERE state = 'pending' ORDER BY created_at"
        ))
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(request_from_row).collect()
    }

    async fn active_for_requester(
        &self,
        requester: UserId,
    ) -> Result<Option<PickupRequest>> {
        let row = sqlx::query(&format!(
            "SELECT {REQUEST_COLUMNS} FROM pickup_requests \
             WHERE requester_id = $1 AND state IN ('pending', 'claimed') \
             ORDER BY created_at DESC LIMIT 1"
        ))
        .bind(requester.to_uuid())
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(request_from_row).transpose()
    }

    async fn update_state(
        &self,
        id: RequestId,
        expected: RequestState,
        new: RequestState,
        fields: TransitionFields,
    ) -> Result<PickupRequest> {
        let row = sqlx::query(&format!(
            "UPDATE pickup_requests SET \
                 state = $3, \
                 claimant_id = COALESCE($4, claimant_id), \
                 claimed_at = COALESCE($5, claimed_at), \
                 terminal_at = COALESCE($6, terminal_at), \
                 collected_kg = COALESCE($7, collected_kg) \
             WHERE id = $1 AND state = $2 \
             RETURNING {REQUEST_COLUMNS}"
        ))
        .bind(id.to_uuid())
        .bind(expected.as_str())
        .bind(new.as_str())
        .bind(fields.claimant_id.map(|id| id.to_uuid()))
        .bind(fields.claimed_at)
        .bind(fields.terminal_at)
        .bind(fields.collected_kg)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => request_from_row(&row),
            // Zero rows: either the id is unknown or the state moved under
            // us. Re-read to report the right error.
            None => match self.get(id).await? {
                Some(current) => Err(DispatchError::Conflict(format!(
                    "request {id} is {}, expected {}",
                    current.state.as_str(),
                    expected.as_str()
                ))),
                None => Err(DispatchError::NotFound(id)),
            },
        }
    }
}
