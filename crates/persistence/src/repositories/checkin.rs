//! Check-in ledger repository for database operations.
//!
//! Events are only ever inserted. A trigger in the schema rejects updates
//! and deletes on `checkin_events`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use domain::models::{CheckinEvent, EntryPolicy, LedgerStats, NewCheckinEvent, ScanSource};
use domain::services::{CheckinLedger, GrantDecision};
use domain::StoreError;
use sqlx::{PgConnection, PgPool};

use crate::entities::{CheckinEventEntity, CheckinOutcomeDb, LedgerStatsEntity, ScanSourceDb};
use crate::metrics::QueryTimer;

fn db_error(err: sqlx::Error) -> StoreError {
    StoreError::Database(err.to_string())
}

/// PostgreSQL-backed check-in ledger.
#[derive(Clone)]
pub struct PgCheckinLedger {
    pool: PgPool,
}

impl PgCheckinLedger {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn insert_event(
        conn: &mut PgConnection,
        event: &NewCheckinEvent,
    ) -> Result<CheckinEvent, sqlx::Error> {
        let row = sqlx::query_as::<_, CheckinEventEntity>(
            r#"
            INSERT INTO checkin_events (code, observed_at, outcome, source)
            VALUES ($1, $2, $3, $4)
            RETURNING id, code, observed_at, outcome, source
            "#,
        )
        .bind(&event.code)
        .bind(event.observed_at)
        .bind(CheckinOutcomeDb::from(event.outcome))
        .bind(ScanSourceDb::from(event.source))
        .fetch_one(conn)
        .await?;
        Ok(row.into())
    }

    async fn grant_in_transaction(
        &self,
        code: &str,
        observed_at: DateTime<Utc>,
        source: ScanSource,
        policy: EntryPolicy,
    ) -> Result<GrantDecision, sqlx::Error> {
        let mut tx = self.pool.begin().await?;

        // Serializes grant attempts per code until commit.
        sqlx::query("SELECT pg_advisory_xact_lock(hashtext($1))")
            .bind(code)
            .execute(&mut *tx)
            .await?;

        let first_grant = match policy {
            EntryPolicy::SingleEntry => {
                sqlx::query_scalar::<_, DateTime<Utc>>(
                    r#"
                    SELECT observed_at
                    FROM checkin_events
                    WHERE code = $1 AND outcome = 'granted'
                    ORDER BY id
                    LIMIT 1
                    "#,
                )
                .bind(code)
                .fetch_optional(&mut *tx)
                .await?
            }
            EntryPolicy::Unlimited => None,
        };

        let event = Self::insert_event(
            &mut *tx,
            &NewCheckinEvent::grant_attempt(code, observed_at, source, first_grant.is_none()),
        )
        .await?;

        tx.commit().await?;

        Ok(GrantDecision::new(event, first_grant))
    }
}

#[async_trait]
impl CheckinLedger for PgCheckinLedger {
    async fn append(&self, event: NewCheckinEvent) -> Result<CheckinEvent, StoreError> {
        let timer = QueryTimer::postgres("append_checkin_event");
        let result = match self.pool.acquire().await {
            Ok(mut conn) => Self::insert_event(&mut *conn, &event).await,
            Err(e) => Err(e),
        };
        timer.finish(result).map_err(db_error)
    }

    async fn record_grant(
        &self,
        code: &str,
        observed_at: DateTime<Utc>,
        source: ScanSource,
        policy: EntryPolicy,
    ) -> Result<GrantDecision, StoreError> {
        let timer = QueryTimer::postgres("record_grant");
        let result = self
            .grant_in_transaction(code, observed_at, source, policy)
            .await;
        timer.finish(result).map_err(db_error)
    }

    async fn stats(&self) -> Result<LedgerStats, StoreError> {
        let timer = QueryTimer::postgres("ledger_stats");
        let result = sqlx::query_as::<_, LedgerStatsEntity>(
            r#"
            SELECT
                COUNT(DISTINCT code) FILTER (WHERE outcome = 'granted') AS granted_codes,
                COUNT(*) FILTER (WHERE outcome = 'granted') AS granted_events,
                COUNT(*) FILTER (WHERE outcome <> 'granted') AS denied_events
            FROM checkin_events
            "#,
        )
        .fetch_one(&self.pool)
        .await;
        timer.finish(result).map(LedgerStats::from).map_err(db_error)
    }

    async fn recent(&self, limit: usize) -> Result<Vec<CheckinEvent>, StoreError> {
        let timer = QueryTimer::postgres("recent_checkin_events");
        let result = sqlx::query_as::<_, CheckinEventEntity>(
            r#"
            SELECT id, code, observed_at, outcome, source
            FROM checkin_events
            ORDER BY id DESC
            LIMIT $1
            "#,
        )
        .bind(i64::try_from(limit).unwrap_or(i64::MAX))
        .fetch_all(&self.pool)
        .await;
        timer
            .finish(result)
            .map(|rows| rows.into_iter().map(CheckinEvent::from).collect())
            .map_err(db_error)
    }
}
