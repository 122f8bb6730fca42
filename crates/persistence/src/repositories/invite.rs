//! Invite repository for database operations.

use async_trait::async_trait;
use domain::models::Invite;
use domain::services::InviteStore;
use domain::StoreError;
use sqlx::PgPool;

use super::store_error;
use crate::entities::InviteEntity;
use crate::metrics::QueryTimer;

/// PostgreSQL-backed invite registry.
#[derive(Clone)]
pub struct PgInviteRepository {
    pool: PgPool,
}

impl PgInviteRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl InviteStore for PgInviteRepository {
    async fn insert(&self, invite: &Invite) -> Result<(), StoreError> {
        let timer = QueryTimer::postgres("insert_invite");
        let result = sqlx::query(
            r#"
            INSERT INTO invites (code, invitee_name, issued_at)
            VALUES ($1, $2, $3)
            "#,
        )
        .bind(&invite.code)
        .bind(&invite.invitee_name)
        .bind(invite.issued_at)
        .execute(&self.pool)
        .await;

        timer
            .finish(result)
            .map(|_| ())
            .map_err(|e| store_error(e, &invite.code))
    }

    async fn find_by_code(&self, code: &str) -> Result<Option<Invite>, StoreError> {
        let timer = QueryTimer::postgres("find_invite_by_code");
        let result = sqlx::query_as::<_, InviteEntity>(
            r#"
            SELECT code, invitee_name, issued_at
            FROM invites
            WHERE code = $1
            "#,
        )
        .bind(code)
        .fetch_optional(&self.pool)
        .await;

        timer
            .finish(result)
            .map(|row| row.map(Invite::from))
            .map_err(|e| store_error(e, code))
    }

    async fn count(&self) -> Result<i64, StoreError> {
        let timer = QueryTimer::postgres("count_invites");
        let result = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM invites")
            .fetch_one(&self.pool)
            .await;
        timer
            .finish(result)
            .map_err(|e| StoreError::Database(e.to_string()))
    }

    async fn ping(&self) -> Result<(), StoreError> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map(|_| ())
            .map_err(|e| StoreError::Database(e.to_string()))
    }
}
