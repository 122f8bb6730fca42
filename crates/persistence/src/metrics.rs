//! Storage metrics collection.

use metrics::{counter, gauge, histogram};
use sqlx::PgPool;
use std::time::Instant;

/// Record the duration of a storage operation.
pub fn record_query_duration(backend: &'static str, query_name: &'static str, duration_secs: f64) {
    histogram!(
        "storage_query_duration_seconds",
        "backend" => backend,
        "query" => query_name
    )
    .record(duration_secs);
}

/// Count a failed storage operation.
pub fn record_query_error(backend: &'static str, query_name: &'static str) {
    counter!(
        "storage_query_errors_total",
        "backend" => backend,
        "query" => query_name
    )
    .increment(1);
}

/// Record connection pool gauges.
pub fn record_pool_metrics(pool: &PgPool) {
    let size = pool.size() as usize;
    let idle = pool.num_idle();
    let active = size.saturating_sub(idle);

    gauge!("database_connections_active").set(active as f64);
    gauge!("database_connections_idle").set(idle as f64);
    gauge!("database_connections_total").set(size as f64);
}

/// Times a storage operation.
///
/// ```ignore
/// let timer = QueryTimer::postgres("find_invite_by_code");
/// let result = sqlx::query_as::<_, InviteEntity>(...).fetch_optional(&pool).await;
/// timer.finish(result)
/// ```
pub struct QueryTimer {
    backend: &'static str,
    query_name: &'static str,
    start: Instant,
}

impl QueryTimer {
    pub fn new(backend: &'static str, query_name: &'static str) -> Self {
        Self {
            backend,
            query_name,
            start: Instant::now(),
        }
    }

    pub fn postgres(query_name: &'static str) -> Self {
        Self::new("postgres", query_name)
    }

    pub fn file(query_name: &'static str) -> Self {
        Self::new("file", query_name)
    }

    /// Records the elapsed time, and an error count if the operation failed.
    pub fn finish<T, E>(self, result: Result<T, E>) -> Result<T, E> {
        record_query_duration(self.backend, self.query_name, self.start.elapsed().as_secs_f64());
        if result.is_err() {
            record_query_error(self.backend, self.query_name);
        }
        result
    }
}
