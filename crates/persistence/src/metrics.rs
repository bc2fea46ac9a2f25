//! Database metrics collection.

use metrics::{counter, gauge, histogram};
use sqlx::PgPool;
use std::time::Instant;

/// Record how long a named query took and whether it failed.
pub fn record_query_duration(query_name: &'static str, duration_secs: f64, ok: bool) {
    let outcome = if ok { "ok" } else { "error" };
    histogram!(
        "database_query_duration_seconds",
        "query" => query_name,
        "outcome" => outcome
    )
    .record(duration_secs);

    if !ok {
        counter!("database_query_errors_total", "query" => query_name).increment(1);
    }
}

/// Publish connection pool gauges. Called from the readiness probe.
pub fn record_pool_metrics(pool: &PgPool) {
    let size = pool.size() as usize;
    let idle = pool.num_idle();

    gauge!("database_connections_active").set(size.saturating_sub(idle) as f64);
    gauge!("database_connections_idle").set(idle as f64);
    gauge!("database_connections_total").set(size as f64);
}

/// Times a single repository query.
///
/// ```ignore
/// let timer = QueryTimer::new("find_join_code_by_id");
/// let result = sqlx::query_as::<_, JoinCodeEntity>(...).fetch_optional(&pool).await;
/// timer.finish(&result);
/// result
/// ```
pub struct QueryTimer {
    query_name: &'static str,
    start: Instant,
}

impl QueryTimer {
    pub fn new(query_name: &'static str) -> Self {
        Self {
            query_name,
            start: Instant::now(),
        }
    }

    /// Record the elapsed time, labelled with the query outcome.
    pub fn finish<T, E>(self, result: &Result<T, E>) {
        record_query_duration(
            self.query_name,
            self.start.elapsed().as_secs_f64(),
            result.is_ok(),
        );
    }
}
