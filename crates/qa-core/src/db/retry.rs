//! Retry logic for transient database errors.
//!
//! Retries live in the storage-access layer only. Reconciliation never
//! retries on its own; callers such as service startup opt in here.

use std::future::Future;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, warn};

use super::{create_pool, DbError, DbPool};

/// Configuration for retry behavior.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Maximum number of retry attempts.
    pub max_retries: u32,
    /// Initial delay between retries.
    pub initial_delay: Duration,
    /// Maximum delay between retries.
    pub max_delay: Duration,
    /// Multiplier for exponential backoff.
    pub backoff_multiplier: f64,
    /// Whether to add jitter to delays.
    pub jitter: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_delay: Duration::from_millis(100),
            max_delay: Duration::from_secs(5),
            backoff_multiplier: 2.0,
            jitter: true,
        }
    }
}

impl RetryConfig {
    /// Creates a new retry configuration with no retries (fail immediately).
    pub fn no_retry() -> Self {
        Self {
            max_retries: 0,
            ..Default::default()
        }
    }

    /// Patient settings for waiting on a database that is still starting.
    pub fn startup() -> Self {
        Self {
            max_retries: 8,
            initial_delay: Duration::from_millis(250),
            max_delay: Duration::from_secs(10),
            backoff_multiplier: 2.0,
            jitter: true,
        }
    }

    /// Calculates the delay for a given attempt number (0-indexed).
    fn calculate_delay(&self, attempt: u32) -> Duration {
        let base_delay =
            self.initial_delay.as_millis() as f64 * self.backoff_multiplier.powi(attempt as i32);
        let capped_delay = base_delay.min(self.max_delay.as_millis() as f64);

        let final_delay = if self.jitter {
            // Add up to 25% jitter
            let jitter_factor = 1.0 + (rand_jitter() * 0.25);
            capped_delay * jitter_factor
        } else {
            capped_delay
        };

        Duration::from_millis(final_delay as u64)
    }
}

/// Simple pseudo-random jitter factor (0.0 to 1.0).
fn rand_jitter() -> f64 {
    use std::time::SystemTime;
    let nanos = SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .map(|d| d.subsec_nanos())
        .unwrap_or(0);
    (nanos % 1000) as f64 / 1000.0
}

/// Determines if an error is transient and worth retrying.
pub fn is_transient_error(error: &DbError) -> bool {
    match error {
        DbError::PoolExhausted => true,
        DbError::Connection(msg) => {
            let msg_lower = msg.to_lowercase();
            msg_lower.contains("timeout")
                || msg_lower.contains("connection refused")
                || msg_lower.contains("connection reset")
                || msg_lower.contains("broken pipe")
                || msg_lower.contains("network")
                || msg_lower.contains("temporarily unavailable")
        }
        DbError::Transaction(msg) | DbError::Query(msg) => {
            let msg_lower = msg.to_lowercase();
            msg_lower.contains("timeout")
                || msg_lower.contains("deadlock")
                || msg_lower.contains("lock wait")
                || msg_lower.contains("busy")
                || msg_lower.contains("database is locked")
        }
        DbError::InvalidColumn { .. }
        | DbError::Constraint(_)
        | DbError::Configuration(_)
        | DbError::NotFound(_)
        | DbError::Migration(_) => false,
    }
}

/// Executes a database operation with retry logic.
///
/// Returns the result of the operation, or the last error once the error
/// is not transient or the retries are used up.
pub async fn with_retry<F, Fut, T>(
    config: RetryConfig,
    operation_name: &str,
    f: F,
) -> Result<T, DbError>
where
    F: Fn() -> Fut,
    Fut: Future<Output = Result<T, DbError>>,
{
    let mut attempt = 0;
    loop {
        match f().await {
            Ok(result) => {
                if attempt > 0 {
                    debug!(
                        operation = %operation_name,
                        attempt = attempt + 1,
                        "Database operation succeeded after retry"
                    );
                }
                return Ok(result);
            }
            Err(e) => {
                if !is_transient_error(&e) || attempt >= config.max_retries {
                    if attempt > 0 {
                        warn!(
                            operation = %operation_name,
                            attempts = attempt + 1,
                            error = %e,
                            "Database operation failed after retries"
                        );
                    }
                    return Err(e);
                }

                let delay = config.calculate_delay(attempt);
                warn!(
                    operation = %operation_name,
                    attempt = attempt + 1,
                    max_retries = config.max_retries,
                    delay_ms = delay.as_millis() as u64,
                    error = %e,
                    "Transient database error, retrying"
                );
                sleep(delay).await;
                attempt += 1;
            }
        }
    }
}

/// Opens a pool, retrying while the database is unreachable.
pub async fn connect_with_retry(
    database_url: &str,
    config: RetryConfig,
) -> Result<DbPool, DbError> {
    with_retry(config, "connect", || create_pool(database_url)).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::asset::AssetKey;
    use crate::db::MissingRecord;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    fn fast() -> RetryConfig {
        RetryConfig {
            max_retries: 3,
            initial_delay: Duration::from_millis(1),
            max_delay: Duration::from_millis(10),
            backoff_multiplier: 2.0,
            jitter: false,
        }
    }

    #[test]
    fn test_calculate_delay_backs_off_and_caps() {
        let config = RetryConfig {
            max_delay: Duration::from_millis(300),
            jitter: false,
            ..Default::default()
        };

        assert_eq!(config.calculate_delay(0), Duration::from_millis(100));
        assert_eq!(config.calculate_delay(1), Duration::from_millis(200));
        assert_eq!(config.calculate_delay(2), Duration::from_millis(300));
    }

    #[test]
    fn test_is_transient_error() {
        assert!(is_transient_error(&DbError::PoolExhausted));
        assert!(is_transient_error(&DbError::Query(
            "database is locked".to_string()
        )));
        assert!(!is_transient_error(&DbError::NotFound(
            MissingRecord::Asset(AssetKey::new("01", "A1"))
        )));
        assert!(!is_transient_error(&DbError::Constraint(
            "duplicate key".to_string()
        )));
    }

    #[tokio::test]
    async fn test_with_retry_eventually_succeeds() {
        let attempts = Arc::new(AtomicU32::new(0));
        let counter = attempts.clone();

        let result = with_retry(fast(), "test_op", || {
            let counter = counter.clone();
            async move {
                if counter.fetch_add(1, Ordering::SeqCst) < 2 {
                    Err(DbError::PoolExhausted)
                } else {
                    Ok(7)
                }
            }
        })
        .await;

        assert_eq!(result.unwrap(), 7);
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_with_retry_stops_on_permanent_error() {
        let attempts = Arc::new(AtomicU32::new(0));
        let counter = attempts.clone();

        let result = with_retry(fast(), "test_op", || {
            let counter = counter.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Err::<(), _>(DbError::Constraint("dup".to_string()))
            }
        })
        .await;

        assert!(matches!(result, Err(DbError::Constraint(_))));
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_with_retry_exhausted() {
        let attempts = Arc::new(AtomicU32::new(0));
        let counter = attempts.clone();

        let config = RetryConfig {
            max_retries: 2,
            ..fast()
        };
        let result = with_retry(config, "test_op", || {
            let counter = counter.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Err::<(), _>(DbError::PoolExhausted)
            }
        })
        .await;

        assert!(matches!(result, Err(DbError::PoolExhausted)));
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_connect_with_retry_rejects_bad_scheme_immediately() {
        let result = connect_with_retry("ftp://nowhere", RetryConfig::startup()).await;
        assert!(matches!(result, Err(DbError::Configuration(_))));
    }
}
