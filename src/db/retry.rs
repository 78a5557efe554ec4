use crate::config::AppConfig;
use crate::errors::ServiceError;
use metrics::{counter, histogram};
use std::future::Future;
use std::time::{Duration, Instant};
use tokio::time::sleep;
use tracing::{debug, warn};

/// Configuration for retry behavior
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Maximum number of attempts, the first one included
    pub max_attempts: u32,
    /// Initial delay between retries
    pub initial_delay: Duration,
    /// Maximum delay between retries
    pub max_delay: Duration,
    /// Factor to multiply delay by after each attempt
    pub backoff_factor: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay: Duration::from_millis(25),
            max_delay: Duration::from_secs(1),
            backoff_factor: 2.0,
        }
    }
}

impl From<&AppConfig> for RetryConfig {
    fn from(cfg: &AppConfig) -> Self {
        Self {
            max_attempts: cfg.txn_max_attempts.max(1),
            initial_delay: cfg.txn_retry_backoff(),
            ..Default::default()
        }
    }
}

/// Runs one transactional unit of work, re-running it from scratch while it
/// fails with a retryable error and attempts remain.
///
/// `operation` must build a fresh transaction on every call; nothing from a
/// failed attempt is reused.
pub async fn with_retry<F, Fut, T>(
    config: &RetryConfig,
    operation_name: &'static str,
    mut operation: F,
) -> Result<T, ServiceError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, ServiceError>>,
{
    let mut delay = config.initial_delay;
    let mut attempts = 0;
    let start = Instant::now();

    loop {
        attempts += 1;

        match operation().await {
            Ok(result) => {
                if attempts > 1 {
                    debug!(operation = operation_name, attempts, "Operation succeeded after retry");
                }
                counter!("lending_txn.committed", 1, "operation" => operation_name);
                histogram!(
                    "lending_txn.duration_seconds",
                    start.elapsed().as_secs_f64(),
                    "operation" => operation_name
                );
                return Ok(result);
            }
            Err(error) => {
                counter!("lending_txn.rolled_back", 1, "operation" => operation_name);

                if !error.is_retryable() {
                    return Err(error);
                }
                if attempts >= config.max_attempts {
                    warn!(
                        operation = operation_name,
                        attempts,
                        error = %error,
                        "Giving up after exhausting transaction attempts"
                    );
                    return Err(error);
                }

                warn!(
                    operation = operation_name,
                    attempt = attempts,
                    error = %error,
                    "Transaction attempt failed, retrying in {:?}",
                    delay
                );
                counter!("lending_txn.retried", 1, "operation" => operation_name);

                sleep(delay).await;

                delay = Duration::from_secs_f64(
                    (delay.as_secs_f64() * config.backoff_factor)
                        .min(config.max_delay.as_secs_f64()),
                );
            }
        }
    }
}
