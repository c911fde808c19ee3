//! Graceful shutdown trigger.

use std::future::Future;

/// Resolves once `signal` fires.
///
/// If the signal handler cannot be installed the error is logged and the
/// future never resolves, so the server keeps running until killed.
pub async fn shutdown_signal<F>(signal: F)
where
    F: Future<Output = std::io::Result<()>>,
{
    match signal.await {
        Ok(()) => tracing::info!("Shutdown signal received"),
        Err(e) => {
            tracing::error!("Failed to install shutdown signal handler: {}", e);
            std::future::pending::<()>().await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;
    use std::time::Duration;

    #[tokio::test]
    async fn test_resolves_on_signal() {
        let done = tokio::time::timeout(Duration::from_secs(1), shutdown_signal(async { Ok(()) })).await;
        assert!(done.is_ok());
    }

    #[tokio::test]
    async fn test_handler_error_keeps_serving() {
        let failed = async { Err(io::Error::other("no signal driver")) };
        let done = tokio::time::timeout(Duration::from_millis(50), shutdown_signal(failed)).await;
        assert!(done.is_err());
    }
}
