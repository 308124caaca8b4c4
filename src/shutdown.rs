// Graceful shutdown handling for signal trapping

use anyhow::Result;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// How often the server checks the shutdown flag
const SHUTDOWN_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Shared shutdown state across the application
#[derive(Clone)]
pub struct ShutdownState {
    /// Flag indicating shutdown has been requested
    shutdown_requested: Arc<AtomicBool>,
    /// Flag indicating cleanup has completed
    cleanup_complete: Arc<AtomicBool>,
}

impl ShutdownState {
    /// Create a new shutdown state
    pub fn new() -> Self {
        Self {
            shutdown_requested: Arc::new(AtomicBool::new(false)),
            cleanup_complete: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Request a shutdown
    pub fn request_shutdown(&self) {
        self.shutdown_requested.store(true, Ordering::SeqCst);
        log::info!("Shutdown requested");
    }

    /// Check if shutdown has been requested
    pub fn is_shutdown_requested(&self) -> bool {
        self.shutdown_requested.load(Ordering::SeqCst)
    }

    /// Mark cleanup as complete
    pub fn mark_cleanup_complete(&self) {
        self.cleanup_complete.store(true, Ordering::SeqCst);
        log::info!("Cleanup complete");
    }

    /// Check if cleanup is complete
    pub fn is_cleanup_complete(&self) -> bool {
        self.cleanup_complete.load(Ordering::SeqCst)
    }

    /// Resolves once a shutdown has been requested
    pub async fn wait_for_shutdown(&self) {
        while !self.is_shutdown_requested() {
            tokio::time::sleep(SHUTDOWN_POLL_INTERVAL).await;
        }
        log::info!("Shutdown signal received, stopping server...");
    }
}

impl Default for ShutdownState {
    fn default() -> Self {
        Self::new()
    }
}

/// Result of graceful shutdown cleanup
#[derive(Debug, Clone, Default)]
pub struct ShutdownResult {
    /// Unsubmitted survey drafts that were dropped
    pub surveys_discarded: usize,
    /// Sign-in sessions that were dropped
    pub sessions_dropped: usize,
    /// Whether the data directory lock was released
    pub lock_released: bool,
    /// Any errors encountered during cleanup
    pub errors: Vec<String>,
}

impl ShutdownResult {
    pub fn new() -> Self {
        Self::default()
    }

    /// Check if shutdown was clean (no errors)
    pub fn is_clean(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Graceful shutdown handler
pub struct ShutdownHandler {
    state: ShutdownState,
}

impl ShutdownHandler {
    /// Create with existing state
    pub fn with_state(state: ShutdownState) -> Self {
        Self { state }
    }

    /// Get the shutdown state
    pub fn state(&self) -> &ShutdownState {
        &self.state
    }

    /// Perform graceful shutdown
    /// This should be called once the server has stopped accepting requests
    pub fn handle_shutdown<F>(&self, cleanup_fn: F) -> Result<ShutdownResult>
    where
        F: FnOnce() -> Result<ShutdownResult>,
    {
        self.state.request_shutdown();

        log::info!("Starting graceful shutdown...");

        let result = cleanup_fn()?;

        log::info!(
            "Shutdown complete: {} unsubmitted surveys discarded, {} sessions dropped, lock {}",
            result.surveys_discarded,
            result.sessions_dropped,
            if result.lock_released { "released" } else { "kept" }
        );

        for error in &result.errors {
            log::warn!("Cleanup error: {}", error);
        }

        self.state.mark_cleanup_complete();

        Ok(result)
    }
}

/// Register signal handlers for graceful shutdown
/// This sets up handlers for SIGINT (Ctrl+C), SIGTERM, and SIGHUP
#[cfg(unix)]
pub fn register_signal_handlers(state: ShutdownState) -> Result<()> {
    use signal_hook::consts::{SIGHUP, SIGINT, SIGTERM};
    use signal_hook::iterator::Signals;
    use std::thread;

    let mut signals = Signals::new([SIGINT, SIGTERM, SIGHUP])
        .map_err(|e| anyhow::anyhow!("Failed to register signal handlers: {}", e))?;

    thread::spawn(move || {
        for signal in signals.forever() {
            match signal {
                SIGINT => {
                    log::info!("Received SIGINT (Ctrl+C)");
                    state.request_shutdown();
                }
                SIGTERM => {
                    log::info!("Received SIGTERM");
                    state.request_shutdown();
                }
                SIGHUP => {
                    log::info!("Received SIGHUP");
                    state.request_shutdown();
                }
                _ => {}
            }
        }
    });

    log::info!("Signal handlers registered (SIGINT, SIGTERM, SIGHUP)");
    Ok(())
}

/// Register signal handlers for Windows
#[cfg(windows)]
pub fn register_signal_handlers(state: ShutdownState) -> Result<()> {
    ctrlc::set_handler(move || {
        log::info!("Received Ctrl+C");
        state.request_shutdown();
    })
    .map_err(|e| anyhow::anyhow!("Failed to register Ctrl+C handler: {}", e))?;

    log::info!("Signal handler registered (Ctrl+C)");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shutdown_state_new() {
        let state = ShutdownState::new();
        assert!(!state.is_shutdown_requested());
        assert!(!state.is_cleanup_complete());
    }

    #[test]
    fn test_shutdown_state_clone() {
        let state1 = ShutdownState::new();
        let state2 = state1.clone();

        state1.request_shutdown();
        // Both should reflect the change since they share Arc
        assert!(state2.is_shutdown_requested());
    }

    #[tokio::test]
    async fn test_wait_for_shutdown_resolves() {
        let state = ShutdownState::new();
        let waiter = state.clone();
        let handle = tokio::spawn(async move { waiter.wait_for_shutdown().await });

        state.request_shutdown();
        tokio::time::timeout(Duration::from_secs(2), handle)
            .await
            .unwrap()
            .unwrap();
    }

    #[test]
    fn test_shutdown_result_is_clean() {
        let mut result = ShutdownResult::new();
        assert!(result.is_clean());

        result.errors.push("Failed to release lock".to_string());
        assert!(!result.is_clean());
    }

    #[test]
    fn test_handle_shutdown_success() {
        let handler = ShutdownHandler::with_state(ShutdownState::new());

        let result = handler
            .handle_shutdown(|| {
                Ok(ShutdownResult {
                    surveys_discarded: 2,
                    sessions_dropped: 5,
                    lock_released: true,
                    errors: vec![],
                })
            })
            .unwrap();

        assert_eq!(result.surveys_discarded, 2);
        assert!(result.is_clean());
        assert!(handler.state().is_shutdown_requested());
        assert!(handler.state().is_cleanup_complete());
    }
}
