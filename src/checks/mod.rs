//! Protocol checkers.
//!
//! Each checker takes an address and a timeout and returns a [`CheckResult`];
//! none of them ever returns an error. Sockets are owned by the checker's
//! future, so they are closed on every exit path: completion, error, or the
//! future being dropped when a deadline fires.
//!
//! [`CheckResult`]: crate::models::CheckResult

use std::future::Future;
use std::time::Duration;
use tokio::time;

pub mod gsp;
pub mod http;
pub mod tcp;

pub use gsp::check_gsp;
pub use http::check_http;
pub use tcp::check_tcp;

/// Races `fut` against `timeout`, with an outer guard at `timeout + grace`.
///
/// Returns `None` if either deadline fires first. Whichever fires, `fut` is
/// dropped exactly once and the caller sees a single timeout.
pub(crate) async fn race<F: Future>(
    fut: F,
    timeout: Duration,
    grace: Duration,
) -> Option<F::Output> {
    match time::timeout(timeout + grace, time::timeout(timeout, fut)).await {
        Ok(Ok(out)) => Some(out),
        Ok(Err(_)) | Err(_) => None,
    }
}
