use std::time::{Duration, Instant};
use tokio::net::TcpStream;
use tracing::debug;

use super::race;
use crate::models::CheckResult;

/// Online iff a TCP connection is established before `timeout`.
pub async fn check_tcp(host: &str, port: u16, timeout: Duration, grace: Duration) -> CheckResult {
    let start = Instant::now();
    let outcome = race(TcpStream::connect((host, port)), timeout, grace).await;
    let rtt = start.elapsed();

    match outcome {
        Some(Ok(stream)) => {
            drop(stream);
            CheckResult::online(rtt)
        }
        Some(Err(e)) => {
            debug!(host, port, error = %e, "tcp connect failed");
            CheckResult::offline(Some(rtt))
        }
        None => {
            debug!(host, port, timeout_ms = timeout.as_millis() as u64, "tcp connect timed out");
            CheckResult::offline(Some(rtt))
        }
    }
}
