use std::time::{Duration, Instant};
use tracing::debug;
use url::Url;

use crate::models::CheckResult;

/// GET `url`, following redirects. Online iff the final status is 2xx or 3xx
/// and it arrives within `timeout`.
pub async fn check_http(client: &reqwest::Client, url: &Url, timeout: Duration) -> CheckResult {
    let start = Instant::now();
    let outcome = client.get(url.clone()).timeout(timeout).send().await;
    let rtt = start.elapsed();

    match outcome {
        Ok(response) => {
            let status = response.status();
            let online = (200..400).contains(&status.as_u16());
            if !online {
                debug!(url = %url, status = %status, "http check got non-qualifying status");
            }
            CheckResult { online, round_trip: Some(rtt), ..CheckResult::default() }
        }
        Err(e) if e.is_timeout() => {
            debug!(url = %url, timeout_ms = timeout.as_millis() as u64, "http check timed out");
            CheckResult::offline(Some(rtt))
        }
        Err(e) => {
            debug!(url = %url, error = %e, "http check failed");
            CheckResult::offline(Some(rtt))
        }
    }
}
