//! Status-only handshake against a game server.
//!
//! `Connecting -> Handshaking -> AwaitingResponse -> parsed / timed out / error`.
//! The stream lives inside [`query_status`], so it is closed once whichever
//! way the exchange ends.

use serde_json::Value;
use std::io;
use std::time::{Duration, Instant};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tracing::debug;

use super::race;
use crate::models::{CheckResult, Players};
use crate::wire;

pub async fn check_gsp(
    host: &str,
    port: u16,
    timeout: Duration,
    grace: Duration,
    protocol_version: i32,
) -> CheckResult {
    let start = Instant::now();
    let outcome = race(query_status(host, port, protocol_version), timeout, grace).await;
    let rtt = start.elapsed();

    match outcome {
        Some(Ok(buf)) => parse_response(&buf, rtt),
        Some(Err(e)) => {
            debug!(host, port, error = %e, "status query failed");
            CheckResult::offline(Some(rtt))
        }
        None => {
            debug!(host, port, timeout_ms = timeout.as_millis() as u64, "status query timed out");
            CheckResult::offline(Some(rtt))
        }
    }
}

/// Sends handshake + status request and collects the reply until the peer
/// closes or a full frame has arrived.
async fn query_status(host: &str, port: u16, protocol_version: i32) -> io::Result<Vec<u8>> {
    let mut stream = TcpStream::connect((host, port)).await?;
    stream
        .write_all(&wire::encode_status_query(protocol_version, host, port))
        .await?;

    let mut buf = Vec::with_capacity(1024);
    let mut chunk = [0u8; 4096];
    loop {
        let n = stream.read(&mut chunk).await?;
        if n == 0 {
            break;
        }
        buf.extend_from_slice(&chunk[..n]);
        if !matches!(wire::frame_complete(&buf), Ok(false)) {
            break;
        }
    }
    let _ = stream.shutdown().await;
    Ok(buf)
}

/// Turns the accumulated reply into a result. Any malformation is offline.
pub fn parse_response(buf: &[u8], rtt: Duration) -> CheckResult {
    let doc = match wire::decode_status_response(buf) {
        Ok(doc) => doc,
        Err(e) => {
            debug!(error = %e, len = buf.len(), "malformed status response");
            return CheckResult::offline(Some(rtt));
        }
    };
    let status: Value = match serde_json::from_str(&doc) {
        Ok(v) => v,
        Err(e) => {
            debug!(error = %e, "status document is not JSON");
            return CheckResult::offline(Some(rtt));
        }
    };

    CheckResult {
        players: players(&status),
        version: version(&status),
        ..CheckResult::online(rtt)
    }
}

fn players(status: &Value) -> Option<Players> {
    let players = status.get("players")?;
    Some(Players {
        online: players.get("online")?.as_u64()?,
        max: players.get("max")?.as_u64()?,
    })
}

fn version(status: &Value) -> Option<String> {
    match status.get("version")? {
        Value::String(s) => Some(s.clone()),
        v => v.get("name")?.as_str().map(str::to_owned),
    }
}
