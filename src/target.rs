//! Target list ingestion.
//!
//! Raw entries from the target list are read leniently and normalized once
//! into [`TargetDescriptor`]s. Nothing downstream re-interprets raw fields.

use serde::Deserialize;
use serde_json::Value;
use std::net::IpAddr;
use std::path::Path;
use std::time::Duration;
use tracing::{debug, warn};
use url::{Host, Url};

use crate::error::{TickError, TickResult};

const LOOPBACK: &str = "127.0.0.1";
const MAX_ID_LEN: usize = 256;

/// Which checker a host+port target asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ProtocolHint {
    #[default]
    Tcp,
    Gsp,
}

/// Normalized view of one service to check.
#[derive(Debug, Clone, PartialEq)]
pub struct TargetDescriptor {
    /// `None` when the raw id was missing, blank or otherwise unusable.
    pub id: Option<String>,
    pub enabled: bool,
    pub protocol: ProtocolHint,
    pub url: Option<Url>,
    /// `None` when absent or a wildcard placeholder.
    pub host: Option<String>,
    pub port: Option<u16>,
    pub timeout: Duration,
}

impl TargetDescriptor {
    pub fn label(&self) -> &str {
        self.id.as_deref().unwrap_or("<no id>")
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawTarget {
    id: Option<Value>,
    enabled: Option<Value>,
    url: Option<Value>,
    ip: Option<Value>,
    host: Option<Value>,
    port: Option<Value>,
    #[serde(rename = "timeoutMs")]
    timeout_ms: Option<Value>,
    #[serde(alias = "kind")]
    protocol: Option<Value>,
}

/// Interprets the `enabled` flag. Absent means enabled; only explicit
/// false-like spellings turn a target off.
pub fn parse_enabled(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => true,
        Some(Value::Bool(b)) => *b,
        Some(Value::Number(n)) => n.as_f64().map_or(true, |f| f != 0.0),
        Some(Value::String(s)) => {
            !matches!(s.trim().to_ascii_lowercase().as_str(), "false" | "0" | "no" | "off")
        }
        Some(_) => true,
    }
}

/// Returns the id if it is usable as a snapshot key.
pub fn normalize_id(value: Option<&Value>) -> Option<String> {
    let id = value?.as_str()?.trim();
    if id.is_empty() || id.chars().count() > MAX_ID_LEN || id.chars().any(char::is_control) {
        return None;
    }
    Some(id.to_string())
}

fn parse_url(value: Option<&Value>) -> Option<Url> {
    let raw = value?.as_str()?.trim();
    let url = Url::parse(raw).ok()?;
    if !matches!(url.scheme(), "http" | "https") {
        return None;
    }
    match url.host()? {
        Host::Ipv4(ip) if ip.is_unspecified() => None,
        Host::Ipv6(ip) if ip.is_unspecified() => None,
        _ => Some(url),
    }
}

fn parse_port(value: Option<&Value>) -> Option<u16> {
    let port = match value? {
        Value::Number(n) => n.as_u64()?,
        Value::String(s) => s.trim().parse::<u64>().ok()?,
        _ => return None,
    };
    u16::try_from(port).ok().filter(|p| *p > 0)
}

/// All-zeros addresses in any spelling are placeholders, never dialed.
fn is_placeholder(host: &str) -> bool {
    host.parse::<IpAddr>().is_ok_and(|ip| ip.is_unspecified())
}

/// `Some(host)` for a dialable host, `None` for absent or placeholder.
///
/// `ip` is preferred over `host`; a blank, non-string or placeholder entry
/// falls through to the next one. Loopback is assumed only when neither key
/// is given at all.
fn parse_host(raw: &RawTarget, port: Option<u16>) -> Option<String> {
    let given: Vec<&Value> = [raw.ip.as_ref(), raw.host.as_ref()]
        .into_iter()
        .flatten()
        .filter(|v| !v.is_null())
        .collect();

    if given.is_empty() {
        return port.map(|_| LOOPBACK.to_string());
    }

    given
        .into_iter()
        .filter_map(Value::as_str)
        .map(|h| h.trim().trim_start_matches('[').trim_end_matches(']'))
        .find(|h| !h.is_empty() && !is_placeholder(h))
        .map(str::to_string)
}

fn parse_timeout(value: Option<&Value>, default: Duration) -> Duration {
    let ms = match value {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    match ms {
        Some(ms) if ms.is_finite() && ms >= 1.0 => Duration::from_millis(ms as u64),
        _ => default,
    }
}

fn parse_protocol(value: Option<&Value>) -> ProtocolHint {
    match value.and_then(Value::as_str).map(|s| s.trim().to_ascii_lowercase()) {
        Some(p) if matches!(p.as_str(), "gsp" | "minecraft" | "mc") => ProtocolHint::Gsp,
        _ => ProtocolHint::Tcp,
    }
}

/// Normalizes one raw list entry. Never fails: bad fields degrade to
/// "no usable address".
pub fn normalize(entry: &Value, default_timeout: Duration) -> TargetDescriptor {
    let raw = RawTarget::deserialize(entry).unwrap_or_else(|e| {
        debug!(error = %e, "target entry is not an object, treating as unaddressable");
        RawTarget::default()
    });

    let port = parse_port(raw.port.as_ref());
    TargetDescriptor {
        id: normalize_id(raw.id.as_ref()),
        enabled: parse_enabled(raw.enabled.as_ref()),
        protocol: parse_protocol(raw.protocol.as_ref()),
        url: parse_url(raw.url.as_ref()),
        host: parse_host(&raw, port),
        port,
        timeout: parse_timeout(raw.timeout_ms.as_ref(), default_timeout),
    }
}

/// Accepts a bare array, or an object holding a `targets`/`servers` array.
pub fn parse_targets(doc: &Value, default_timeout: Duration) -> Option<Vec<TargetDescriptor>> {
    let entries = match doc {
        Value::Array(items) => items,
        Value::Object(map) => map
            .get("targets")
            .or_else(|| map.get("servers"))
            .and_then(Value::as_array)?,
        _ => return None,
    };
    Some(entries.iter().map(|e| normalize(e, default_timeout)).collect())
}

/// Reads the target list fresh. Missing or non-collection input is fatal.
pub async fn load_targets(
    path: &Path,
    default_timeout: Duration,
) -> TickResult<Vec<TargetDescriptor>> {
    let content = tokio::fs::read_to_string(path)
        .await
        .map_err(|source| TickError::TargetsUnreadable { path: path.to_path_buf(), source })?;

    let doc: Value = serde_json::from_str(&content).map_err(|e| TickError::TargetsMalformed {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;

    let targets = parse_targets(&doc, default_timeout).ok_or_else(|| TickError::TargetsMalformed {
        path: path.to_path_buf(),
        reason: "expected an array of targets".into(),
    })?;

    let unnamed = targets.iter().filter(|t| t.id.is_none()).count();
    if unnamed > 0 {
        warn!(count = unnamed, "targets without a valid id will be checked but not persisted");
    }
    Ok(targets)
}
