use url::Url;

use crate::target::{ProtocolHint, TargetDescriptor};

/// The checker a target is dispatched to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route<'a> {
    Disabled,
    Http(&'a Url),
    Tcp { host: &'a str, port: u16 },
    Gsp { host: &'a str, port: u16 },
    /// No usable URL and no usable host+port. Never dialed.
    Unreachable,
}

/// Picks a checker. URL first, then host+port, otherwise unreachable.
pub fn route(target: &TargetDescriptor) -> Route<'_> {
    if !target.enabled {
        return Route::Disabled;
    }
    if let Some(url) = &target.url {
        return Route::Http(url);
    }
    match (target.host.as_deref(), target.port) {
        (Some(host), Some(port)) if port > 0 => match target.protocol {
            ProtocolHint::Tcp => Route::Tcp { host, port },
            ProtocolHint::Gsp => Route::Gsp { host, port },
        },
        _ => Route::Unreachable,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::target::normalize;
    use serde_json::json;
    use std::time::Duration;

    fn target(v: serde_json::Value) -> TargetDescriptor {
        normalize(&v, Duration::from_secs(1))
    }

    #[test]
    fn url_takes_precedence_over_host_port() {
        let t = target(json!({
            "id": "a",
            "url": "https://example.org/health",
            "host": "x",
            "port": 22
        }));
        assert!(matches!(route(&t), Route::Http(u) if u.host_str() == Some("example.org")));
    }

    #[test]
    fn host_port_routes_to_tcp_or_gsp() {
        let t = target(json!({ "id": "a", "host": "db.local", "port": 5432 }));
        assert_eq!(route(&t), Route::Tcp { host: "db.local", port: 5432 });

        let t = target(json!({ "id": "a", "host": "mc.local", "port": 25565, "protocol": "gsp" }));
        assert_eq!(route(&t), Route::Gsp { host: "mc.local", port: 25565 });
    }

    #[test]
    fn disabled_wins_over_everything() {
        let t = target(json!({ "id": "a", "enabled": "false", "url": "http://x/" }));
        assert_eq!(route(&t), Route::Disabled);
    }

    #[test]
    fn malformed_input_is_unreachable() {
        assert_eq!(route(&target(json!({ "id": "a" }))), Route::Unreachable);
        assert_eq!(route(&target(json!({ "id": "a", "host": "x" }))), Route::Unreachable);
        assert_eq!(route(&target(json!({ "ip": "0.0.0.0", "port": 80 }))), Route::Unreachable);
        assert_eq!(route(&target(json!(null))), Route::Unreachable);
    }

    #[test]
    fn wildcard_addresses_are_unreachable() {
        let cases = [
            json!({ "id": "a", "url": "http://0.0.0.0:8080/" }),
            json!({ "id": "a", "url": "http://[::]:8080/" }),
            json!({ "id": "a", "ip": "::0", "port": 80 }),
            json!({ "id": "a", "ip": "0:0::0", "port": 80 }),
            json!({ "id": "a", "host": "[::]", "port": 80, "protocol": "gsp" }),
        ];
        for case in cases {
            assert_eq!(route(&target(case.clone())), Route::Unreachable, "{case}");
        }
    }

    #[test]
    fn blank_ip_uses_host() {
        let t = target(json!({ "id": "a", "ip": "", "host": "example.org", "port": 80 }));
        assert_eq!(route(&t), Route::Tcp { host: "example.org", port: 80 });
    }
}
