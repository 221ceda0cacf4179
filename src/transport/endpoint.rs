use anyhow::{bail, Result};

/// Default websocket path on the call server
pub const DEFAULT_PATH: &str = "/ws";

/// Derive the websocket URL for a page origin
///
/// A secure origin (`https://`) maps to `wss://`, a plain one (`http://`) to `ws://`.
/// Any path, query or fragment on the origin is discarded.
pub fn websocket_url(origin: &str, path: &str) -> Result<String> {
    let (scheme, rest) = if let Some(rest) = origin.strip_prefix("https://") {
        ("wss", rest)
    } else if let Some(rest) = origin.strip_prefix("http://") {
        ("ws", rest)
    } else {
        bail!("Origin must start with http:// or https://, got {:?}", origin);
    };

    let host = rest
        .split(|c| c == '/' || c == '?' || c == '#')
        .next()
        .unwrap_or_default();
    if host.is_empty() {
        bail!("Origin {:?} has no host", origin);
    }

    if !path.starts_with('/') {
        bail!("Websocket path must start with '/', got {:?}", path);
    }

    Ok(format!("{}://{}{}", scheme, host, path))
}
