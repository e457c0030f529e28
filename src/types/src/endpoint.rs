use crate::ListenerError;
use url::Url;

/// Parses a WebSocket endpoint. Only `ws` and `wss` URLs with a host are accepted.
pub fn parse_endpoint(url: &str) -> Result<Url, ListenerError> {
    let invalid = |reason: String| ListenerError::InvalidUrl {
        url: url.to_string(),
        reason,
    };

    let parsed = Url::parse(url).map_err(|e| invalid(e.to_string()))?;
    if !matches!(parsed.scheme(), "ws" | "wss") {
        return Err(invalid(format!("unsupported scheme '{}'", parsed.scheme())));
    }
    if parsed.host_str().map_or(true, str::is_empty) {
        return Err(invalid("missing host".to_string()));
    }
    Ok(parsed)
}
