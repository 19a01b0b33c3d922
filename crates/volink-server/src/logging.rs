// Request logging middleware
//
// Every request is tagged with a random trace id which is attached to the
// request extensions, echoed in the `X-Trace-Id` response header, and
// embedded in every error envelope the handlers produce.

use axum::{
    body::Body,
    extract::Request,
    http::{header::HeaderValue, Method},
    middleware::Next,
    response::Response,
};
use rand::Rng;
use std::ops::Deref;
use std::time::Instant;

/// Upper bound for logged request body excerpts.
const MAX_BODY_LOG_CHARS: usize = 200;

/// Request trace id carried through extensions.
#[derive(Debug, Clone)]
pub struct TraceId(pub String);

impl Deref for TraceId {
    type Target = String;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl TraceId {
    pub fn generate() -> Self {
        let mut rng = rand::thread_rng();
        let bytes: [u8; 8] = rng.gen();
        let hex: String = bytes.iter().map(|b| format!("{:02x}", b)).collect();
        TraceId(hex)
    }
}

/// Paths whose request bodies must never reach the log (credentials, codes).
fn is_sensitive(path: &str) -> bool {
    path.starts_with("/v1/auth/")
}

/// Truncate a body excerpt on a char boundary.
fn truncate_body(body: &str) -> String {
    if body.chars().count() <= MAX_BODY_LOG_CHARS {
        return body.to_string();
    }
    let truncated: String = body.chars().take(MAX_BODY_LOG_CHARS).collect();
    format!("{}...", truncated)
}

fn format_elapsed(elapsed: std::time::Duration) -> String {
    let micros = elapsed.as_micros();
    if micros < 1_000 {
        format!("{}us", micros)
    } else if micros < 1_000_000 {
        format!("{:.1}ms", micros as f64 / 1_000.0)
    } else {
        format!("{:.2}s", micros as f64 / 1_000_000.0)
    }
}

pub async fn request_logging(req: Request, next: Next) -> Response {
    let path = req.uri().path().to_string();

    // Swagger UI assets are noise
    if path.starts_with("/docs") {
        return next.run(req).await;
    }

    let trace_id = TraceId::generate();
    let method = req.method().clone();
    let query = req.uri().query().map(|q| q.to_string());
    let start = Instant::now();

    let capture_body = matches!(method, Method::POST | Method::PUT | Method::PATCH)
        && !is_sensitive(&path);

    let req = if capture_body {
        let (parts, body) = req.into_parts();
        match axum::body::to_bytes(body, 1024 * 1024).await {
            Ok(bytes) => {
                let excerpt = String::from_utf8_lossy(&bytes);
                tracing::info!(
                    trace_id = %trace_id.0,
                    method = %method,
                    path = %path,
                    query = query.as_deref().unwrap_or(""),
                    body = %truncate_body(&excerpt),
                    "Request"
                );
                Request::from_parts(parts, Body::from(bytes))
            }
            Err(e) => {
                tracing::warn!(
                    trace_id = %trace_id.0,
                    method = %method,
                    path = %path,
                    error = %e,
                    "Failed to read request body"
                );
                Request::from_parts(parts, Body::empty())
            }
        }
    } else {
        tracing::info!(
            trace_id = %trace_id.0,
            method = %method,
            path = %path,
            query = query.as_deref().unwrap_or(""),
            "Request"
        );
        req
    };

    let mut req = req;
    req.extensions_mut().insert(trace_id.clone());

    let mut response = next.run(req).await;

    let status = response.status();
    let elapsed = format_elapsed(start.elapsed());
    if status.is_server_error() {
        tracing::error!(
            trace_id = %trace_id.0,
            method = %method,
            path = %path,
            status = %status.as_u16(),
            elapsed = %elapsed,
            "Response"
        );
    } else if status.is_client_error() {
        tracing::warn!(
            trace_id = %trace_id.0,
            method = %method,
            path = %path,
            status = %status.as_u16(),
            elapsed = %elapsed,
            "Response"
        );
    } else {
        tracing::info!(
            trace_id = %trace_id.0,
            method = %method,
            path = %path,
            status = %status.as_u16(),
            elapsed = %elapsed,
            "Response"
        );
    }

    if let Ok(value) = HeaderValue::from_str(&trace_id.0) {
        response.headers_mut().insert("x-trace-id", value);
    }

    response
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trace_id_is_16_hex_chars() {
        let id = TraceId::generate();
        assert_eq!(id.0.len(), 16);
        assert!(id.0.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_truncate_body_respects_char_boundaries() {
        let short = "hello";
        assert_eq!(truncate_body(short), "hello");

        let long: String = "志".repeat(MAX_BODY_LOG_CHARS + 50);
        let truncated = truncate_body(&long);
        assert!(truncated.ends_with("..."));
        assert_eq!(truncated.chars().count(), MAX_BODY_LOG_CHARS + 3);
    }

    #[test]
    fn test_sensitive_paths() {
        assert!(is_sensitive("/v1/auth/login"));
        assert!(is_sensitive("/v1/auth/otp/verify"));
        assert!(!is_sensitive("/v1/campaigns"));
    }

    #[test]
    fn test_format_elapsed_units() {
        assert_eq!(format_elapsed(std::time::Duration::from_micros(500)), "500us");
        assert_eq!(format_elapsed(std::time::Duration::from_micros(2_500)), "2.5ms");
        assert_eq!(format_elapsed(std::time::Duration::from_secs(3)), "3.00s");
    }
}
