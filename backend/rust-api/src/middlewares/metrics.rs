use axum::{extract::MatchedPath, extract::Request, middleware::Next, response::Response};
use std::time::Instant;

use crate::metrics::{HTTP_REQUESTS_TOTAL, HTTP_REQUEST_DURATION_SECONDS};

/// Records request count and latency per method, route and status.
pub async fn metrics_middleware(req: Request, next: Next) -> Response {
    let start = Instant::now();
    let method = req.method().to_string();
    // Route template when the router matched one; raw paths would explode cardinality
    let path = req
        .extensions()
        .get::<MatchedPath>()
        .map(|matched| matched.as_str().to_string())
        .unwrap_or_else(|| normalize_path(req.uri().path()));

    let response = next.run(req).await;

    let duration = start.elapsed().as_secs_f64();
    let status = response.status().as_u16().to_string();

    HTTP_REQUESTS_TOTAL
        .with_label_values(&[&method, &path, &status])
        .inc();

    HTTP_REQUEST_DURATION_SECONDS
        .with_label_values(&[&method, &path])
        .observe(duration);

    response
}

/// Fallback for unmatched requests: anything past the known API prefixes
/// collapses into one label.
fn normalize_path(path: &str) -> String {
    let known = ["/health", "/metrics", "/api/v1/profile", "/api/v1/lessons"];
    if known.contains(&path) {
        path.to_string()
    } else {
        "unmatched".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_path() {
        assert_eq!(normalize_path("/health"), "/health");
        assert_eq!(normalize_path("/api/v1/lessons"), "/api/v1/lessons");
        assert_eq!(normalize_path("/api/v1/lessons/abc/zzz"), "unmatched");
        assert_eq!(normalize_path("/wp-admin.php"), "unmatched");
    }
}
