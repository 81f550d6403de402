use axum::http::HeaderValue;
use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use std::sync::Arc;

/// Security headers configuration
#[derive(Clone)]
pub struct SecurityHeadersConfig {
    /// Extra origins allowed to serve generated media
    pub media_origins: Vec<String>,
    pub is_production: bool,
}

impl SecurityHeadersConfig {
    pub fn new(media_origins: Vec<String>, is_production: bool) -> Self {
        Self {
            media_origins,
            is_production,
        }
    }

    /// The API only returns JSON, so nothing but media is ever loaded.
    fn build_csp(&self) -> String {
        let mut img_src = String::from("img-src 'self' data:");
        let mut media_src = String::from("media-src 'self'");
        for origin in &self.media_origins {
            img_src.push(' ');
            img_src.push_str(origin);
            media_src.push(' ');
            media_src.push_str(origin);
        }

        [
            "default-src 'none'",
            img_src.as_str(),
            media_src.as_str(),
            "frame-ancestors 'none'",
            "base-uri 'none'",
        ]
        .join("; ")
    }
}

/// Adds security headers to all HTTP responses
pub async fn security_headers_middleware(
    State(config): State<Arc<SecurityHeadersConfig>>,
    request: Request,
    next: Next,
) -> Response {
    let mut response = next.run(request).await;
    let headers = response.headers_mut();

    headers.insert("X-Content-Type-Options", HeaderValue::from_static("nosniff"));
    headers.insert("X-Frame-Options", HeaderValue::from_static("DENY"));
    headers.insert("Referrer-Policy", HeaderValue::from_static("no-referrer"));

    if config.is_production {
        headers.insert(
            "Strict-Transport-Security",
            HeaderValue::from_static("max-age=31536000; includeSubDomains"),
        );
    }

    if let Ok(header_value) = HeaderValue::from_str(&config.build_csp()) {
        headers.insert("Content-Security-Policy", header_value);
    }

    // Balances and task status change constantly
    headers.insert("Cache-Control", HeaderValue::from_static("no-store, private"));

    response
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn csp_lists_media_origins() {
        let config = SecurityHeadersConfig::new(vec!["https://cdn.example.com".to_string()], false);
        let csp = config.build_csp();
        assert!(csp.starts_with("default-src 'none'"));
        assert!(csp.contains("img-src 'self' data: https://cdn.example.com"));
        assert!(csp.contains("media-src 'self' https://cdn.example.com"));
    }

    #[test]
    fn csp_without_origins_stays_closed() {
        let csp = SecurityHeadersConfig::new(Vec::new(), true).build_csp();
        assert!(csp.contains("img-src 'self' data:;"));
        assert!(csp.contains("frame-ancestors 'none'"));
    }
}
