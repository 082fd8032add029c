use crate::config::SecurityHeadersConfig;
use axum::{
    body::Body,
    http::{header, HeaderValue, Request, Response},
    middleware::Next,
};
use std::{future::Future, pin::Pin};

pub fn create_security_headers_middleware(
    config: SecurityHeadersConfig,
) -> impl Fn(Request<Body>, Next) -> Pin<Box<dyn Future<Output = Response<Body>> + Send>> + Clone
{
    move |request: Request<Body>, next: Next| {
        let config = config.clone();
        Box::pin(async move {
            let mut response = next.run(request).await;
            if !config.enabled {
                return response;
            }

            let headers = response.headers_mut();

            if let Some(csp) = config.csp.as_deref().and_then(|v| HeaderValue::from_str(v).ok()) {
                headers.insert(header::CONTENT_SECURITY_POLICY, csp);
            }

            if let Some(frame_options) = config
                .frame_options
                .as_deref()
                .and_then(|v| HeaderValue::from_str(v).ok())
            {
                headers.insert(header::X_FRAME_OPTIONS, frame_options);
            }

            headers.insert(
                header::X_CONTENT_TYPE_OPTIONS,
                HeaderValue::from_static("nosniff"),
            );
            headers.insert(
                header::REFERRER_POLICY,
                HeaderValue::from_static("strict-origin-when-cross-origin"),
            );

            response
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        http::StatusCode,
        middleware::{self},
        response::IntoResponse,
        routing::get,
        Router,
    };
    use tower::ServiceExt;

    async fn dummy_handler() -> impl IntoResponse {
        "Hello, World!"
    }

    async fn call(config: SecurityHeadersConfig) -> Response<Body> {
        let app = Router::new()
            .route("/", get(dummy_handler))
            .layer(middleware::from_fn(create_security_headers_middleware(config)));

        app.oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_security_headers_added() {
        let response = call(SecurityHeadersConfig::default()).await;
        assert_eq!(response.status(), StatusCode::OK);

        let headers = response.headers();
        assert!(headers.contains_key(header::CONTENT_SECURITY_POLICY));
        assert_eq!(headers[header::X_FRAME_OPTIONS], "DENY");
        assert_eq!(headers[header::X_CONTENT_TYPE_OPTIONS], "nosniff");
        assert_eq!(
            headers[header::REFERRER_POLICY],
            "strict-origin-when-cross-origin"
        );
    }

    #[tokio::test]
    async fn test_optional_headers_can_be_dropped() {
        let response = call(SecurityHeadersConfig {
            enabled: true,
            csp: None,
            frame_options: Some("SAMEORIGIN".to_string()),
        })
        .await;

        let headers = response.headers();
        assert!(!headers.contains_key(header::CONTENT_SECURITY_POLICY));
        assert_eq!(headers[header::X_FRAME_OPTIONS], "SAMEORIGIN");
    }

    #[tokio::test]
    async fn test_disabled() {
        let response = call(SecurityHeadersConfig {
            enabled: false,
            ..SecurityHeadersConfig::default()
        })
        .await;
        assert!(!response.headers().contains_key(header::X_CONTENT_TYPE_OPTIONS));
    }
}
