//! Dev server: static docs tree behind the root-redirect middleware.

use std::sync::Arc;

use anyhow::{Context, Result};
use axum::{
    extract::{Request, State},
    middleware::{self, Next},
    response::Response,
    Router,
};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::config::{Config, LocaleConfig};
use crate::redirect::{decide, redirect_response, RedirectRequest};

/// Middleware: redirect `/` to the negotiated locale root, pass everything else on.
pub async fn root_redirect(
    State(config): State<Arc<LocaleConfig>>,
    request: Request,
    next: Next,
) -> Response {
    let decision = decide(
        &RedirectRequest::from_http(request.uri(), request.headers()),
        &config,
    );

    if !decision.should_redirect {
        return next.run(request).await;
    }

    redirect_response(&decision, &config)
}

/// Build the dev server router serving `config.docs_dir`.
pub fn router(config: &Config) -> Router {
    let locale = Arc::new(config.locale.clone());

    Router::new()
        .fallback_service(ServeDir::new(&config.docs_dir))
        .layer(middleware::from_fn_with_state(locale, root_redirect))
        // Method and path only; query strings and cookies stay out of the logs
        .layer(
            TraceLayer::new_for_http().make_span_with(|request: &axum::http::Request<_>| {
                tracing::info_span!(
                    "http_request",
                    method = %request.method(),
                    path = %request.uri().path(),
                )
            }),
        )
}

/// Bind and serve until the process is stopped.
pub async fn serve(config: Config) -> Result<()> {
    let addr = config.bind_addr();
    let app = router(&config);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    info!("Serving {} on http://{}", config.docs_dir, addr);
    axum::serve(listener, app).await.context("Server error")?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::{header, StatusCode};
    use tempfile::TempDir;
    use tower::ServiceExt;

    // ==================== Test Helpers ====================

    /// Create a docs tree with one index page per locale
    fn create_docs_dir() -> TempDir {
        let dir = TempDir::new().expect("Failed to create temp dir");
        for (locale, title) in [("en", "Docs"), ("zh", "文档")] {
            let locale_dir = dir.path().join(locale);
            std::fs::create_dir_all(&locale_dir).expect("Failed to create locale dir");
            std::fs::write(
                locale_dir.join("index.html"),
                format!("<html lang=\"{}\"><title>{}</title></html>", locale, title),
            )
            .expect("Failed to write index");
        }
        std::fs::write(dir.path().join("index.html"), "root index").expect("Failed to write root");
        dir
    }

    fn create_test_config(dir: &TempDir) -> Config {
        Config {
            locale: LocaleConfig::default(),
            host: "127.0.0.1".to_string(),
            port: 0,
            docs_dir: dir.path().to_str().unwrap().to_string(),
        }
    }

    fn get(uri: &str) -> axum::http::request::Builder {
        axum::http::Request::builder().method("GET").uri(uri)
    }

    async fn body_text(response: Response) -> String {
        let bytes = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("Failed to read body");
        String::from_utf8(bytes.to_vec()).expect("utf-8 body")
    }

    // ==================== Redirect Tests ====================

    #[tokio::test]
    async fn test_root_redirects_with_cookie() {
        let dir = create_docs_dir();
        let app = router(&create_test_config(&dir));

        let response = app
            .oneshot(
                get("/")
                    .header(header::ACCEPT_LANGUAGE, "zh-CN,zh;q=0.9,en;q=0.8")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::FOUND);
        assert_eq!(response.headers()[header::LOCATION], "/zh/");
        assert_eq!(
            response.headers()[header::SET_COOKIE],
            "su8_locale=zh; Max-Age=31536000; Path=/; SameSite=Lax"
        );
    }

    #[tokio::test]
    async fn test_root_with_query() {
        let dir = create_docs_dir();
        let app = router(&create_test_config(&dir));

        let response = app
            .oneshot(get("/?utm_source=x").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::FOUND);
        assert_eq!(response.headers()[header::LOCATION], "/en/?utm_source=x");
    }

    #[tokio::test]
    async fn test_existing_cookie_not_rewritten() {
        let dir = create_docs_dir();
        let app = router(&create_test_config(&dir));

        let response = app
            .oneshot(
                get("/")
                    .header(header::COOKIE, "su8_locale=garbage")
                    .header(header::ACCEPT_LANGUAGE, "zh")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.headers()[header::LOCATION], "/zh/");
        assert!(response.headers().get(header::SET_COOKIE).is_none());
    }

    #[tokio::test]
    async fn test_forwarded_https_sets_secure_cookie() {
        let dir = create_docs_dir();
        let app = router(&create_test_config(&dir));

        let response = app
            .oneshot(
                get("/")
                    .header("x-forwarded-proto", "https")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        let cookie = response.headers()[header::SET_COOKIE].to_str().unwrap();
        assert!(cookie.ends_with("; Secure"));
    }

    // ==================== Pass-through Tests ====================

    #[tokio::test]
    async fn test_locale_page_served() {
        let dir = create_docs_dir();
        let app = router(&create_test_config(&dir));

        let response = app
            .oneshot(
                get("/zh/")
                    .header(header::ACCEPT_LANGUAGE, "en")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers().get(header::SET_COOKIE).is_none());
        assert!(body_text(response).await.contains("文档"));
    }

    #[tokio::test]
    async fn test_other_root_files_pass_through() {
        let dir = create_docs_dir();
        let app = router(&create_test_config(&dir));

        let response = app
            .oneshot(get("/index.html").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_text(response).await, "root index");
    }

    #[tokio::test]
    async fn test_missing_page_is_not_found() {
        let dir = create_docs_dir();
        let app = router(&create_test_config(&dir));

        let response = app
            .oneshot(get("/fr/").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
