#![cfg(feature = "web-api")]

use std::net::TcpListener;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use actix_web::http::StatusCode;
use actix_web::{test, web, App, HttpResponse, HttpServer};
use clash_rewrite::models::AppState;
use clash_rewrite::settings::Settings;
use clash_rewrite::web_handlers::interfaces::{config, FALLBACK_GREETING};
use clash_rewrite::ClashConfig;

#[cfg(test)]
mod rewrite_handler_tests {
    use super::*;

    const UPSTREAM: &str = r#"
mixed-port: 7890
mode: rule
proxies:
  - name: A
    type: ss
    server: a.example.com
    port: 8388
    cipher: aes-256-gcm
    password: pa
proxy-groups:
  - name: G
    type: select
    proxies:
      - A
rules:
  - MATCH,G
"#;

    const LOCAL: &str = r#"
- name: B
  type: socks5
  server: 192.168.1.2
  port: 1080
"#;

    /// Starts a throwaway upstream on an ephemeral port and returns its base URL
    fn start_upstream(hits: Arc<AtomicUsize>) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();

        let server = HttpServer::new(move || {
            let hits = Arc::clone(&hits);
            App::new()
                .app_data(web::Data::new(hits))
                .route(
                    "/clash.yaml",
                    web::get().to(|hits: web::Data<Arc<AtomicUsize>>| async move {
                        hits.fetch_add(1, Ordering::SeqCst);
                        HttpResponse::Ok().body(UPSTREAM)
                    }),
                )
                .route(
                    "/flaky.yaml",
                    web::get().to(|hits: web::Data<Arc<AtomicUsize>>| async move {
                        if hits.fetch_add(1, Ordering::SeqCst) == 0 {
                            HttpResponse::ServiceUnavailable().finish()
                        } else {
                            HttpResponse::Ok().body(UPSTREAM)
                        }
                    }),
                )
                .route(
                    "/gone.yaml",
                    web::get().to(|hits: web::Data<Arc<AtomicUsize>>| async move {
                        hits.fetch_add(1, Ordering::SeqCst);
                        HttpResponse::NotFound().finish()
                    }),
                )
                .route(
                    "/broken.yaml",
                    web::get().to(|| async { HttpResponse::Ok().body("proxies: [unclosed") }),
                )
                .route(
                    "/slow.yaml",
                    web::get().to(|| async {
                        actix_web::rt::time::sleep(Duration::from_secs(3)).await;
                        HttpResponse::Ok().body(UPSTREAM)
                    }),
                )
        })
        .workers(1)
        .listen(listener)
        .unwrap()
        .run();
        actix_web::rt::spawn(server);

        format!("http://127.0.0.1:{}", port)
    }

    fn settings(url: String, proxy: &str) -> Settings {
        let mut settings = Settings::new();
        settings.token = "s3cret".to_string();
        settings.url = url;
        settings.proxy = serde_yaml::from_str(proxy).unwrap();
        settings.fetch_timeout = 1;
        settings.fetch_retries = 0;
        settings.fetch_proxy = "NONE".to_string();
        settings
    }

    async fn get(settings: Settings, uri: &str) -> (StatusCode, String) {
        let state = Arc::new(AppState::new(settings));
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(state))
                .configure(|cfg| config(cfg, "/rewrite")),
        )
        .await;
        let req = test::TestRequest::get().uri(uri).to_request();
        let resp = test::call_service(&app, req).await;
        let status = resp.status();
        let body = test::read_body(resp).await;
        (status, String::from_utf8(body.to_vec()).unwrap())
    }

    #[actix_web::test]
    async fn test_valid_token_serves_merged_profile() {
        let hits = Arc::new(AtomicUsize::new(0));
        let base = start_upstream(Arc::clone(&hits));
        let settings = settings(format!("{}/clash.yaml", base), LOCAL);

        let (status, body) = get(settings, "/rewrite?token=s3cret").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(hits.load(Ordering::SeqCst), 1);

        let merged = ClashConfig::from_yaml(&body).unwrap();
        let names: Vec<&str> = merged.proxies.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["B", "A"]);
        assert_eq!(merged.proxy_groups[0].proxies, vec!["B", "A"]);
        assert_eq!(merged.mixed_port, Some(7890));
        assert_eq!(merged.rules, Some(vec!["MATCH,G".to_string()]));
    }

    #[actix_web::test]
    async fn test_wrong_token_gets_greeting_without_fetch() {
        let hits = Arc::new(AtomicUsize::new(0));
        let base = start_upstream(Arc::clone(&hits));

        for uri in ["/rewrite?token=S3CRET", "/rewrite?token=", "/rewrite"] {
            let settings = settings(format!("{}/clash.yaml", base), LOCAL);
            let (status, body) = get(settings, uri).await;
            assert_eq!(status, StatusCode::OK, "{}", uri);
            assert_eq!(body, FALLBACK_GREETING, "{}", uri);
        }
        assert_eq!(hits.load(Ordering::SeqCst), 0);
    }

    #[actix_web::test]
    async fn test_wrong_token_ignores_broken_pipeline() {
        let settings = settings("http://127.0.0.1:9/unreachable".to_string(), "name: B");
        let (status, body) = get(settings, "/rewrite?token=guess").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, FALLBACK_GREETING);
    }

    #[actix_web::test]
    async fn test_upstream_not_found_is_bad_gateway() {
        let base = start_upstream(Arc::new(AtomicUsize::new(0)));
        let settings = settings(format!("{}/missing.yaml", base), LOCAL);

        let (status, body) = get(settings, "/rewrite?token=s3cret").await;
        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert!(body.contains("404"), "{}", body);
    }

    #[actix_web::test]
    async fn test_transient_upstream_error_is_retried() {
        let hits = Arc::new(AtomicUsize::new(0));
        let base = start_upstream(Arc::clone(&hits));
        let mut settings = settings(format!("{}/flaky.yaml", base), LOCAL);
        settings.fetch_retries = 1;

        let (status, body) = get(settings, "/rewrite?token=s3cret").await;
        assert_eq!(status, StatusCode::OK, "{}", body);
        assert_eq!(hits.load(Ordering::SeqCst), 2);

        let merged = ClashConfig::from_yaml(&body).unwrap();
        assert_eq!(merged.proxy_groups[0].proxies, vec!["B", "A"]);
    }

    #[actix_web::test]
    async fn test_transient_upstream_error_without_retries() {
        let hits = Arc::new(AtomicUsize::new(0));
        let base = start_upstream(Arc::clone(&hits));
        let settings = settings(format!("{}/flaky.yaml", base), LOCAL);

        let (status, body) = get(settings, "/rewrite?token=s3cret").await;
        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert!(body.contains("503"), "{}", body);
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[actix_web::test]
    async fn test_client_error_is_not_retried() {
        let hits = Arc::new(AtomicUsize::new(0));
        let base = start_upstream(Arc::clone(&hits));
        let mut settings = settings(format!("{}/gone.yaml", base), LOCAL);
        settings.fetch_retries = 3;

        let (status, body) = get(settings, "/rewrite?token=s3cret").await;
        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert!(body.contains("404"), "{}", body);
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[actix_web::test]
    async fn test_upstream_unreachable_is_bad_gateway() {
        let port = {
            let listener = TcpListener::bind("127.0.0.1:0").unwrap();
            listener.local_addr().unwrap().port()
        };
        let settings = settings(format!("http://127.0.0.1:{}/clash.yaml", port), LOCAL);

        let (status, _) = get(settings, "/rewrite?token=s3cret").await;
        assert_eq!(status, StatusCode::BAD_GATEWAY);
    }

    #[actix_web::test]
    async fn test_broken_upstream_is_bad_gateway() {
        let base = start_upstream(Arc::new(AtomicUsize::new(0)));
        let settings = settings(format!("{}/broken.yaml", base), LOCAL);

        let (status, body) = get(settings, "/rewrite?token=s3cret").await;
        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert!(body.contains("Failed to parse upstream profile"), "{}", body);
    }

    #[actix_web::test]
    async fn test_slow_upstream_times_out() {
        let base = start_upstream(Arc::new(AtomicUsize::new(0)));
        let settings = settings(format!("{}/slow.yaml", base), LOCAL);

        let (status, _) = get(settings, "/rewrite?token=s3cret").await;
        assert_eq!(status, StatusCode::GATEWAY_TIMEOUT);
    }

    #[actix_web::test]
    async fn test_local_mapping_is_server_error() {
        let base = start_upstream(Arc::new(AtomicUsize::new(0)));
        let settings = settings(
            format!("{}/clash.yaml", base),
            "{name: B, type: socks5, server: b, port: 1}",
        );

        let (status, body) = get(settings, "/rewrite?token=s3cret").await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(body.contains("must be a sequence"), "{}", body);
    }
}
