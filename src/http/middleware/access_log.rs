//! Access logging.
//!
//! Wraps the whole pipeline and writes one line per request once the inner
//! chain has produced a response, including rejections from inner layers:
//!
//! ```text
//! <METHOD> <PATH> <STATUS> <DURATION_MS>ms
//! ```
//!
//! Headers and bodies are never recorded.

use std::time::Instant;

use axum::{body::Body, http::Request, middleware::Next, response::Response};

use crate::observability::metrics;
use crate::routing::decode_path;

pub async fn access_log_middleware(request: Request<Body>, next: Next) -> Response {
    let start = Instant::now();
    let method = request.method().clone();
    let raw = request.uri().path();
    let path = decode_path(raw).map_or_else(|| raw.to_string(), |p| p.into_owned());

    let response = next.run(request).await;

    let status = response.status().as_u16();
    tracing::info!(
        target: "mockr::access",
        "{} {} {} {}ms",
        method,
        path,
        status,
        start.elapsed().as_millis()
    );
    metrics::record_request(method.as_str(), status, start);

    response
}

#[cfg(test)]
mod tests {
    use std::io::{self, Write};
    use std::sync::{Arc, Mutex};

    use axum::http::{header, Method, StatusCode};
    use tower::ServiceExt;
    use tracing_subscriber::fmt::MakeWriter;

    use super::*;
    use crate::config::loader::parse_config;
    use crate::http::MockServer;
    use crate::routing::RouteStore;
    use crate::security::{RateLimiter, MAX_BODY_BYTES};

    #[derive(Clone, Default)]
    struct Captured(Arc<Mutex<Vec<u8>>>);

    impl Captured {
        fn access_lines(&self) -> Vec<String> {
            let bytes = self.0.lock().unwrap();
            String::from_utf8_lossy(&bytes)
                .lines()
                .filter_map(|line| line.split_once("mockr::access: "))
                .map(|(_, message)| message.to_string())
                .collect()
        }
    }

    impl Write for Captured {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl<'a> MakeWriter<'a> for Captured {
        type Writer = Captured;

        fn make_writer(&'a self) -> Self::Writer {
            self.clone()
        }
    }

    fn request(method: Method, uri: &str, body: Body) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .header("x-api-key", "secret-token")
            .body(body)
            .unwrap()
    }

    #[tokio::test]
    async fn test_one_line_per_request_including_rejections() {
        let captured = Captured::default();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(captured.clone())
            .with_ansi(false)
            .without_time()
            .with_max_level(tracing::Level::INFO)
            .finish();
        let _guard = tracing::subscriber::set_default(subscriber);

        let table = parse_config(br#"{"routes":{"/ping":{"method":"GET","response":"pong"}}}"#)
            .unwrap()
            .valid_routes;
        let router = MockServer::new(RouteStore::new(table), RateLimiter::new(0.001, 3).map(Arc::new))
            .router();

        let big = Body::from(vec![b'x'; MAX_BODY_BYTES + 1]);
        let cases = [
            (request(Method::GET, "/ping", Body::empty()), StatusCode::OK),
            (request(Method::GET, "/missing", Body::empty()), StatusCode::NOT_FOUND),
            (request(Method::POST, "/ping", big), StatusCode::PAYLOAD_TOO_LARGE),
            (request(Method::GET, "/ping", Body::from("password")), StatusCode::TOO_MANY_REQUESTS),
        ];
        for (req, expected) in cases {
            let response = router.clone().oneshot(req).await.unwrap();
            assert_eq!(response.status(), expected);
        }

        let lines = captured.access_lines();
        assert_eq!(lines.len(), 4, "{lines:?}");

        let expected = [
            ("GET", "/ping", "200"),
            ("GET", "/missing", "404"),
            ("POST", "/ping", "413"),
            ("GET", "/ping", "429"),
        ];
        for (line, (method, path, status)) in lines.iter().zip(expected) {
            let fields: Vec<&str> = line.split(' ').collect();
            assert_eq!(fields.len(), 4, "{line}");
            assert_eq!(&fields[..3], [method, path, status]);
            let millis = fields[3].strip_suffix("ms").unwrap();
            assert!(millis.parse::<u128>().is_ok(), "{line}");
            assert!(!line.contains("secret-token"));
            assert!(!line.contains("password"));
            assert!(!line.to_lowercase().contains(header::CONTENT_LENGTH.as_str()));
        }
    }

    #[tokio::test]
    async fn test_logs_decoded_path() {
        let captured = Captured::default();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(captured.clone())
            .with_ansi(false)
            .without_time()
            .finish();
        let _guard = tracing::subscriber::set_default(subscriber);

        let router = MockServer::new(RouteStore::default(), None).router();
        let response = router
            .oneshot(request(Method::GET, "/a%20b", Body::empty()))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let lines = captured.access_lines();
        assert_eq!(lines.len(), 1);
        assert!(lines[0].starts_with("GET /a b 404 "), "{}", lines[0]);
    }
}
