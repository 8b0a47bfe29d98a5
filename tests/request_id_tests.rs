use std::sync::{Arc, Mutex};

use actix_web::{App, HttpMessage, HttpResponse, test, web};

use microbase::api::middleware::{
    RequestId, RequestIdMiddleware, ServiceIdentity, TimingMiddleware, generate_request_id,
};

async fn echo_request_id(req: actix_web::HttpRequest) -> HttpResponse {
    let id = req
        .extensions()
        .get::<RequestId>()
        .map(|id| id.0.clone())
        .unwrap_or_default();
    HttpResponse::Ok().body(id)
}

#[actix_rt::test]
async fn response_carries_request_id_header() {
    let app = test::init_service(
        App::new()
            .wrap(RequestIdMiddleware::default())
            .route("/", web::get().to(echo_request_id)),
    )
    .await;

    let resp = test::call_service(&app, test::TestRequest::get().uri("/").to_request()).await;
    assert!(resp.status().is_success());

    let header = resp
        .headers()
        .get("x-request-id")
        .expect("x-request-id header missing")
        .to_str()
        .unwrap()
        .to_string();
    assert_eq!(header.matches('.').count(), 1);

    let body = test::read_body(resp).await;
    assert_eq!(body, header.as_bytes());
}

#[actix_rt::test]
async fn same_client_gets_same_fingerprint_across_requests() {
    let app = test::init_service(
        App::new()
            .wrap(RequestIdMiddleware::default())
            .route("/", web::get().to(echo_request_id)),
    )
    .await;

    let mut fingerprints = Vec::new();
    let mut randoms = Vec::new();
    for _ in 0..2 {
        let req = test::TestRequest::get()
            .uri("/")
            .insert_header(("x-forwarded-for", "203.0.113.9"))
            .insert_header(("user-agent", "integration-test/1.0"))
            .to_request();
        let resp = test::call_service(&app, req).await;
        let id = resp
            .headers()
            .get("x-request-id")
            .unwrap()
            .to_str()
            .unwrap()
            .to_string();
        let (fingerprint, random) = id.split_once('.').unwrap();
        fingerprints.push(fingerprint.to_string());
        randoms.push(random.to_string());
    }

    assert_eq!(fingerprints[0], fingerprints[1]);
    assert_ne!(randoms[0], randoms[1]);
}

#[derive(Clone, Default)]
struct LogSink(Arc<Mutex<Vec<u8>>>);

impl LogSink {
    fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
    }
}

impl std::io::Write for LogSink {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

impl<'a> tracing_subscriber::fmt::MakeWriter<'a> for LogSink {
    type Writer = LogSink;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}

#[actix_rt::test]
async fn request_log_lines_carry_service_identity() {
    let sink = LogSink::default();
    let subscriber = tracing_subscriber::fmt()
        .with_ansi(false)
        .with_writer(sink.clone())
        .finish();
    let _guard = tracing::subscriber::set_default(subscriber);

    // Request-ID wraps last so its span encloses the timing log.
    let app = test::init_service(
        App::new()
            .wrap(TimingMiddleware)
            .wrap(RequestIdMiddleware::new(ServiceIdentity::new(
                "orders",
                Some("i-0abc1234def"),
            )))
            .route("/", web::get().to(echo_request_id)),
    )
    .await;

    let resp = test::call_service(&app, test::TestRequest::get().uri("/").to_request()).await;
    assert!(resp.status().is_success());

    let output = sink.contents();
    assert!(output.contains("Request completed"));
    assert!(output.contains("service=orders"));
    assert!(output.contains("instance=i-0abc12"));
}

#[core::prelude::v1::test]
fn generated_ids_are_unique_per_call() {
    let first = generate_request_id("198.51.100.7", "bench", "salt");
    let second = generate_request_id("198.51.100.7", "bench", "salt");
    assert_ne!(first, second);
}
