use async_compression::tokio::write::GzipEncoder;
use fetch_core::{fetch, BodySource, FetchErrorKind, RequestInit};
use tokio::io::AsyncWriteExt;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn gzip(data: &[u8]) -> Vec<u8> {
    let mut encoder = GzipEncoder::new(Vec::new());
    encoder.write_all(data).await.unwrap();
    encoder.shutdown().await.unwrap();
    encoder.into_inner()
}

#[tokio::test]
async fn fetches_plain_text() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/hello"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "text/plain")
                .set_body_string("world"),
        )
        .mount(&server)
        .await;

    let resp = fetch(format!("{}/hello", server.uri()), RequestInit::new())
        .await
        .unwrap();

    assert_eq!(resp.status().as_u16(), 200);
    assert_eq!(resp.headers().get("content-type").unwrap(), "text/plain");
    assert_eq!(resp.body().text().await.unwrap(), "world");
}

#[cfg(feature = "json")]
#[tokio::test]
async fn fetches_and_decodes_json_once() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/json"))
        .respond_with(ResponseTemplate::new(200).set_body_string(r#"{"name":"value"}"#))
        .mount(&server)
        .await;

    let resp = fetch(format!("{}/json", server.uri()), RequestInit::new())
        .await
        .unwrap();

    let value: serde_json::Value = resp.body().json().await.unwrap();
    assert_eq!(value["name"], "value");

    let second: Result<serde_json::Value, _> = resp.body().json().await;
    assert_eq!(second.unwrap_err().kind(), FetchErrorKind::TypeError);
}

#[tokio::test]
async fn transparently_decodes_gzip_response() {
    let server = MockServer::start().await;

    let compressed = gzip(b"hello world").await;

    Mock::given(method("GET"))
        .and(path("/gzip"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-encoding", "gzip")
                .set_body_bytes(compressed),
        )
        .mount(&server)
        .await;

    let resp = fetch(format!("{}/gzip", server.uri()), RequestInit::new())
        .await
        .unwrap();

    assert_eq!(resp.body().text().await.unwrap(), "hello world");
}

#[tokio::test]
async fn leaves_gzip_response_raw_when_compress_is_disabled() {
    let server = MockServer::start().await;

    let compressed = gzip(b"hello world").await;

    Mock::given(method("GET"))
        .and(path("/gzip"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-encoding", "gzip")
                .set_body_bytes(compressed.clone()),
        )
        .mount(&server)
        .await;

    let init = RequestInit::new().compress(false);
    let resp = fetch(format!("{}/gzip", server.uri()), init).await.unwrap();

    let bytes = resp.body().array_buffer().await.unwrap();
    assert_eq!(bytes.as_ref(), compressed.as_slice());
}

#[tokio::test]
async fn rejects_response_body_over_the_configured_size_cap() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/chunk"))
        .respond_with(ResponseTemplate::new(200).set_body_string("this is way too long"))
        .mount(&server)
        .await;

    let init = RequestInit::new().size(5);
    let resp = fetch(format!("{}/chunk", server.uri()), init)
        .await
        .unwrap();

    let err = resp.body().text().await.unwrap_err();
    assert_eq!(err.kind(), FetchErrorKind::MaxSize);
}

#[tokio::test]
async fn get_request_with_body_is_rejected_before_dispatch() {
    let server = MockServer::start().await;

    let init = RequestInit::new().body(BodySource::Text("a=1".to_owned()));
    let err = fetch(server.uri(), init).await.unwrap_err();

    assert_eq!(err.kind(), FetchErrorKind::TypeError);
    assert!(server.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn response_body_is_single_use() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/hello"))
        .respond_with(ResponseTemplate::new(200).set_body_string("world"))
        .mount(&server)
        .await;

    let resp = fetch(format!("{}/hello", server.uri()), RequestInit::new())
        .await
        .unwrap();

    assert_eq!(resp.body().text().await.unwrap(), "world");
    assert!(resp.body_used());

    let err = resp.body().text().await.unwrap_err();
    assert_eq!(err.kind(), FetchErrorKind::TypeError);
}
