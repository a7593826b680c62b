//! 以本地 axum 服务模拟 Blob 服务端，校验 Put Blob 请求的路径、头部与 Shared Key 签名。

use std::sync::{Arc, Mutex};

use axum::{
    Router,
    body::Bytes,
    extract::State,
    http::{HeaderMap, Method, StatusCode, Uri},
};
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64_STANDARD;
use hmac::{Hmac, Mac};
use sha2::Sha256;

use qr_upload::features::qr::{QrUploadService, encoder::encode_png};
use qr_upload::features::storage::{AzureBlobStore, BlobStore, StorageError};

const ACCOUNT: &str = "devstoreaccount1";
const KEY_B64: &str =
    "Eby8vdM02xNOcqFlqUwJPLlmEtlCDXJ1OUzFT50uSRZ6IFsuFq2UVErCz4I6tq/K1SZFPTOtr/KBHBeksoGMGw==";

#[derive(Debug, Clone)]
struct Captured {
    method: Method,
    path: String,
    query: Option<String>,
    headers: HeaderMap,
    body: Bytes,
}

#[derive(Clone)]
struct MockBlobService {
    captured: Arc<Mutex<Vec<Captured>>>,
    /// 固定返回的状态码与响应体；None 表示按签名校验结果返回 201/403
    forced: Option<(StatusCode, &'static str)>,
}

fn header<'a>(headers: &'a HeaderMap, name: &str) -> &'a str {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("")
}

/// 服务端视角重新计算 Shared Key 签名
fn expected_authorization(method: &Method, path: &str, headers: &HeaderMap) -> String {
    let mut ms: Vec<(String, String)> = headers
        .iter()
        .filter(|(k, _)| k.as_str().starts_with("x-ms-"))
        .map(|(k, v)| {
            (
                k.as_str().to_string(),
                v.to_str().unwrap_or("").trim().to_string(),
            )
        })
        .collect();
    ms.sort();
    let canonical_headers = ms
        .iter()
        .map(|(k, v)| format!("{k}:{v}"))
        .collect::<Vec<_>>()
        .join("\n");

    let content_length = match header(headers, "content-length") {
        "0" => "",
        other => other,
    };
    let string_to_sign = format!(
        "{}\n\n\n{}\n\n{}\n\n\n\n\n\n\n{}\n/{}{}",
        method.as_str(),
        content_length,
        header(headers, "content-type"),
        canonical_headers,
        ACCOUNT,
        path
    );

    let key = BASE64_STANDARD.decode(KEY_B64).expect("key");
    let mut mac = Hmac::<Sha256>::new_from_slice(&key).expect("hmac");
    mac.update(string_to_sign.as_bytes());
    format!(
        "SharedKey {ACCOUNT}:{}",
        BASE64_STANDARD.encode(mac.finalize().into_bytes())
    )
}

async fn handle(
    State(mock): State<MockBlobService>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> (StatusCode, &'static str) {
    let captured = Captured {
        method: method.clone(),
        path: uri.path().to_string(),
        query: uri.query().map(str::to_string),
        headers: headers.clone(),
        body,
    };
    mock.captured.lock().expect("lock").push(captured);

    if let Some(forced) = mock.forced {
        return forced;
    }
    match headers.get("authorization").and_then(|v| v.to_str().ok()) {
        Some(auth) if auth == expected_authorization(&method, uri.path(), &headers) => {
            (StatusCode::CREATED, "")
        }
        Some(_) => (StatusCode::FORBIDDEN, "AuthenticationFailed"),
        // SAS：不校验签名
        None => (StatusCode::CREATED, ""),
    }
}

async fn start_mock(forced: Option<(StatusCode, &'static str)>) -> (String, MockBlobService) {
    let mock = MockBlobService {
        captured: Arc::new(Mutex::new(Vec::new())),
        forced,
    };
    let app = Router::new().fallback(handle).with_state(mock.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind tcp listener");
    let addr = listener.local_addr().expect("local addr");
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });

    (format!("http://{addr}/{ACCOUNT}"), mock)
}

fn shared_key_store(endpoint: &str) -> AzureBlobStore {
    AzureBlobStore::from_connection_string(
        &format!("AccountName={ACCOUNT};AccountKey={KEY_B64};BlobEndpoint={endpoint}"),
        "qr",
    )
    .expect("store")
}

#[tokio::test]
async fn shared_key_upload_is_signed_and_tagged_as_png() {
    let (endpoint, mock) = start_mock(None).await;
    let svc = QrUploadService::new(Arc::new(shared_key_store(&endpoint)), "public", "qr");

    let out = svc
        .generate("https://example.com/page")
        .await
        .expect("upload accepted (signature valid)");
    assert_eq!(
        out.qr_code_url,
        "https://public.blob.core.windows.net/qr/qr_codes/example.com/page.png"
    );

    let captured = mock.captured.lock().expect("lock").clone();
    assert_eq!(captured.len(), 1);
    let req = &captured[0];
    assert_eq!(req.method, Method::PUT);
    assert_eq!(req.path, "/devstoreaccount1/qr/qr_codes/example.com/page.png");
    assert_eq!(req.query, None);
    assert_eq!(header(&req.headers, "x-ms-blob-type"), "BlockBlob");
    assert_eq!(header(&req.headers, "content-type"), "image/png");
    assert_eq!(header(&req.headers, "x-ms-blob-content-type"), "image/png");
    assert!(header(&req.headers, "x-ms-date").ends_with("GMT"));
    assert_eq!(
        req.body,
        encode_png("https://example.com/page").expect("encode")
    );
}

#[tokio::test]
async fn reserved_characters_are_encoded_and_still_signed() {
    let (endpoint, mock) = start_mock(None).await;
    let store = shared_key_store(&endpoint);

    store
        .put_blob(
            "qr_codes/example.com/a b?c=d.png",
            Bytes::from_static(b"png"),
            "image/png",
        )
        .await
        .expect("upload accepted");

    let captured = mock.captured.lock().expect("lock").clone();
    assert_eq!(
        captured[0].path,
        "/devstoreaccount1/qr/qr_codes/example.com/a%20b%3Fc=d.png"
    );
    assert_eq!(captured[0].query, None);
}

#[tokio::test]
async fn sas_token_is_sent_as_query_without_authorization() {
    let (endpoint, mock) = start_mock(None).await;
    let store = AzureBlobStore::from_connection_string(
        &format!("BlobEndpoint={endpoint};SharedAccessSignature=sv=2022-11-02&sp=cw&sig=abc%3D"),
        "qr",
    )
    .expect("store");

    store
        .put_blob("qr_codes/x.png", Bytes::from_static(b"png"), "image/png")
        .await
        .expect("upload accepted");

    let captured = mock.captured.lock().expect("lock").clone();
    assert_eq!(
        captured[0].query.as_deref(),
        Some("sv=2022-11-02&sp=cw&sig=abc%3D")
    );
    assert!(captured[0].headers.get("authorization").is_none());
}

#[tokio::test]
async fn error_status_is_reported_with_body() {
    let (endpoint, _mock) = start_mock(Some((StatusCode::NOT_FOUND, "ContainerNotFound"))).await;
    let store = shared_key_store(&endpoint);

    let err = store
        .put_blob("qr_codes/x.png", Bytes::from_static(b"png"), "image/png")
        .await
        .expect_err("404 must fail");
    match err {
        StorageError::Status { status, body, .. } => {
            assert_eq!(status, 404);
            assert_eq!(body, "ContainerNotFound");
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn unreachable_endpoint_is_request_error() {
    // 绑定后立即释放端口，连接将被拒绝
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind");
    let addr = listener.local_addr().expect("addr");
    drop(listener);

    let store = shared_key_store(&format!("http://{addr}/{ACCOUNT}"));
    let err = store
        .put_blob("qr_codes/x.png", Bytes::from_static(b"png"), "image/png")
        .await
        .expect_err("must fail");
    assert!(matches!(err, StorageError::Request { .. }), "{err:?}");
    assert!(!err.to_string().is_empty());
}

#[tokio::test]
async fn dot_segments_land_where_public_url_resolves() {
    let (endpoint, mock) = start_mock(None).await;
    let svc = QrUploadService::new(Arc::new(shared_key_store(&endpoint)), "public", "qr");

    let out = svc
        .generate("https://h/a/../b")
        .await
        .expect("upload accepted (signature valid)");
    assert_eq!(out.key, "qr_codes/h/a/../b.png");

    let public = reqwest::Url::parse(&out.qr_code_url).expect("public url");
    assert_eq!(public.path(), "/qr/qr_codes/h/b.png");

    let captured = mock.captured.lock().expect("lock").clone();
    assert_eq!(captured.len(), 1);
    assert_eq!(
        captured[0].path,
        format!("/{ACCOUNT}{}", public.path())
    );
}

#[tokio::test]
async fn key_escaping_container_is_rejected_before_sending() {
    let (endpoint, mock) = start_mock(None).await;
    let store = shared_key_store(&endpoint);

    let err = store
        .put_blob(
            "qr_codes/../../other/x.png",
            Bytes::from_static(b"png"),
            "image/png",
        )
        .await
        .expect_err("must fail");
    assert!(matches!(err, StorageError::InvalidPath(_)), "{err:?}");
    assert!(mock.captured.lock().expect("lock").is_empty());
}

#[tokio::test]
async fn unreadable_error_body_is_described() {
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    // 声明的 Content-Length 大于实际发送的字节后断开连接
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind");
    let addr = listener.local_addr().expect("addr");
    tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.expect("accept");
        let mut received = Vec::new();
        let mut buf = [0u8; 4096];
        while !received.windows(7).any(|w| w == b"\r\n\r\npng") {
            let n = socket.read(&mut buf).await.expect("read");
            if n == 0 {
                break;
            }
            received.extend_from_slice(&buf[..n]);
        }
        socket
            .write_all(b"HTTP/1.1 500 Internal Server Error\r\nContent-Length: 100\r\n\r\npartial")
            .await
            .expect("write");
        socket.shutdown().await.expect("shutdown");
    });

    let store = shared_key_store(&format!("http://{addr}/{ACCOUNT}"));
    let err = store
        .put_blob("qr_codes/x.png", Bytes::from_static(b"png"), "image/png")
        .await
        .expect_err("must fail");
    match err {
        StorageError::Status { status, body, .. } => {
            assert_eq!(status, 500);
            assert!(body.starts_with("<unreadable body: "), "{body}");
        }
        other => panic!("unexpected error: {other:?}"),
    }
}
