use super::*;
use axum::{
    extract::{Multipart, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::post,
    Router,
};
use shared::error::RejectionCode;
use tokio::{net::TcpListener, sync::Mutex};

#[derive(Debug, Clone)]
struct CapturedPart {
    name: String,
    file_name: Option<String>,
    content_type: Option<String>,
    bytes: Vec<u8>,
}

#[derive(Clone)]
enum Reply {
    Image {
        content_type: Option<&'static str>,
        bytes: Vec<u8>,
    },
    Status {
        status: StatusCode,
        body: String,
    },
}

#[derive(Clone)]
struct UploadServerState {
    captured: Arc<Mutex<Vec<CapturedPart>>>,
    reply: Reply,
}

async fn handle_upload(
    State(state): State<UploadServerState>,
    mut multipart: Multipart,
) -> Response {
    let mut parts = Vec::new();
    while let Ok(Some(field)) = multipart.next_field().await {
        let name = field.name().unwrap_or_default().to_string();
        let file_name = field.file_name().map(str::to_string);
        let content_type = field.content_type().map(str::to_string);
        let bytes = field.bytes().await.map(|b| b.to_vec()).unwrap_or_default();
        parts.push(CapturedPart {
            name,
            file_name,
            content_type,
            bytes,
        });
    }
    state.captured.lock().await.extend(parts);

    match state.reply {
        Reply::Image {
            content_type: Some(content_type),
            bytes,
        } => ([(header::CONTENT_TYPE, content_type)], bytes).into_response(),
        Reply::Image {
            content_type: None,
            bytes,
        } => {
            let mut response = bytes.into_response();
            response.headers_mut().remove(header::CONTENT_TYPE);
            response
        }
        Reply::Status { status, body } => {
            (status, [(header::CONTENT_TYPE, "application/json")], body).into_response()
        }
    }
}

async fn spawn_upload_server(reply: Reply) -> (Url, Arc<Mutex<Vec<CapturedPart>>>) {
    std::env::set_var("NO_PROXY", "127.0.0.1,localhost");
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("addr");
    let captured = Arc::new(Mutex::new(Vec::new()));
    let state = UploadServerState {
        captured: Arc::clone(&captured),
        reply,
    };
    let app = Router::new()
        .route("/upload", post(handle_upload))
        .with_state(state);
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    let endpoint = Url::parse(&format!("http://{addr}/upload")).expect("endpoint");
    (endpoint, captured)
}

fn png_upload() -> SourceUpload {
    SourceUpload {
        file_name: "page-01.png".to_string(),
        mime_type: "image/png".to_string(),
        bytes: Arc::from(media::encode_test_png(2, 2, 40)),
    }
}

#[tokio::test]
async fn sends_single_file_field_and_returns_image_bytes() {
    let translated = media::encode_test_png(2, 2, 200);
    let (endpoint, captured) = spawn_upload_server(Reply::Image {
        content_type: Some("image/png"),
        bytes: translated.clone(),
    })
    .await;
    let service = HttpTranslationService::new(endpoint);
    let upload = png_upload();

    let payload = service.translate(&upload).await.expect("translate");

    assert_eq!(payload.bytes, translated);
    assert_eq!(payload.mime_type, "image/png");

    let parts = captured.lock().await;
    assert_eq!(parts.len(), 1);
    assert_eq!(parts[0].name, "file");
    assert_eq!(parts[0].file_name.as_deref(), Some("page-01.png"));
    assert_eq!(parts[0].content_type.as_deref(), Some("image/png"));
    assert_eq!(parts[0].bytes, upload.bytes.to_vec());
}

#[tokio::test]
async fn rejection_envelope_is_decoded() {
    let (endpoint, _captured) = spawn_upload_server(Reply::Status {
        status: StatusCode::BAD_REQUEST,
        body: r#"{"error":"File type not allowed"}"#.to_string(),
    })
    .await;
    let service = HttpTranslationService::new(endpoint);

    let err = service.translate(&png_upload()).await.expect_err("must fail");

    match err {
        RequestError::Rejected(rejection) => {
            assert_eq!(rejection.status, 400);
            assert_eq!(rejection.code, RejectionCode::UnsupportedFileType);
            assert_eq!(rejection.message, "File type not allowed");
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn server_error_without_envelope_is_still_a_rejection() {
    let (endpoint, _captured) = spawn_upload_server(Reply::Status {
        status: StatusCode::INTERNAL_SERVER_ERROR,
        body: "<html>Internal Server Error</html>".to_string(),
    })
    .await;
    let service = HttpTranslationService::new(endpoint);

    let err = service.translate(&png_upload()).await.expect_err("must fail");

    assert_eq!(err.status(), Some(500));
    assert!(matches!(
        err,
        RequestError::Rejected(ref rejection) if rejection.code == RejectionCode::Internal
    ));
}

#[tokio::test]
async fn non_image_success_body_is_a_payload_error() {
    let (endpoint, _captured) = spawn_upload_server(Reply::Image {
        content_type: Some("text/html; charset=utf-8"),
        bytes: b"<html>ok</html>".to_vec(),
    })
    .await;
    let service = HttpTranslationService::new(endpoint);

    let err = service.translate(&png_upload()).await.expect_err("must fail");
    assert!(matches!(err, RequestError::Payload(_)), "{err:?}");
}

#[tokio::test]
async fn empty_success_body_is_a_payload_error() {
    let (endpoint, _captured) = spawn_upload_server(Reply::Image {
        content_type: Some("image/png"),
        bytes: Vec::new(),
    })
    .await;
    let service = HttpTranslationService::new(endpoint);

    let err = service.translate(&png_upload()).await.expect_err("must fail");
    assert!(matches!(err, RequestError::Payload(_)), "{err:?}");
}

#[tokio::test]
async fn unreachable_service_is_a_transport_error() {
    std::env::set_var("NO_PROXY", "127.0.0.1,localhost");
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("addr");
    drop(listener);

    let service =
        HttpTranslationService::new(Url::parse(&format!("http://{addr}/upload")).expect("url"));
    let err = service.translate(&png_upload()).await.expect_err("must fail");

    assert!(matches!(err, RequestError::Transport(_)), "{err:?}");
    assert_eq!(err.status(), None);
    assert!(crate::events::describe_request_failure(&err).contains("unreachable"));
}

#[test]
fn missing_content_type_falls_back_to_sniffing() {
    let png = media::encode_test_png(1, 1, 0);
    assert_eq!(accept_image_payload(None, &png).expect("png"), "image/png");
    assert!(accept_image_payload(None, b"plain text").is_err());
}

#[test]
fn declared_image_type_is_normalized() {
    assert_eq!(
        accept_image_payload(Some("Image/JPEG; q=0.9"), b"\xff\xd8\xff").expect("jpeg"),
        "image/jpeg"
    );
}

#[test]
fn endpoint_comes_from_settings() {
    let settings = ClientSettings {
        service_url: "http://translator.local:8080".into(),
        request_timeout_secs: Some(5),
        ..ClientSettings::default()
    };
    let service = HttpTranslationService::from_settings(&settings).expect("service");
    assert_eq!(
        service.endpoint().as_str(),
        "http://translator.local:8080/upload"
    );
}
