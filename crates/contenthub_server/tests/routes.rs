use axum::body::Body;
use axum::http::header::{CONTENT_TYPE, COOKIE, LOCATION, SET_COOKIE};
use axum::http::{Request, Response, StatusCode};
use axum::Router;
use contenthub_server::{build_router, AppState, ServerConfig};
use std::path::Path;
use std::sync::Arc;
use tower::ServiceExt;

const BOUNDARY: &str = "contenthub-test-boundary";

fn test_app(root: &Path) -> Router {
    let data_file = root.join("data.txt").display().to_string();
    let assets_dir = root.join("assets").display().to_string();
    let config = ServerConfig::from_lookup(|var: &str| match var {
        "CONTENTHUB_ADMIN_USER" => Some("admin".to_string()),
        "CONTENTHUB_ADMIN_PASS" => Some("secret".to_string()),
        "CONTENTHUB_DATA_FILE" => Some(data_file.clone()),
        "CONTENTHUB_ASSETS_DIR" => Some(assets_dir.clone()),
        _ => None,
    })
    .unwrap();
    build_router(Arc::new(AppState::new(config)))
}

async fn send(app: &Router, request: Request<Body>) -> Response<Body> {
    app.clone().oneshot(request).await.unwrap()
}

async fn body_text(response: Response<Body>) -> String {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

fn get(uri: &str, cookie: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().method("GET").uri(uri);
    if let Some(cookie) = cookie {
        builder = builder.header(COOKIE, cookie);
    }
    builder.body(Body::empty()).unwrap()
}

fn login_request(username: &str, password: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/hub/login")
        .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(Body::from(format!("username={username}&password={password}")))
        .unwrap()
}

/// Logs in and returns the `name=value` cookie pair.
async fn login(app: &Router) -> String {
    let response = send(app, login_request("admin", "secret")).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(response.headers()[LOCATION], "/hub/");
    let set_cookie = response.headers()[SET_COOKIE].to_str().unwrap();
    set_cookie.split(';').next().unwrap().to_string()
}

enum Part<'a> {
    Text(&'a str),
    File(&'a str, &'a [u8]),
}

fn upload_request(cookie: Option<&str>, parts: &[Part<'_>]) -> Request<Body> {
    let mut body = Vec::new();
    for part in parts {
        body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
        match part {
            Part::Text(text) => {
                body.extend_from_slice(
                    b"Content-Disposition: form-data; name=\"text\"\r\n\r\n",
                );
                body.extend_from_slice(text.as_bytes());
            }
            Part::File(name, bytes) => {
                body.extend_from_slice(
                    format!(
                        "Content-Disposition: form-data; name=\"file\"; filename=\"{name}\"\r\n\
                         Content-Type: application/octet-stream\r\n\r\n"
                    )
                    .as_bytes(),
                );
                body.extend_from_slice(bytes);
            }
        }
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());

    let mut builder = Request::builder()
        .method("POST")
        .uri("/hub/upload")
        .header(CONTENT_TYPE, format!("multipart/form-data; boundary={BOUNDARY}"));
    if let Some(cookie) = cookie {
        builder = builder.header(COOKIE, cookie);
    }
    builder.body(Body::from(body)).unwrap()
}

#[tokio::test]
async fn feed_page_redirects_anonymous_callers_to_login() {
    let dir = tempfile::tempdir().unwrap();
    let app = test_app(dir.path());

    let response = send(&app, get("/hub/", None)).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(response.headers()[LOCATION], "/hub/login");

    let response = send(&app, get("/hub/login", None)).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(body_text(response).await.contains("name=\"password\""));
}

#[tokio::test]
async fn api_feed_answers_401_without_session() {
    let dir = tempfile::tempdir().unwrap();
    let app = test_app(dir.path());

    let response = send(&app, get("/hub/api/feed", None)).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = send(&app, get("/hub/api/feed", Some("contenthub_session=forged"))).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn wrong_or_empty_credentials_show_the_form_again() {
    let dir = tempfile::tempdir().unwrap();
    let app = test_app(dir.path());

    for (user, pass) in [("admin", "nope"), ("", "")] {
        let response = send(&app, login_request(user, pass)).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers().get(SET_COOKIE).is_none());
        assert!(body_text(response).await.contains("Invalid credentials"));
    }
}

#[tokio::test]
async fn upload_stores_note_and_supported_files_then_feed_lists_them() {
    let dir = tempfile::tempdir().unwrap();
    let app = test_app(dir.path());
    let cookie = login(&app).await;

    let response = send(
        &app,
        upload_request(
            Some(&cookie),
            &[
                Part::Text("cat.png"),
                Part::File("cat.png", b"PNGDATA"),
                Part::File("evil.exe", b"MZ"),
                Part::File("blank.jpg", b""),
            ],
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(response.headers()[LOCATION], "/hub/");

    assert_eq!(
        std::fs::read_to_string(dir.path().join("data.txt")).unwrap(),
        "cat.png\n"
    );
    assert!(dir.path().join("assets").join("cat.png").is_file());
    assert!(!dir.path().join("assets").join("evil.exe").exists());
    assert!(!dir.path().join("assets").join("blank.jpg").exists());

    let response = send(&app, get("/hub/api/feed", Some(&cookie))).await;
    assert_eq!(response.status(), StatusCode::OK);
    let json: serde_json::Value = serde_json::from_str(&body_text(response).await).unwrap();
    assert_eq!(
        json,
        serde_json::json!([
            { "kind": "text", "content": "cat.png", "link_target": "/hub/assets/cat.png" },
            { "kind": "image", "content": "cat.png", "mime_type": "image/png" }
        ])
    );
}

#[tokio::test]
async fn assets_are_served_only_to_signed_in_callers() {
    let dir = tempfile::tempdir().unwrap();
    let app = test_app(dir.path());
    let cookie = login(&app).await;
    send(
        &app,
        upload_request(Some(&cookie), &[Part::File("cat.png", b"PNGDATA")]),
    )
    .await;

    let response = send(&app, get("/hub/assets/cat.png", Some(&cookie))).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_text(response).await, "PNGDATA");

    let response = send(&app, get("/hub/assets/cat.png", None)).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(response.headers()[LOCATION], "/hub/login");
}

#[tokio::test]
async fn staging_files_in_the_asset_directory_are_not_served() {
    let dir = tempfile::tempdir().unwrap();
    let app = test_app(dir.path());
    let cookie = login(&app).await;
    let assets = dir.path().join("assets");
    std::fs::create_dir(&assets).unwrap();
    std::fs::write(assets.join(".abc.partial"), b"half").unwrap();
    std::fs::write(assets.join("cat.png"), b"PNGDATA").unwrap();

    for uri in ["/hub/assets/.abc.partial", "/hub/assets/%2Eabc.partial"] {
        let response = send(&app, get(uri, Some(&cookie))).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    let response = send(&app, get("/hub/assets/.abc.partial", None)).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);

    let response = send(&app, get("/hub/assets/cat.png", Some(&cookie))).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_text(response).await, "PNGDATA");
}

#[tokio::test]
async fn anonymous_upload_writes_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let app = test_app(dir.path());

    let response = send(
        &app,
        upload_request(None, &[Part::Text("hi"), Part::File("cat.png", b"PNGDATA")]),
    )
    .await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(response.headers()[LOCATION], "/hub/login");
    assert!(!dir.path().join("data.txt").exists());
    assert!(!dir.path().join("assets").exists());
}

#[tokio::test]
async fn non_post_upload_redirects_to_feed() {
    let dir = tempfile::tempdir().unwrap();
    let app = test_app(dir.path());
    let cookie = login(&app).await;

    let response = send(&app, get("/hub/upload", Some(&cookie))).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(response.headers()[LOCATION], "/hub/");
}

#[tokio::test]
async fn feed_page_escapes_note_markup() {
    let dir = tempfile::tempdir().unwrap();
    let app = test_app(dir.path());
    let cookie = login(&app).await;
    send(
        &app,
        upload_request(Some(&cookie), &[Part::Text("<b>bold</b> & more")]),
    )
    .await;

    let response = send(&app, get("/hub/", Some(&cookie))).await;
    assert_eq!(response.status(), StatusCode::OK);
    let html = body_text(response).await;
    assert!(html.contains("&lt;b&gt;bold&lt;/b&gt; &amp; more"));
    assert!(!html.contains("<b>bold</b>"));
}

#[tokio::test]
async fn logout_revokes_the_session() {
    let dir = tempfile::tempdir().unwrap();
    let app = test_app(dir.path());
    let cookie = login(&app).await;

    let response = send(&app, get("/hub/logout", Some(&cookie))).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(response.headers()[LOCATION], "/hub/login");
    assert!(response.headers()[SET_COOKIE]
        .to_str()
        .unwrap()
        .contains("Max-Age=0"));

    let response = send(&app, get("/hub/api/feed", Some(&cookie))).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}
