use std::path::PathBuf;
use std::time::Duration;

use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use bili_core::{BiliClient, CredentialStore, LoginChallenge, LoginFlow, WatchError};

fn generate_body(key: &str) -> serde_json::Value {
    serde_json::json!({
        "code": 0,
        "message": "0",
        "data": {
            "url": format!("https://passport.bilibili.com/h5-app/passport/login/scan?qrcode_key={key}"),
            "qrcode_key": key
        }
    })
}

fn poll_body(code: i64) -> serde_json::Value {
    serde_json::json!({
        "code": 0,
        "message": "0",
        "data": {
            "url": "",
            "refresh_token": "",
            "timestamp": 0,
            "code": code,
            "message": ""
        }
    })
}

async fn temp_store(tag: &str) -> (PathBuf, CredentialStore) {
    let mut dir = std::env::temp_dir();
    dir.push(format!(
        "biliwatch_login_{}_{}",
        tag,
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap()
            .as_nanos()
    ));
    tokio::fs::create_dir_all(&dir).await.unwrap();
    let path = dir.join("cache.json");
    (path.clone(), CredentialStore::new(path))
}

fn challenge(key: &str) -> LoginChallenge {
    LoginChallenge {
        qrcode_key: key.to_string(),
        url: String::new(),
        png: Vec::new(),
    }
}

#[tokio::test]
async fn begin_returns_a_renderable_challenge() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/x/passport-login/web/qrcode/generate"))
        .respond_with(ResponseTemplate::new(200).set_body_json(generate_body("abc123")))
        .mount(&server)
        .await;

    let client = BiliClient::with_base_urls(server.uri(), server.uri()).expect("build client");
    let (_, store) = temp_store("begin").await;
    let flow = LoginFlow::new(client, store);

    let challenge = flow.begin().await.expect("challenge issued");
    assert_eq!(challenge.qrcode_key, "abc123");
    assert!(challenge.png.starts_with(b"\x89PNG\r\n\x1a\n"));
}

#[tokio::test]
async fn begin_surfaces_transport_failure_as_challenge_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/x/passport-login/web/qrcode/generate"))
        .respond_with(ResponseTemplate::new(502))
        .mount(&server)
        .await;

    let client = BiliClient::with_base_urls(server.uri(), server.uri()).expect("build client");
    let (_, store) = temp_store("begin_err").await;
    let flow = LoginFlow::new(client, store);

    assert!(matches!(
        flow.begin().await,
        Err(WatchError::Challenge(_))
    ));
}

#[tokio::test]
async fn confirm_success_persists_the_live_credential() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/x/passport-login/web/qrcode/poll"))
        .and(query_param("qrcode_key", "abc123"))
        .respond_with(
            ResponseTemplate::new(200)
                .append_header("set-cookie", "SESSDATA=deadbeef; Path=/; HttpOnly")
                .append_header("set-cookie", "bili_jct=csrf42; Path=/")
                .set_body_json(poll_body(0)),
        )
        .mount(&server)
        .await;

    let client = BiliClient::with_base_urls(server.uri(), server.uri()).expect("build client");
    let (file, store) = temp_store("confirm_ok").await;
    let flow = LoginFlow::new(client.clone(), store.clone())
        .with_wait(Duration::from_secs(2), Duration::from_millis(10));

    flow.confirm(&challenge("abc123")).await.expect("login confirmed");

    let live = client.credential().await;
    assert!(live.cookie.contains("SESSDATA=deadbeef"));
    assert!(live.cookie.contains("bili_jct=csrf42"));
    assert_eq!(store.load().await, live);
    assert!(tokio::fs::metadata(&file).await.is_ok());
}

#[tokio::test]
async fn confirm_expiry_leaves_credential_untouched() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/x/passport-login/web/qrcode/poll"))
        .respond_with(ResponseTemplate::new(200).set_body_json(poll_body(86038)))
        .mount(&server)
        .await;

    let client = BiliClient::with_base_urls(server.uri(), server.uri()).expect("build client");
    let (file, store) = temp_store("confirm_expired").await;
    let flow = LoginFlow::new(client.clone(), store)
        .with_wait(Duration::from_secs(2), Duration::from_millis(10));

    assert!(matches!(
        flow.confirm(&challenge("abc123")).await,
        Err(WatchError::LoginExpired)
    ));
    assert!(client.credential().await.is_empty());
    assert!(tokio::fs::metadata(&file).await.is_err(), "nothing persisted");
}

#[tokio::test]
async fn confirm_times_out_when_never_scanned() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/x/passport-login/web/qrcode/poll"))
        .respond_with(ResponseTemplate::new(200).set_body_json(poll_body(86101)))
        .mount(&server)
        .await;

    let client = BiliClient::with_base_urls(server.uri(), server.uri()).expect("build client");
    let (_, store) = temp_store("confirm_timeout").await;
    let flow = LoginFlow::new(client.clone(), store)
        .with_wait(Duration::from_millis(150), Duration::from_millis(20));

    assert!(matches!(
        flow.confirm(&challenge("abc123")).await,
        Err(WatchError::LoginTimeout)
    ));
    assert!(client.credential().await.is_empty());
}

#[tokio::test]
async fn logout_clears_live_and_persisted_credential() {
    let server = MockServer::start().await;
    let client = BiliClient::with_base_urls(server.uri(), server.uri()).expect("build client");
    let (_, store) = temp_store("logout").await;

    client
        .set_credential(bili_core::SessionCredential::new("SESSDATA=abc"))
        .await;
    store
        .save(&bili_core::SessionCredential::new("SESSDATA=abc"))
        .await
        .unwrap();

    let flow = LoginFlow::new(client.clone(), store.clone());
    flow.logout().await;

    assert!(client.credential().await.is_empty());
    assert!(store.load().await.is_empty());
}
