//! `PanelClient` and `Poller` against an in-process fake panel.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use axum::Router;
use axum::extract::{Form, Query, State};
use axum::http::header::{COOKIE, REFERER, SET_COOKIE};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{Html, IntoResponse, Redirect, Response};
use axum::routing::{get, post};
use serde_json::json;
use url::Url;

use sms_otp_relay::{
    ActionLink, AuthError, Credentials, FetchError, Ledger, Notifier, NotifyError, PanelClient,
    PanelConfig, PollSettings, Poller,
};

const LOGIN_PAGE: &str = r#"<form action="signin" method="post">
<input name="username"><input name="password" type="password">
<label>What is 7 + 5 = ?</label><input name="capt">
</form>"#;

#[derive(Default)]
struct FakePanel {
    login_page: String,
    redirect_when_expired: bool,
    forbid_next_fetches: AtomicUsize,
    sign_in_posts: AtomicUsize,
    data_gets: AtomicUsize,
    last_form: Mutex<HashMap<String, String>>,
    last_referer: Mutex<Option<String>>,
    last_query: Mutex<HashMap<String, String>>,
}

impl FakePanel {
    fn new() -> Self {
        Self {
            login_page: LOGIN_PAGE.to_string(),
            ..Default::default()
        }
    }
}

async fn login_page(State(panel): State<Arc<FakePanel>>) -> Html<String> {
    Html(panel.login_page.clone())
}

async fn sign_in(
    State(panel): State<Arc<FakePanel>>,
    headers: HeaderMap,
    Form(form): Form<HashMap<String, String>>,
) -> Response {
    panel.sign_in_posts.fetch_add(1, Ordering::SeqCst);
    *panel.last_referer.lock().unwrap() = headers
        .get(REFERER)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);

    let accepted = form.get("username").map(String::as_str) == Some("agent")
        && form.get("password").map(String::as_str) == Some("secret")
        && form.get("capt").map(String::as_str) == Some("12");
    *panel.last_form.lock().unwrap() = form;

    if accepted {
        (
            [(SET_COOKIE, "PHPSESSID=live; Path=/")],
            Html("<h1>Dashboard</h1><a href=\"/ints/logout\">Logout</a>"),
        )
            .into_response()
    } else {
        Html("<p>Wrong captcha or credentials</p>").into_response()
    }
}

async fn data(
    State(panel): State<Arc<FakePanel>>,
    headers: HeaderMap,
    Query(query): Query<HashMap<String, String>>,
) -> Response {
    panel.data_gets.fetch_add(1, Ordering::SeqCst);
    *panel.last_query.lock().unwrap() = query;

    let has_session = headers
        .get(COOKIE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.contains("PHPSESSID=live"));
    let forbidden = panel
        .forbid_next_fetches
        .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
        .is_ok();

    if !has_session || forbidden {
        if panel.redirect_when_expired {
            return Redirect::to("/ints/login").into_response();
        }
        return (StatusCode::FORBIDDEN, "Forbidden").into_response();
    }

    if headers.get("x-requested-with").and_then(|v| v.to_str().ok()) != Some("XMLHttpRequest") {
        return (StatusCode::BAD_REQUEST, "not an ajax request").into_response();
    }

    axum::Json(json!({
        "sEcho": 1,
        "rows": [
            ["2025-05-01 10:00:00", "", "8801712345678", "WhatsApp", "Your WhatsApp code is 123-456"],
            ["2025-05-01 10:01:00", "", "15550001111", "Google", "G-482910 is your verification code"],
            ["2025-05-01 10:02:00", "", "447700900123", "Bank", "Your statement is ready"]
        ]
    }))
    .into_response()
}

async fn spawn(panel: Arc<FakePanel>) -> Url {
    let app = Router::new()
        .route("/ints/login", get(login_page))
        .route("/ints/signin", post(sign_in))
        .route("/ints/client/res/data_smscdr.php", get(data))
        .with_state(panel);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}").parse().unwrap()
}

fn client(base_url: Url, password: &str) -> PanelClient {
    let config =
        PanelConfig::new(Credentials::new("agent", password)).with_base_url(base_url);
    PanelClient::new(config).unwrap()
}

#[derive(Default)]
struct RecordingNotifier {
    sent: Mutex<Vec<String>>,
}

impl Notifier for RecordingNotifier {
    async fn send(
        &self,
        _recipient: &str,
        text: &str,
        _links: &[ActionLink],
    ) -> Result<(), NotifyError> {
        self.sent.lock().unwrap().push(text.to_string());
        Ok(())
    }
}

#[tokio::test]
async fn login_solves_challenge_and_keeps_cookie() {
    let panel = Arc::new(FakePanel::new());
    let base_url = spawn(panel.clone()).await;
    let mut client = client(base_url.clone(), "secret");

    client.login().await.unwrap();

    assert!(client.session().is_authenticated());
    assert_eq!(panel.sign_in_posts.load(Ordering::SeqCst), 1);
    let form = panel.last_form.lock().unwrap().clone();
    assert_eq!(form.get("capt").map(String::as_str), Some("12"));
    assert_eq!(form.get("username").map(String::as_str), Some("agent"));
    assert_eq!(
        panel.last_referer.lock().unwrap().as_deref(),
        Some(base_url.join("/ints/login").unwrap().as_str())
    );

    let records = client.fetch_records().await.unwrap();
    assert_eq!(records.len(), 3);
    assert_eq!(records[0].source_number, "8801712345678");
    assert_eq!(records[1].service, "Google");
}

#[tokio::test]
async fn missing_challenge_fails_without_posting() {
    let panel = Arc::new(FakePanel {
        login_page: "<p>Maintenance</p>".to_string(),
        ..Default::default()
    });
    let base_url = spawn(panel.clone()).await;
    let mut client = client(base_url, "secret");

    let err = client.login().await.unwrap_err();

    assert!(matches!(err, AuthError::ChallengeNotFound));
    assert_eq!(panel.sign_in_posts.load(Ordering::SeqCst), 0);
    assert!(!client.session().is_authenticated());
}

#[tokio::test]
async fn rejected_credentials_fail_login() {
    let panel = Arc::new(FakePanel::new());
    let base_url = spawn(panel.clone()).await;
    let mut client = client(base_url, "wrong");

    assert!(matches!(client.login().await, Err(AuthError::AuthFailed)));
    assert_eq!(panel.sign_in_posts.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn fetch_without_session_is_expired() {
    let panel = Arc::new(FakePanel::new());
    let base_url = spawn(panel).await;
    let mut client = client(base_url, "secret");

    assert!(matches!(
        client.fetch_records().await,
        Err(FetchError::SessionExpired)
    ));
}

#[tokio::test]
async fn redirect_to_login_is_expired() {
    let panel = Arc::new(FakePanel {
        redirect_when_expired: true,
        ..FakePanel::new()
    });
    let base_url = spawn(panel).await;
    let mut client = client(base_url, "secret");

    assert!(matches!(
        client.fetch_records().await,
        Err(FetchError::SessionExpired)
    ));
}

#[tokio::test]
async fn fetch_query_selects_window_and_first_page() {
    let panel = Arc::new(FakePanel::new());
    let base_url = spawn(panel.clone()).await;
    let mut client = client(base_url, "secret");

    client.login().await.unwrap();
    client.fetch_records().await.unwrap();

    let query = panel.last_query.lock().unwrap().clone();
    assert_eq!(query.get("fdate1").map(String::as_str), Some("2025-04-25 00:00:00"));
    assert_eq!(query.get("iDisplayStart").map(String::as_str), Some("0"));
    assert_eq!(query.get("iDisplayLength").map(String::as_str), Some("25"));
}

#[tokio::test]
async fn unreachable_panel_is_transport_error() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    let mut client = client(format!("http://{addr}").parse().unwrap(), "secret");

    assert!(matches!(
        client.fetch_records().await,
        Err(FetchError::Transport(_))
    ));
    assert!(matches!(client.login().await, Err(AuthError::Http(_))));
}

#[tokio::test]
async fn poller_recovers_from_expired_session_once() {
    let panel = Arc::new(FakePanel::new());
    let base_url = spawn(panel.clone()).await;
    let dir = tempfile::tempdir().unwrap();
    let ledger = Ledger::new(dir.path().join("already_sent.json"));

    let mut poller = Poller::new(
        client(base_url, "secret"),
        RecordingNotifier::default(),
        ledger,
        PollSettings::new("-100123"),
    );
    poller.start().await.unwrap();
    panel.forbid_next_fetches.store(1, Ordering::SeqCst);

    let report = poller.run_cycle().await;

    assert!(report.reauthenticated);
    assert_eq!(report.fetched, 3);
    assert_eq!(report.delivered, 2);
    assert_eq!(report.without_otp, 1);
    assert_eq!(panel.sign_in_posts.load(Ordering::SeqCst), 2);
    assert_eq!(panel.data_gets.load(Ordering::SeqCst), 2);

    let report = poller.run_cycle().await;
    assert!(!report.reauthenticated);
    assert_eq!(report.delivered, 0);
    assert_eq!(report.duplicates, 2);
    assert_eq!(poller.notifier().sent.lock().unwrap().len(), 2);
}
