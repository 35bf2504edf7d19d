use std::fmt;
use std::time::Duration;

use reqwest::blocking::Client;
use serde::Deserialize;

const CLIENT_ID: &str = "46";
const SCOPE: &str = "mydata";

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Authentication failed: {0}")]
    Authentication(String),
    #[error("Failed to fetch {url}: HTTP {status}")]
    Fetch { url: String, status: u16 },
    #[error("Session is not authenticated; call login first")]
    NotAuthenticated,
    #[error("Session failed to authenticate; start a new session")]
    SessionFailed,
}

/// `Failed` is terminal: a session that failed once is never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Unauthenticated,
    PendingRedirect,
    Authenticated,
    Failed,
}

pub struct Credentials {
    username: String,
    password: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }

    pub fn username(&self) -> &str {
        &self.username
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

#[derive(Debug, Deserialize)]
struct AuthorizationReply {
    status: Option<String>,
    #[serde(rename = "goTo")]
    go_to: Option<String>,
}

pub trait PageFetcher {
    fn base_url(&self) -> &str;

    fn fetch_page(&self, url: &str) -> Result<String, SessionError>;
}

/// Not meant to be shared between threads; use one session per logged-in user.
#[derive(Debug)]
pub struct Session {
    client: Client,
    state: SessionState,
    auth_url: String,
    base_url: String,
}

impl Session {
    pub fn new() -> Result<Self, SessionError> {
        Self::with_base_urls(crate::AUTH_BASE_URL, crate::PORTAL_BASE_URL)
    }

    pub(crate) fn with_base_urls(auth_base: &str, portal_base: &str) -> Result<Self, SessionError> {
        let client = Client::builder()
            .cookie_store(true)
            .timeout(Duration::from_secs(30))
            .user_agent(format!(
                "{}/{}",
                env!("CARGO_PKG_NAME"),
                env!("CARGO_PKG_VERSION")
            ))
            .build()?;

        Ok(Self {
            client,
            state: SessionState::Unauthenticated,
            auth_url: format!("{}/OAuth/Authorization", auth_base.trim_end_matches('/')),
            base_url: portal_base.trim_end_matches('/').to_string(),
        })
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn is_authenticated(&self) -> bool {
        self.state == SessionState::Authenticated
    }

    pub fn login(&mut self, credentials: &Credentials) -> Result<(), SessionError> {
        if self.state == SessionState::Failed {
            return Err(SessionError::SessionFailed);
        }

        self.handshake(credentials)
            .inspect(|_| log::info!("Logged in as {}", credentials.username))
            .inspect_err(|e| {
                log::error!("Login failed: {}", e);
                self.state = SessionState::Failed;
            })
    }

    fn handshake(&mut self, credentials: &Credentials) -> Result<(), SessionError> {
        let seed_url = format!(
            "{}?client_id={}&response_type=code&scope={}",
            self.auth_url, CLIENT_ID, SCOPE
        );
        log::info!("Seeding authorization cookies...");
        self.client.get(&seed_url).send()?;

        let login_url = format!("{}?client_id={}", self.auth_url, CLIENT_ID);
        log::info!("Submitting credentials for {}...", credentials.username);
        let response = self
            .client
            .post(&login_url)
            .form(&[
                ("action", "login"),
                ("login", credentials.username.as_str()),
                ("pass", credentials.password.as_str()),
            ])
            .send()?;

        let reply_url = response.url().clone();
        let go_to = parse_authorization_reply(&response.text()?)?;
        let redirect_url = reply_url.join(&go_to).map_err(|e| {
            SessionError::Authentication(format!("Invalid goTo redirect '{}': {}", go_to, e))
        })?;
        self.state = SessionState::PendingRedirect;

        log::info!("Following authorization redirect...");
        log::debug!("Redirect target: {}", redirect_url);
        let response = self.client.get(redirect_url).send()?;
        if !response.status().is_success() {
            return Err(SessionError::Authentication(format!(
                "Authorization redirect returned HTTP {}",
                response.status().as_u16()
            )));
        }

        self.state = SessionState::Authenticated;
        Ok(())
    }
}

impl PageFetcher for Session {
    fn base_url(&self) -> &str {
        &self.base_url
    }

    fn fetch_page(&self, url: &str) -> Result<String, SessionError> {
        if !self.is_authenticated() {
            return Err(SessionError::NotAuthenticated);
        }

        log::info!("Fetching {}...", url);
        let response = self
            .client
            .get(url)
            .send()
            .inspect_err(|e| log::error!("HTTP error: {e:?}"))?;

        let status = response.status();
        if !status.is_success() {
            log::error!("{} returned HTTP {}", url, status);
            return Err(SessionError::Fetch {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        Ok(response
            .text()
            .inspect_err(|e| log::error!("Decode error: {e:?}"))?)
    }
}

/// The HTTP status of the reply is irrelevant; only `status == "ok"` plus a
/// non-empty `goTo` count as success.
fn parse_authorization_reply(body: &str) -> Result<String, SessionError> {
    let reply: AuthorizationReply = serde_json::from_str(body).map_err(|e| {
        SessionError::Authentication(format!("Unexpected authorization reply: {}", e))
    })?;

    if reply.status.as_deref() != Some("ok") {
        return Err(SessionError::Authentication(format!(
            "Authorization status was {:?}",
            reply.status
        )));
    }

    match reply.go_to {
        Some(go_to) if !go_to.is_empty() => Ok(go_to),
        _ => Err(SessionError::Authentication(
            "Authorization reply carried no goTo redirect".to_string(),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::extract::State;
    use axum::http::{HeaderMap, StatusCode, header};
    use axum::response::{IntoResponse, Response};
    use axum::routing::get;
    use axum::{Form, Json, Router};
    use serde_json::{Value, json};
    use std::sync::mpsc;
    use std::thread;

    const SEED_COOKIE: &str = "oauth_seed=1";
    const SESSION_COOKIE: &str = "DZIENNIKSID=abc123";

    #[derive(Deserialize)]
    struct LoginForm {
        action: String,
        login: String,
        pass: String,
    }

    fn has_cookie(headers: &HeaderMap, cookie: &str) -> bool {
        headers
            .get_all(header::COOKIE)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .any(|v| v.split(';').any(|c| c.trim() == cookie))
    }

    async fn seed() -> impl IntoResponse {
        (
            [(header::SET_COOKIE, format!("{}; Path=/", SEED_COOKIE))],
            "<html></html>",
        )
    }

    async fn authorize(
        State(reply): State<Value>,
        headers: HeaderMap,
        Form(form): Form<LoginForm>,
    ) -> Json<Value> {
        if !has_cookie(&headers, SEED_COOKIE)
            || form.action != "login"
            || form.login != "jan.kowalski"
            || form.pass != "secret"
        {
            return Json(json!({ "status": "error", "errors": ["Nieprawidłowy login"] }));
        }
        Json(reply)
    }

    async fn grant() -> impl IntoResponse {
        (
            [(header::SET_COOKIE, format!("{}; Path=/", SESSION_COOKIE))],
            "granted",
        )
    }

    async fn grant_unavailable() -> StatusCode {
        StatusCode::INTERNAL_SERVER_ERROR
    }

    async fn informacja(headers: HeaderMap) -> Response {
        if has_cookie(&headers, SESSION_COOKIE) {
            (StatusCode::OK, "<html><body>informacja</body></html>").into_response()
        } else {
            StatusCode::UNAUTHORIZED.into_response()
        }
    }

    fn spawn_portal(reply: Value) -> String {
        let router = Router::new()
            .route("/OAuth/Authorization", get(seed).post(authorize))
            .route("/OAuth/Authorization/Grant", get(grant))
            .route("/OAuth/Authorization/Unavailable", get(grant_unavailable))
            .route("/informacja", get(informacja))
            .with_state(reply);

        let (tx, rx) = mpsc::channel();
        thread::spawn(move || {
            let runtime = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
                .expect("Failed to build runtime");
            runtime.block_on(async move {
                let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
                    .await
                    .expect("Failed to bind listener");
                tx.send(listener.local_addr().expect("Listener has no address"))
                    .expect("Failed to report address");
                axum::serve(listener, router).await.expect("Server error");
            });
        });

        format!("http://{}", rx.recv().expect("Server did not start"))
    }

    fn session_for(base: &str) -> Session {
        Session::with_base_urls(base, base).expect("Failed to build session")
    }

    fn credentials() -> Credentials {
        Credentials::new("jan.kowalski", "secret")
    }

    #[test]
    fn test_login_completes_handshake() {
        let base = spawn_portal(json!({
            "status": "ok",
            "goTo": "/OAuth/Authorization/Grant?client_id=46"
        }));
        let mut session = session_for(&base);
        assert_eq!(session.state(), SessionState::Unauthenticated);

        session.login(&credentials()).expect("Login should succeed");
        assert_eq!(session.state(), SessionState::Authenticated);

        let html = session
            .fetch_page(&format!("{}/informacja", session.base_url()))
            .expect("Authenticated fetch should succeed");
        assert!(html.contains("informacja"));
    }

    #[test]
    fn test_login_resolves_relative_go_to() {
        let base = spawn_portal(json!({ "status": "ok", "goTo": "Authorization/Grant" }));
        let mut session = session_for(&base);

        session.login(&credentials()).expect("Login should succeed");
        assert!(session.is_authenticated());
    }

    #[test]
    fn test_login_missing_go_to_fails() {
        let base = spawn_portal(json!({ "status": "ok" }));
        let mut session = session_for(&base);

        let err = session.login(&credentials()).unwrap_err();
        assert!(matches!(err, SessionError::Authentication(_)));
        assert_eq!(session.state(), SessionState::Failed);
    }

    #[test]
    fn test_login_empty_go_to_fails() {
        let base = spawn_portal(json!({ "status": "ok", "goTo": "" }));
        let mut session = session_for(&base);

        let err = session.login(&credentials()).unwrap_err();
        assert!(matches!(err, SessionError::Authentication(_)));
        assert_eq!(session.state(), SessionState::Failed);
    }

    #[test]
    fn test_login_redirect_error_status_fails() {
        let base = spawn_portal(json!({
            "status": "ok",
            "goTo": "/OAuth/Authorization/Unavailable"
        }));
        let mut session = session_for(&base);

        match session.login(&credentials()).unwrap_err() {
            SessionError::Authentication(message) => assert!(message.contains("500")),
            other => panic!("Expected authentication error, got {other:?}"),
        }
        assert_eq!(session.state(), SessionState::Failed);
    }

    #[test]
    fn test_login_malformed_go_to_fails() {
        let base = spawn_portal(json!({ "status": "ok", "goTo": "http://[invalid" }));
        let mut session = session_for(&base);

        match session.login(&credentials()).unwrap_err() {
            SessionError::Authentication(message) => assert!(message.contains("http://[invalid")),
            other => panic!("Expected authentication error, got {other:?}"),
        }
        assert_eq!(session.state(), SessionState::Failed);
    }

    #[test]
    fn test_login_wrong_password_fails() {
        let base = spawn_portal(json!({
            "status": "ok",
            "goTo": "/OAuth/Authorization/Grant?client_id=46"
        }));
        let mut session = session_for(&base);

        let err = session
            .login(&Credentials::new("jan.kowalski", "wrong"))
            .unwrap_err();
        assert!(matches!(err, SessionError::Authentication(_)));
        assert_eq!(session.state(), SessionState::Failed);
    }

    #[test]
    fn test_failed_session_is_terminal() {
        let base = spawn_portal(json!({ "status": "error" }));
        let mut session = session_for(&base);

        assert!(session.login(&credentials()).is_err());
        let err = session.login(&credentials()).unwrap_err();
        assert!(matches!(err, SessionError::SessionFailed));
        assert_eq!(session.state(), SessionState::Failed);
    }

    #[test]
    fn test_fetch_before_login_fails_fast() {
        let session = session_for("http://127.0.0.1:9");

        let err = session
            .fetch_page("http://127.0.0.1:9/informacja")
            .unwrap_err();
        assert!(matches!(err, SessionError::NotAuthenticated));
    }

    #[test]
    fn test_fetch_non_success_status() {
        let base = spawn_portal(json!({
            "status": "ok",
            "goTo": "/OAuth/Authorization/Grant?client_id=46"
        }));
        let mut session = session_for(&base);
        session.login(&credentials()).expect("Login should succeed");

        let url = format!("{}/terminarz", base);
        match session.fetch_page(&url).unwrap_err() {
            SessionError::Fetch { url: failed, status } => {
                assert_eq!(failed, url);
                assert_eq!(status, 404);
            }
            other => panic!("Expected fetch error, got {other:?}"),
        }
    }

    #[test]
    fn test_parse_authorization_reply() {
        assert_eq!(
            parse_authorization_reply(r#"{"status":"ok","goTo":"/grant"}"#).unwrap(),
            "/grant"
        );
        assert!(parse_authorization_reply(r#"{"status":"error","goTo":"/grant"}"#).is_err());
        assert!(parse_authorization_reply(r#"{"goTo":"/grant"}"#).is_err());
        assert!(parse_authorization_reply("<html>maintenance</html>").is_err());
    }

    #[test]
    fn test_credentials_debug_hides_password() {
        let rendered = format!("{:?}", credentials());
        assert!(rendered.contains("jan.kowalski"));
        assert!(!rendered.contains("secret"));
    }
}
