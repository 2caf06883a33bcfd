use crate::{AppState, Error, Result, render::render_page, session::SESSION_COOKIE};
use axum::{
    Form, Json,
    extract::{State, rejection::JsonRejection},
    response::Html,
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use gemchat_core::{ChatView, handle_submission};
use serde::Deserialize;
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

/// Body of a chat submission, as a form or JSON.
#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    #[serde(default)]
    message: Option<String>,
}

/// Session id from the cookie, or a fresh one added to the jar.
fn session_id(jar: CookieJar) -> (CookieJar, Uuid) {
    if let Some(id) = jar
        .get(SESSION_COOKIE)
        .and_then(|c| Uuid::parse_str(c.value()).ok())
    {
        return (jar, id);
    }

    let id = Uuid::new_v4();
    info!("Issuing new session {id}");
    let cookie = Cookie::build((SESSION_COOKIE, id.to_string()))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax);
    (jar.add(cookie), id)
}

/// Reading never creates a session; the slot appears on the first submission.
async fn current_view(state: &AppState, id: Uuid) -> ChatView {
    let mut messages = Vec::new();
    if let Some(slot) = state.sessions.existing(id).await {
        let mut guard = slot.lock().await;
        guard.touch();
        messages = guard.transcript.entries().to_vec();
    }
    ChatView {
        messages,
        error: None,
    }
}

async fn submit_message(state: &AppState, id: Uuid, message: Option<&str>) -> ChatView {
    let slot = state.sessions.slot(id).await;
    let mut guard = slot.lock().await;
    guard.touch();

    let submission =
        handle_submission(guard.transcript.clone(), message, state.answers.as_ref()).await;
    if submission.modified {
        guard.transcript = submission.transcript.clone();
    }
    guard.touch();

    submission.into_view()
}

async fn reset_session(state: &AppState, id: Uuid) -> ChatView {
    if let Some(slot) = state.sessions.existing(id).await {
        let mut guard = slot.lock().await;
        guard.transcript = gemchat_core::reset(std::mem::take(&mut guard.transcript));
        guard.touch();
    }
    ChatView {
        messages: Vec::new(),
        error: None,
    }
}

pub async fn index(State(state): State<Arc<AppState>>, jar: CookieJar) -> (CookieJar, Html<String>) {
    let (jar, id) = session_id(jar);
    let view = current_view(&state, id).await;
    (jar, Html(render_page(&view)))
}

pub async fn submit(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    Form(form): Form<ChatRequest>,
) -> (CookieJar, Html<String>) {
    let (jar, id) = session_id(jar);
    let view = submit_message(&state, id, form.message.as_deref()).await;
    (jar, Html(render_page(&view)))
}

pub async fn reset(State(state): State<Arc<AppState>>, jar: CookieJar) -> (CookieJar, Html<String>) {
    let (jar, id) = session_id(jar);
    let view = reset_session(&state, id).await;
    (jar, Html(render_page(&view)))
}

pub async fn api_chat(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    payload: std::result::Result<Json<ChatRequest>, JsonRejection>,
) -> Result<(CookieJar, Json<ChatView>)> {
    let Json(request) = payload.map_err(|e| Error::BadRequest(e.body_text()))?;
    let (jar, id) = session_id(jar);
    let view = submit_message(&state, id, request.message.as_deref()).await;
    Ok((jar, Json(view)))
}

pub async fn api_reset(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
) -> (CookieJar, Json<ChatView>) {
    let (jar, id) = session_id(jar);
    let view = reset_session(&state, id).await;
    (jar, Json(view))
}

pub async fn health() -> &'static str {
    "ok"
}

#[cfg(test)]
mod tests {
    use crate::ChatServer;
    use async_trait::async_trait;
    use axum::{
        Router,
        body::{Body, to_bytes},
        http::{Request, StatusCode, header},
        response::Response,
    };
    use gemchat_config::SessionConfig;
    use gemchat_core::{AnswerSource, GenerationError};
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::sync::Notify;
    use tower::ServiceExt;
    use uuid::Uuid;

    /// Answers by message: `fail*` errors, `same*` repeats one answer,
    /// `slow*` waits for `gate`, anything else is echoed.
    struct StubSource {
        calls: AtomicUsize,
        gate: Notify,
    }

    #[async_trait]
    impl AnswerSource for StubSource {
        async fn fetch_answer(&self, message: &str) -> Result<String, GenerationError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if message.starts_with("fail") {
                return Err(GenerationError::Connection);
            }
            if message.starts_with("same") {
                return Ok("same answer".to_string());
            }
            if message.starts_with("slow") {
                self.gate.notified().await;
            }
            Ok(format!("echo: {message}"))
        }
    }

    fn server() -> (ChatServer, Arc<StubSource>) {
        let source = Arc::new(StubSource {
            calls: AtomicUsize::new(0),
            gate: Notify::new(),
        });
        let server = ChatServer::new(source.clone(), SessionConfig::default());
        (server, source)
    }

    fn session_cookie(response: &Response) -> String {
        response
            .headers()
            .get(header::SET_COOKIE)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.split(';').next())
            .unwrap()
            .to_string()
    }

    fn session_uuid(cookie: &str) -> Uuid {
        Uuid::parse_str(cookie.split_once('=').unwrap().1).unwrap()
    }

    fn post_form(uri: &str, cookie: Option<&str>, body: &str) -> Request<Body> {
        let mut builder = Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded");
        if let Some(cookie) = cookie {
            builder = builder.header(header::COOKIE, cookie);
        }
        builder.body(Body::from(body.to_string())).unwrap()
    }

    async fn body_text(response: Response) -> String {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    async fn new_session(router: &Router) -> String {
        let response = router
            .clone()
            .oneshot(Request::get("/").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        session_cookie(&response)
    }

    #[tokio::test]
    async fn first_visit_sets_session_cookie() {
        let (server, _) = server();
        let response = server
            .router()
            .oneshot(Request::get("/").body(Body::empty()).unwrap())
            .await
            .unwrap();

        let cookie = response
            .headers()
            .get(header::SET_COOKIE)
            .unwrap()
            .to_str()
            .unwrap();
        assert!(cookie.starts_with("gemchat_session="));
        assert!(cookie.contains("HttpOnly"));
        assert!(body_text(response).await.contains("<h1>Gemini Chat</h1>"));
    }

    #[tokio::test]
    async fn page_views_do_not_create_sessions() {
        let (server, _) = server();
        let router = server.router();

        for _ in 0..3 {
            new_session(&router).await;
        }
        let cookie = new_session(&router).await;
        router
            .clone()
            .oneshot(post_form("/reset", Some(cookie.as_str()), ""))
            .await
            .unwrap();

        assert!(server.sessions().is_empty().await);

        router
            .clone()
            .oneshot(post_form("/", Some(cookie.as_str()), "message=hello"))
            .await
            .unwrap();
        assert_eq!(server.sessions().len().await, 1);
    }

    #[tokio::test]
    async fn form_submission_appends_question_and_answer() {
        let (server, source) = server();
        let router = server.router();
        let cookie = new_session(&router).await;

        let response = router
            .clone()
            .oneshot(post_form("/", Some(cookie.as_str()), "message=hello"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers().get(header::SET_COOKIE).is_none());
        assert!(body_text(response).await.contains("echo: hello"));
        assert_eq!(source.calls.load(Ordering::SeqCst), 1);

        let transcript = server.sessions().transcript(session_uuid(&cookie)).await.unwrap();
        assert_eq!(transcript.len(), 2);
        assert_eq!(transcript.entries()[0].text(), "hello");
    }

    #[tokio::test]
    async fn empty_message_does_not_call_the_source() {
        let (server, source) = server();
        let router = server.router();
        let cookie = new_session(&router).await;

        router
            .clone()
            .oneshot(post_form("/", Some(cookie.as_str()), "message="))
            .await
            .unwrap();
        router
            .clone()
            .oneshot(post_form("/", Some(cookie.as_str()), ""))
            .await
            .unwrap();

        assert_eq!(source.calls.load(Ordering::SeqCst), 0);
        let transcript = server.sessions().transcript(session_uuid(&cookie)).await.unwrap();
        assert!(transcript.is_empty());
    }

    #[tokio::test]
    async fn generation_error_is_rendered_inline() {
        let (server, _) = server();
        let router = server.router();
        let cookie = new_session(&router).await;
        router
            .clone()
            .oneshot(post_form("/", Some(cookie.as_str()), "message=hi"))
            .await
            .unwrap();

        let response = router
            .clone()
            .oneshot(post_form("/", Some(cookie.as_str()), "message=fail+now"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let html = body_text(response).await;
        assert!(html.contains("An error occurred: connection error"));
        assert!(html.contains("echo: hi"));
        let transcript = server.sessions().transcript(session_uuid(&cookie)).await.unwrap();
        assert_eq!(transcript.len(), 2);
    }

    #[tokio::test]
    async fn double_submission_with_identical_answer_is_absorbed() {
        let (server, _) = server();
        let router = server.router();
        let cookie = new_session(&router).await;

        for _ in 0..2 {
            router
                .clone()
                .oneshot(post_form("/", Some(cookie.as_str()), "message=same+question"))
                .await
                .unwrap();
        }

        let transcript = server.sessions().transcript(session_uuid(&cookie)).await.unwrap();
        assert_eq!(transcript.len(), 2);
    }

    #[tokio::test]
    async fn reset_clears_the_transcript() {
        let (server, _) = server();
        let router = server.router();
        let cookie = new_session(&router).await;
        for message in ["message=one", "message=two"] {
            router
                .clone()
                .oneshot(post_form("/", Some(cookie.as_str()), message))
                .await
                .unwrap();
        }

        let response = router
            .clone()
            .oneshot(post_form("/reset", Some(cookie.as_str()), ""))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert!(!body_text(response).await.contains("echo: one"));
        let transcript = server.sessions().transcript(session_uuid(&cookie)).await.unwrap();
        assert!(transcript.is_empty());
    }

    #[tokio::test]
    async fn sessions_do_not_share_transcripts() {
        let (server, _) = server();
        let router = server.router();
        let alice = new_session(&router).await;
        let bob = new_session(&router).await;
        assert_ne!(alice, bob);

        router
            .clone()
            .oneshot(post_form("/", Some(alice.as_str()), "message=secret"))
            .await
            .unwrap();

        let response = router
            .clone()
            .oneshot(
                Request::get("/")
                    .header(header::COOKIE, &bob)
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert!(!body_text(response).await.contains("secret"));
    }

    #[tokio::test]
    async fn slow_answer_does_not_block_other_sessions() {
        let (server, source) = server();
        let router = server.router();
        let slow = new_session(&router).await;
        let fast = new_session(&router).await;

        let pending = tokio::spawn(
            router
                .clone()
                .oneshot(post_form("/", Some(slow.as_str()), "message=slow")),
        );
        while source.calls.load(Ordering::SeqCst) == 0 {
            tokio::task::yield_now().await;
        }

        let response = router
            .clone()
            .oneshot(post_form("/", Some(fast.as_str()), "message=quick"))
            .await
            .unwrap();
        assert!(body_text(response).await.contains("echo: quick"));
        assert!(!pending.is_finished());

        source.gate.notify_one();
        let response = pending.await.unwrap().unwrap();
        assert!(body_text(response).await.contains("echo: slow"));
    }

    #[tokio::test]
    async fn json_api_returns_messages_and_error() {
        let (server, _) = server();
        let router = server.router();

        let response = router
            .clone()
            .oneshot(
                Request::post("/api/chat")
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(r#"{"message": "hi"}"#))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let cookie = session_cookie(&response);
        let json: serde_json::Value = serde_json::from_str(&body_text(response).await).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "messages": [
                    {"is_user": true, "q": "hi"},
                    {"is_user": false, "a": "echo: hi"}
                ]
            })
        );

        let response = router
            .clone()
            .oneshot(
                Request::post("/api/chat")
                    .header(header::CONTENT_TYPE, "application/json")
                    .header(header::COOKIE, &cookie)
                    .body(Body::from(r#"{"message": "fail"}"#))
                    .unwrap(),
            )
            .await
            .unwrap();
        let json: serde_json::Value = serde_json::from_str(&body_text(response).await).unwrap();
        assert_eq!(json["messages"].as_array().map(Vec::len), Some(2));
        assert_eq!(json["error"], "An error occurred: connection error");

        let response = router
            .clone()
            .oneshot(
                Request::post("/api/reset")
                    .header(header::COOKIE, &cookie)
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        let json: serde_json::Value = serde_json::from_str(&body_text(response).await).unwrap();
        assert_eq!(json, serde_json::json!({"messages": []}));
    }

    #[tokio::test]
    async fn malformed_json_is_a_bad_request() {
        let (server, _) = server();

        let response = server
            .router()
            .oneshot(
                Request::post("/api/chat")
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from("{not json"))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn health_check_answers_ok() {
        let (server, _) = server();
        let response = server
            .router()
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_text(response).await, "ok");
    }
}
