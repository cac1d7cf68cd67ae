//! The browser transport: axum router, cookie-bound web sessions, and the
//! SSE channel each `WebApplication` streams events through (§4.5, §6).
//! Routes and request bodies follow §6 exactly; route registration and
//! the `ApiError`/`IntoResponse` pattern follow the workspace's usual
//! axum idiom: `routes()` returning `Router<Arc<State>>`, extractor-based
//! handlers returning `Result<_, ApiError>`.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Redirect, Response};
use axum::routing::{get, post};
use axum::{Form, Json, Router};
use axum_extra::extract::cookie::{Cookie, CookieJar};
use dashmap::DashMap;
use uuid::Uuid;

use txwerewolves_domain::UserId;
use txwerewolves_shared::{ActionRequest, ChatRequest, LoginRequest, SettingsRequest};

use crate::application::lobby::{self, LobbyCtx};
use crate::application::web::WebApplication;
use crate::application::ApplicationHandle;
use crate::avatar::WebAvatar;
use crate::migration;

use super::Services;

const COOKIE_NAME: &str = "tw_session";

/// Browser-side state layered on top of the shared [`Services`]: the
/// cookie-key-to-user-id map (the idiomatic axum equivalent of
/// `request.getSession()`) and the live `WebAvatar` per logged-in user, kept
/// here rather than behind the `Avatar` trait object so the SSE handler can
/// reach `connect_event_source` without downcasting.
pub struct HttpState {
    services: Services,
    sessions: DashMap<Uuid, UserId>,
    avatars: DashMap<UserId, Arc<WebAvatar>>,
}

impl HttpState {
    pub fn new(services: Services) -> Arc<Self> {
        Arc::new(Self {
            services,
            sessions: DashMap::new(),
            avatars: DashMap::new(),
        })
    }
}

pub fn routes() -> Router<Arc<HttpState>> {
    Router::new()
        .route("/", get(index))
        .route("/lobby", get(lobby_page))
        .route("/werewolves", get(werewolves_page))
        .route("/login", post(login))
        .route("/logout", get(logout))
        .route("/action", post(action))
        .route("/chat", post(chat))
        .route("/settings", post(settings))
        .route("/subscribe", get(subscribe))
        .route("/werewolves/{trigger}", get(trigger_push))
}

async fn index() -> Redirect {
    Redirect::to("/lobby")
}

async fn lobby_page() -> axum::response::Html<&'static str> {
    axum::response::Html(PAGE_SHELL)
}

async fn werewolves_page() -> axum::response::Html<&'static str> {
    axum::response::Html(PAGE_SHELL)
}

/// `POST /login`, `name=<user_id>` (§6). Registers the user if new, attaches
/// (or migrates) a `WebApplication` bound to a fresh `WebAvatar`, and sets
/// the session cookie. Reconnecting with the same name from a fresh browser
/// session is indistinguishable from a first login at this layer; the
/// reconnecting-to-an-existing-avatar case is the terminal-to-web migration
/// path in [`migration::migrate`], exercised when a user who was last bound
/// to the SSH transport logs in over the web instead.
async fn login(
    State(state): State<Arc<HttpState>>,
    jar: CookieJar,
    Form(body): Form<LoginRequest>,
) -> Result<(CookieJar, Redirect), ApiError> {
    let user_id = UserId::new(body.name);
    if user_id.as_str().is_empty() {
        return Err(ApiError::BadRequest("name must not be empty".to_string()));
    }
    state.services.users.register_user(&user_id);

    let avatar = Arc::new(WebAvatar::new(user_id.clone()));
    state.avatars.insert(user_id.clone(), avatar.clone());

    let new_app = ApplicationHandle::Web(Arc::new(WebApplication::new(
        user_id.clone(),
        state.services.users.clone(),
        state.services.sessions.clone(),
        state.services.bus.clone(),
        state.services.rng.clone(),
        avatar.clone(),
    )));
    let new_avatar: crate::avatar::AvatarHandle = avatar.clone();
    let installed = migration::migrate(&state.services.users, &user_id, new_avatar, new_app).await;
    avatar.bind_app(installed);

    let session_key = Uuid::new_v4();
    state.sessions.insert(session_key, user_id);
    let cookie = Cookie::build((COOKIE_NAME, session_key.to_string()))
        .path("/")
        .http_only(true)
        .build();
    Ok((jar.add(cookie), Redirect::to("/lobby")))
}

/// `GET /logout` (§6): the owner shuts the session down for everyone, a
/// non-owner just leaves it, then the cookie binding is dropped.
async fn logout(State(state): State<Arc<HttpState>>, jar: CookieJar) -> Result<(CookieJar, Redirect), ApiError> {
    if let Some(key) = session_key(&jar) {
        if let Some((_, user_id)) = state.sessions.remove(&key) {
            let app = web_app(&state, &user_id).await;
            if let Some(app) = app {
                let lobby_state = app.lobby_snapshot().await;
                if let Some(session_id) = lobby_state.session() {
                    let ctx = LobbyCtx {
                        users: &state.services.users,
                        sessions: &state.services.sessions,
                        bus: &state.services.bus,
                        rng: state.services.rng.as_ref(),
                    };
                    let owner = match state.services.sessions.get(session_id) {
                        Some(entry) => entry.state.lock().await.owner == user_id,
                        None => false,
                    };
                    let result = if owner {
                        lobby::cancel_session(&ctx, &user_id, session_id).await
                    } else {
                        lobby::leave_session(&ctx, &user_id, session_id).await
                    };
                    if result.is_ok() {
                        app.restore_lobby_state(txwerewolves_domain::lobby::LobbyState::Unjoined)
                            .await;
                    }
                }
            }
            state.avatars.remove(&user_id);
        }
    }
    Ok((jar.remove(Cookie::from(COOKIE_NAME)), Redirect::to("/lobby")))
}

async fn action(
    State(state): State<Arc<HttpState>>,
    jar: CookieJar,
    Form(body): Form<ActionRequest>,
) -> Result<StatusCode, ApiError> {
    let app = current_app(&state, &jar).await?;
    app.handle_action(body.command).await;
    Ok(StatusCode::NO_CONTENT)
}

async fn chat(
    State(state): State<Arc<HttpState>>,
    jar: CookieJar,
    Form(body): Form<ChatRequest>,
) -> Result<StatusCode, ApiError> {
    let app = current_app(&state, &jar).await?;
    app.handle_chat(body.message).await;
    Ok(StatusCode::NO_CONTENT)
}

async fn settings(
    State(state): State<Arc<HttpState>>,
    jar: CookieJar,
    Json(body): Json<SettingsRequest>,
) -> Result<StatusCode, ApiError> {
    let app = current_app(&state, &jar).await?;
    app.handle_settings(body.werewolf_count, body.roles).await;
    Ok(StatusCode::NO_CONTENT)
}

/// `GET /subscribe` (§4.5, §6): one long-lived `text/event-stream` per
/// avatar. Frames are pre-formatted by [`crate::avatar::web::sse_frame`], so
/// this streams raw bytes rather than wrapping them in axum's own `Sse`
/// event type, which would double-frame them.
async fn subscribe(State(state): State<Arc<HttpState>>, jar: CookieJar) -> Result<Response, ApiError> {
    let user_id = current_user(&state, &jar)?;
    let avatar = state
        .avatars
        .get(&user_id)
        .map(|a| a.clone())
        .ok_or(ApiError::Unauthorized)?;

    let (tx, rx) = tokio::sync::mpsc::channel::<String>(32);
    avatar.connect_event_source(tx);

    let stream = futures_util::stream::unfold(rx, |mut rx| async move {
        rx.recv()
            .await
            .map(|frame| (Ok::<_, std::io::Error>(axum::body::Bytes::from(frame)), rx))
    });

    Ok(Response::builder()
        .header(header::CONTENT_TYPE, "text/event-stream")
        .header(header::CACHE_CONTROL, "no-cache")
        .body(axum::body::Body::from_stream(stream))
        .expect("static SSE response head is well-formed"))
}

/// `GET /werewolves/{actions|phase-info|player-info|game-info|output|
/// request-all}` (§6): re-pushes the requested slice of state over the
/// avatar's SSE channel. `render()` always recomputes every panel together,
/// so every trigger kind re-emits the full current render rather than a
/// narrower single-event push; logged at `debug!` so the simplification is
/// visible in production traces.
async fn trigger_push(
    State(state): State<Arc<HttpState>>,
    jar: CookieJar,
    Path(trigger): Path<String>,
) -> Result<StatusCode, ApiError> {
    let app = current_app(&state, &jar).await?;
    match trigger.as_str() {
        "actions" | "phase-info" | "player-info" | "game-info" | "output" | "request-all" => {
            tracing::debug!(%trigger, "re-rendering full state for a targeted push request");
            app.render().await;
            Ok(StatusCode::NO_CONTENT)
        }
        other => Err(ApiError::BadRequest(format!("unknown trigger: {other}"))),
    }
}

fn session_key(jar: &CookieJar) -> Option<Uuid> {
    jar.get(COOKIE_NAME)?.value().parse().ok()
}

fn current_user(state: &HttpState, jar: &CookieJar) -> Result<UserId, ApiError> {
    let key = session_key(jar).ok_or(ApiError::Unauthorized)?;
    state
        .sessions
        .get(&key)
        .map(|e| e.clone())
        .ok_or(ApiError::Unauthorized)
}

async fn web_app(state: &HttpState, user_id: &UserId) -> Option<Arc<WebApplication>> {
    let app = state.services.users.with_entry(user_id, |e| e.app.clone()).flatten()?;
    match app {
        ApplicationHandle::Web(app) => Some(app),
        ApplicationHandle::Terminal(_) => None,
    }
}

async fn current_app(state: &HttpState, jar: &CookieJar) -> Result<Arc<WebApplication>, ApiError> {
    let user_id = current_user(state, jar)?;
    web_app(state, &user_id).await.ok_or(ApiError::Unauthorized)
}

/// Minimal static shell for `/lobby` and `/werewolves` (§6): a login form,
/// an `EventSource` against `/subscribe`, and a handful of buttons that post
/// back whichever action id the last `actions` event named. Anything
/// richer than this belongs to a client the workspace does not carry (§1).
const PAGE_SHELL: &str = r#"<!doctype html>
<html lang="en">
<head><meta charset="utf-8"><title>txwerewolves</title></head>
<body>
<form id="login" action="/login" method="post">
  <input name="name" placeholder="your name" required>
  <button type="submit">Join</button>
</form>
<pre id="status"></pre>
<div id="actions"></div>
<pre id="output"></pre>
<script>
const out = document.getElementById('output');
const status = document.getElementById('status');
const actions = document.getElementById('actions');
const source = new EventSource('/subscribe');
source.onmessage = (ev) => {
  const payload = JSON.parse(ev.data);
  if (payload.status !== undefined) status.textContent = payload.status;
  if (payload.output !== undefined) out.textContent += payload.output + "\n";
  if (payload.actions !== undefined) {
    actions.innerHTML = '';
    for (const [label, id] of payload.actions) {
      const button = document.createElement('button');
      button.textContent = label;
      button.onclick = () => fetch('/action', {
        method: 'POST',
        headers: {'content-type': 'application/json'},
        body: JSON.stringify({command: id}),
      });
      actions.appendChild(button);
    }
  }
};
</script>
</body>
</html>"#;

/// `BadRequest` / `Internal` cover the usual client- and server-side
/// failure shapes; `Unauthorized` covers the missing-or-stale session
/// cookie case specific to this transport.
#[derive(Debug)]
enum ApiError {
    Unauthorized,
    BadRequest(String),
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::Unauthorized => {
                (StatusCode::UNAUTHORIZED, "not logged in").into_response()
            }
            ApiError::BadRequest(msg) => {
                tracing::warn!(error = %msg, "bad request");
                (StatusCode::BAD_REQUEST, msg).into_response()
            }
            ApiError::Internal(msg) => {
                tracing::error!(error = %msg, "internal API error");
                (StatusCode::INTERNAL_SERVER_ERROR, "internal error").into_response()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use tower::ServiceExt;
    use txwerewolves_domain::random::FixedRandom;

    fn test_state() -> Arc<HttpState> {
        let users = Arc::new(crate::registry::UserRegistry::new());
        let sessions = Arc::new(crate::registry::SessionRegistry::new());
        let bus = Arc::new(crate::signal::SignalBus::new(users.clone(), sessions.clone()));
        let rng: Arc<dyn txwerewolves_domain::RandomPort> = Arc::new(FixedRandom(0));
        HttpState::new(Services {
            users,
            sessions,
            bus,
            rng,
        })
    }

    #[tokio::test]
    async fn index_redirects_to_lobby() {
        let router = routes().with_state(test_state());
        let response = router
            .oneshot(Request::get("/").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
    }

    #[tokio::test]
    async fn action_without_a_session_cookie_is_unauthorized() {
        let router = routes().with_state(test_state());
        let response = router
            .oneshot(
                Request::post("/action")
                    .header("content-type", "application/x-www-form-urlencoded")
                    .body(Body::from("command=1"))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn login_sets_a_session_cookie_and_redirects() {
        let router = routes().with_state(test_state());
        let response = router
            .oneshot(
                Request::post("/login")
                    .header("content-type", "application/x-www-form-urlencoded")
                    .body(Body::from("name=alice"))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert!(response.headers().get(header::SET_COOKIE).is_some());
    }

    #[tokio::test]
    async fn unknown_trigger_is_a_bad_request() {
        let state = test_state();
        let router = routes().with_state(state.clone());

        let login = router
            .clone()
            .oneshot(
                Request::post("/login")
                    .header("content-type", "application/x-www-form-urlencoded")
                    .body(Body::from("name=alice"))
                    .unwrap(),
            )
            .await
            .unwrap();
        let cookie = login
            .headers()
            .get(header::SET_COOKIE)
            .unwrap()
            .to_str()
            .unwrap()
            .split(';')
            .next()
            .unwrap()
            .to_string();

        let response = router
            .oneshot(
                Request::get("/werewolves/not-a-real-trigger")
                    .header(header::COOKIE, cookie)
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
