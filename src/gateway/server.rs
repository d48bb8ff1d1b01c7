use axum::{
    Json, Router,
    extract::{Path, Request, State},
    http::{HeaderValue, Method, header},
    middleware::{self, Next},
    response::Response,
    routing::{delete, get, post},
};
use dashmap::DashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::net::TcpListener;
use tokio::sync::Mutex;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{debug, info, warn};

use super::auth;
use super::error::ApiError;
use crate::cache::{
    CachedReply, Clock, ConversationContextCache, ResponseCache, Sweep, SystemClock,
    spawn_sweeper, validate_session_id,
};
use crate::config::WaifuConfig;
use crate::emotion;
use crate::llm::LlmProvider;
use crate::types::{ChatRequest, ChatResponse, ClearResponse, ContextView, StatsResponse, Turn};

pub struct AppState {
    pub token: Option<String>,
    pub config: WaifuConfig,
    pub provider: Arc<dyn LlmProvider>,
    pub contexts: Arc<ConversationContextCache>,
    pub responses: Arc<ResponseCache>,
    /// Per-session locks so a user turn and its reply land as an adjacent pair.
    pub session_locks: DashMap<String, Arc<Mutex<()>>>,
}

impl AppState {
    pub fn new(
        config: WaifuConfig,
        token: Option<String>,
        provider: Arc<dyn LlmProvider>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let contexts = Arc::new(ConversationContextCache::from_config(
            &config.cache,
            Arc::clone(&clock),
        ));
        let responses = Arc::new(ResponseCache::from_config(&config.cache, clock));
        Self {
            token,
            config,
            provider,
            contexts,
            responses,
            session_locks: DashMap::new(),
        }
    }

    fn sweep_targets(&self) -> Vec<Arc<dyn Sweep>> {
        vec![
            Arc::clone(&self.contexts) as Arc<dyn Sweep>,
            Arc::clone(&self.responses) as Arc<dyn Sweep>,
        ]
    }
}

/// A handle on one session's request lock. Dropping it removes the lock from
/// `session_locks` once no other request holds or waits on it, including when
/// the request future is cancelled mid-flight.
struct SessionLease {
    state: Arc<AppState>,
    session_id: String,
    lock: Arc<Mutex<()>>,
}

impl SessionLease {
    fn acquire(state: &Arc<AppState>, session_id: &str) -> Self {
        let lock = Arc::clone(
            state
                .session_locks
                .entry(session_id.to_string())
                .or_insert_with(|| Arc::new(Mutex::new(())))
                .value(),
        );
        Self {
            state: Arc::clone(state),
            session_id: session_id.to_string(),
            lock,
        }
    }
}

impl Drop for SessionLease {
    fn drop(&mut self) {
        // One reference in the map, one held by this lease.
        self.state
            .session_locks
            .remove_if(&self.session_id, |_, lock| Arc::strong_count(lock) <= 2);
    }
}

/// Start the gateway with the provider named in `config`.
pub async fn run(config: WaifuConfig, token: Option<String>) -> anyhow::Result<()> {
    if !config.gateway.is_loopback() && token.is_none() {
        anyhow::bail!(
            "Auth token required when binding to non-loopback address. \
             Set --token or WAIFU_TOKEN env var."
        );
    }

    let provider: Arc<dyn LlmProvider> = Arc::from(crate::llm::from_config(&config.ai)?);
    info!(provider = provider.name(), personality = %config.ai.personality, "llm provider ready");

    let addr = format!("{}:{}", config.gateway.bind, config.gateway.port);
    let listener = TcpListener::bind(&addr).await?;

    info!("waifu-chat gateway listening on {addr}");
    if config.gateway.is_loopback() {
        info!("bound to loopback, local access only");
    } else {
        warn!("bound to {addr}, ensure auth token is set");
    }

    let state = Arc::new(AppState::new(config, token, provider, Arc::new(SystemClock)));
    serve(listener, state, shutdown_signal()).await
}

/// Serve on an already bound listener until `shutdown` resolves. The cache
/// sweeper runs for exactly as long as the server does.
pub async fn serve<F>(
    listener: TcpListener,
    state: Arc<AppState>,
    shutdown: F,
) -> anyhow::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let every = Duration::from_secs(state.config.cache.sweep_interval_secs);
    let sweeper = spawn_sweeper(state.sweep_targets(), every);

    let result = axum::serve(listener, app(state))
        .with_graceful_shutdown(shutdown)
        .await;

    sweeper.abort();
    info!("gateway stopped");
    result?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("failed to listen for ctrl-c: {e}");
        std::future::pending::<()>().await;
    }
}

/// Build the HTTP router.
pub fn app(state: Arc<AppState>) -> Router {
    let api = Router::new()
        .route("/chat/message", post(chat_message))
        .route("/chat/stats", get(stats))
        .route("/chat/sessions/{session_id}", delete(clear_session))
        .route("/chat/sessions/{session_id}/context", get(session_context))
        .route_layer(middleware::from_fn_with_state(
            Arc::clone(&state),
            require_token,
        ));

    Router::new()
        .route("/health", get(health))
        .nest("/api", api)
        .layer(cors_layer(&state.config.gateway.cors_origins))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let layer = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::DELETE])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE]);

    if origins.iter().any(|o| o == "*") {
        return layer.allow_origin(AllowOrigin::any());
    }

    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(e) => {
                warn!(origin = %origin, "ignoring invalid CORS origin: {e}");
                None
            }
        })
        .collect();

    layer.allow_origin(AllowOrigin::list(allowed))
}

async fn require_token(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let header = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok());
    if !auth::verify_bearer(header, &state.token) {
        return Err(ApiError::Unauthorized);
    }
    Ok(next.run(request).await)
}

async fn health() -> &'static str {
    "ok"
}

/// Handle one chat turn:
///
/// 1. Validate the message and resolve the session id (new UUID if absent)
/// 2. Serialize on the session
/// 3. On regenerate, retract the last exchange from the context
/// 4. Reuse a cached reply or call the provider with the context window
/// 5. Append the user turn and the reply to the context
async fn chat_message(
    State(state): State<Arc<AppState>>,
    Json(request): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, ApiError> {
    let started = Instant::now();

    let message = request.message.trim().to_string();
    if message.is_empty() {
        return Err(ApiError::InvalidInput("message is required".into()));
    }

    let session_id = match request.session_id.as_deref() {
        Some(id) => {
            validate_session_id(id)?;
            id.to_string()
        }
        None => uuid::Uuid::new_v4().to_string(),
    };

    let lease = SessionLease::acquire(&state, &session_id);
    let result = {
        let _session_guard = lease.lock.lock().await;
        reply_in_session(&state, &session_id, &message, &request).await
    };
    drop(lease);
    let (reply, cached) = result?;

    let response_time_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
    info!(
        session_id = %session_id,
        cached,
        emotion = %reply.emotion,
        response_time_ms,
        "chat reply sent"
    );

    Ok(Json(ChatResponse {
        session_id,
        response: reply.text,
        emotion: reply.emotion,
        cached,
        tokens: if cached { 0 } else { reply.tokens },
        response_time_ms,
    }))
}

async fn reply_in_session(
    state: &AppState,
    session_id: &str,
    message: &str,
    request: &ChatRequest,
) -> Result<(CachedReply, bool), ApiError> {
    let personality = request.personality.unwrap_or(state.config.ai.personality);

    if request.regenerate {
        let removed = state.contexts.retract_last_exchange(session_id, message);
        debug!(session_id, removed, "retracted last exchange for regenerate");
    }

    let history = state.contexts.get(session_id);

    let use_response_cache = state.config.cache.response_cache_enabled && !request.regenerate;
    let cache_key = ResponseCache::key_for(personality, message);
    let cached = if use_response_cache {
        state.responses.get(&cache_key)
    } else {
        None
    };
    let was_cached = cached.is_some();

    let reply = match cached {
        Some(reply) => reply,
        None => {
            let completion = state
                .provider
                .complete(&personality.system_prompt(), &history, message)
                .await
                .map_err(|e| {
                    warn!(
                        session_id,
                        provider = state.provider.name(),
                        "completion failed: {e}"
                    );
                    ApiError::Provider(e.to_string())
                })?;
            // Both turns must be appendable, or neither is.
            if completion.text.trim().is_empty() {
                warn!(session_id, provider = state.provider.name(), "blank completion");
                return Err(ApiError::Provider("provider returned an empty reply".into()));
            }

            let reply = CachedReply {
                emotion: emotion::detect(&completion.text, personality),
                text: completion.text,
                tokens: completion.tokens,
            };
            if use_response_cache {
                state.responses.insert(cache_key, reply.clone());
            }
            reply
        }
    };

    for turn in [Turn::user(message), Turn::assistant(reply.text.clone())] {
        if let Err(e) = state.contexts.append(session_id, turn) {
            warn!(session_id, "context append failed: {e}");
        }
    }

    Ok((reply, was_cached))
}

async fn session_context(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<String>,
) -> Result<Json<ContextView>, ApiError> {
    validate_session_id(&session_id)?;
    let turns = state.contexts.get(&session_id);
    Ok(Json(ContextView { session_id, turns }))
}

/// Forget a session's context, e.g. when the user deletes the conversation.
async fn clear_session(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<String>,
) -> Result<Json<ClearResponse>, ApiError> {
    validate_session_id(&session_id)?;
    let cleared = state.contexts.clear(&session_id);
    info!(session_id = %session_id, cleared, "session context cleared");
    Ok(Json(ClearResponse {
        success: true,
        cleared,
    }))
}

async fn stats(State(state): State<Arc<AppState>>) -> Json<StatsResponse> {
    Json(StatsResponse {
        provider: state.provider.name().to_string(),
        context: state.contexts.stats(),
        responses: state.responses.stats(),
    })
}
