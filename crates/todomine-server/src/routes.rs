//! Route handlers. Every route lives under `/api`.

use axum::extract::{Path, State};
use axum::http::{header, Method};
use axum::response::Json;
use axum::routing::{get, post};
use axum::Router;
use chrono::Utc;
use serde::Serialize;
use serde_json::{json, Value};
use tower_http::cors::{Any, CorsLayer};
use todomine_core::game::{AchievementStatus, AutoMineOutcome, PurchaseReceipt, Upgrade};
use todomine_core::mine::{now_ms, MinerPhase};
use todomine_core::{Event, GameStats, NewTodo, SceneSnapshot, StatsPatch, Todo, TodoPatch};

use crate::error::{ApiJson, ApiResult};
use crate::state::AppState;

pub fn router(state: AppState) -> Router {
    let api = Router::new()
        .route("/", get(handle_root))
        .route("/health", get(handle_health))
        .route("/todos", get(list_todos).post(create_todo))
        .route(
            "/todos/{id}",
            get(get_todo).put(update_todo).delete(delete_todo),
        )
        .route("/game/stats", get(get_stats).post(update_stats))
        .route("/game/upgrades", get(list_upgrades))
        .route("/game/upgrade/{upgrade_id}", post(purchase_upgrade))
        .route("/game/auto-mine", post(auto_mine))
        .route("/game/achievements", get(list_achievements))
        .route("/mine", get(mine_snapshot))
        .route("/mine/phases", get(mine_phases))
        .route("/events", get(drain_events));

    Router::new()
        .nest("/api", api)
        .layer(browser_cors())
        .with_state(state)
}

/// The web client is served from its own origin, so every origin may call
/// the API.
fn browser_cors() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([header::CONTENT_TYPE])
}

// ── Service ──────────────────────────────────────────────────────────

async fn handle_root() -> Json<Value> {
    Json(json!({
        "message": "Todo Mining Game API",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

async fn handle_health() -> Json<Value> {
    Json(json!({ "status": "healthy", "timestamp": Utc::now() }))
}

// ── Todos ────────────────────────────────────────────────────────────

async fn list_todos(State(state): State<AppState>) -> ApiResult<Json<Vec<Todo>>> {
    state.with_game(|game| game.list_todos()).map(Json)
}

async fn create_todo(
    State(state): State<AppState>,
    ApiJson(new): ApiJson<NewTodo>,
) -> ApiResult<Json<Todo>> {
    state.with_game(|game| game.create_todo(new)).map(Json)
}

async fn get_todo(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Todo>> {
    state.with_game(|game| game.get_todo(&id)).map(Json)
}

async fn update_todo(
    State(state): State<AppState>,
    Path(id): Path<String>,
    ApiJson(patch): ApiJson<TodoPatch>,
) -> ApiResult<Json<Todo>> {
    state.with_game(|game| game.update_todo(&id, &patch)).map(Json)
}

async fn delete_todo(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<Value>> {
    state.with_game(|game| game.delete_todo(&id))?;
    Ok(Json(json!({ "message": "Todo deleted successfully" })))
}

// ── Game ─────────────────────────────────────────────────────────────

async fn get_stats(State(state): State<AppState>) -> ApiResult<Json<GameStats>> {
    state.with_game(|game| game.stats()).map(Json)
}

async fn update_stats(
    State(state): State<AppState>,
    ApiJson(patch): ApiJson<StatsPatch>,
) -> ApiResult<Json<GameStats>> {
    state.with_game(|game| game.update_stats(&patch)).map(Json)
}

async fn list_upgrades(State(state): State<AppState>) -> ApiResult<Json<Vec<Upgrade>>> {
    state.with_game(|game| game.upgrades()).map(Json)
}

async fn purchase_upgrade(
    State(state): State<AppState>,
    Path(upgrade_id): Path<String>,
) -> ApiResult<Json<PurchaseReceipt>> {
    state
        .with_game(|game| game.purchase_upgrade(&upgrade_id))
        .map(Json)
}

async fn auto_mine(State(state): State<AppState>) -> ApiResult<Json<AutoMineOutcome>> {
    state.with_game(|game| game.auto_mine()).map(Json)
}

async fn list_achievements(
    State(state): State<AppState>,
) -> ApiResult<Json<Vec<AchievementStatus>>> {
    state.with_game(|game| game.achievements()).map(Json)
}

// ── Mine ─────────────────────────────────────────────────────────────

async fn mine_snapshot(State(state): State<AppState>) -> ApiResult<Json<SceneSnapshot>> {
    let scene = state.scene()?;
    Ok(Json(scene.snapshot(now_ms())))
}

#[derive(Serialize)]
struct PhaseEntry {
    phase: MinerPhase,
    duration_ms: u64,
}

async fn mine_phases(State(state): State<AppState>) -> ApiResult<Json<Value>> {
    let timings = *state.scene()?.timings();
    let phases: Vec<_> = timings
        .table()
        .into_iter()
        .map(|(phase, duration_ms)| PhaseEntry { phase, duration_ms })
        .collect();
    Ok(Json(json!({
        "phases": phases,
        "cart_travel_ms": timings.cart_travel_ms,
        "miner_lifetime_ms": timings.miner_lifetime_ms(),
    })))
}

// ── Events ───────────────────────────────────────────────────────────

async fn drain_events(State(state): State<AppState>) -> ApiResult<Json<Vec<Event>>> {
    state.drain_outbox().map(Json)
}
