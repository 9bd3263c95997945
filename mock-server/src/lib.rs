use std::collections::BTreeMap;
use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{any, get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::{net::TcpListener, sync::RwLock};

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Activity {
    pub id: u64,
    pub title: String,
    pub completed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
}

#[derive(Deserialize)]
pub struct CreateActivity {
    pub title: String,
    #[serde(default)]
    pub completed: bool,
    pub location: Option<String>,
}

#[derive(Deserialize)]
pub struct UpdateActivity {
    pub title: Option<String>,
    pub completed: Option<bool>,
    pub location: Option<String>,
}

#[derive(Default)]
pub struct Store {
    next_id: u64,
    activities: BTreeMap<u64, Activity>,
}

pub type Db = Arc<RwLock<Store>>;

type ApiResult<T> = Result<T, (StatusCode, Json<Value>)>;

pub fn app() -> Router {
    let db: Db = Arc::new(RwLock::new(Store::default()));
    Router::new()
        .route("/activities", get(list_activities).post(create_activity))
        .route(
            "/activities/{id}",
            get(get_activity).put(update_activity).delete(delete_activity),
        )
        .route("/echo", post(echo))
        .route("/headers", get(headers))
        .route("/status/{code}", any(status))
        .route("/not-json", get(not_json))
        .route("/scalar", get(scalar))
        .with_state(db)
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    if let Ok(addr) = listener.local_addr() {
        tracing::info!(%addr, "mock server listening");
    }
    axum::serve(listener, app()).await
}

fn not_found(id: u64) -> (StatusCode, Json<Value>) {
    (
        StatusCode::NOT_FOUND,
        Json(json!({ "message": format!("activity {id} not found") })),
    )
}

async fn list_activities(State(db): State<Db>) -> Json<Vec<Activity>> {
    let store = db.read().await;
    Json(store.activities.values().cloned().collect())
}

async fn create_activity(
    State(db): State<Db>,
    Json(input): Json<CreateActivity>,
) -> ApiResult<(StatusCode, Json<Activity>)> {
    if input.title.trim().is_empty() {
        return Err((
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(json!({ "message": "title must not be empty" })),
        ));
    }
    let mut store = db.write().await;
    store.next_id += 1;
    let activity = Activity {
        id: store.next_id,
        title: input.title,
        completed: input.completed,
        location: input.location,
    };
    store.activities.insert(activity.id, activity.clone());
    tracing::debug!(id = activity.id, "activity created");
    Ok((StatusCode::CREATED, Json(activity)))
}

async fn get_activity(State(db): State<Db>, Path(id): Path<u64>) -> ApiResult<Json<Activity>> {
    let store = db.read().await;
    store
        .activities
        .get(&id)
        .cloned()
        .map(Json)
        .ok_or_else(|| not_found(id))
}

async fn update_activity(
    State(db): State<Db>,
    Path(id): Path<u64>,
    Json(input): Json<UpdateActivity>,
) -> ApiResult<Json<Activity>> {
    let mut store = db.write().await;
    let activity = store.activities.get_mut(&id).ok_or_else(|| not_found(id))?;
    if let Some(title) = input.title {
        activity.title = title;
    }
    if let Some(completed) = input.completed {
        activity.completed = completed;
    }
    if let Some(location) = input.location {
        activity.location = Some(location);
    }
    Ok(Json(activity.clone()))
}

async fn delete_activity(State(db): State<Db>, Path(id): Path<u64>) -> ApiResult<Json<Activity>> {
    let mut store = db.write().await;
    store
        .activities
        .remove(&id)
        .map(Json)
        .ok_or_else(|| not_found(id))
}

async fn echo(Json(body): Json<Value>) -> Json<Value> {
    Json(body)
}

/// Report the auth headers the request arrived with.
async fn headers(headers: HeaderMap) -> Json<Value> {
    let read = |name: &str| {
        headers
            .get(name)
            .and_then(|value| value.to_str().ok())
            .map(str::to_owned)
    };
    Json(json!({
        "apikey": read("apikey"),
        "authorization": read("authorization"),
        "content_type": read("content-type"),
    }))
}

async fn status(Path(code): Path<u16>) -> Response {
    match StatusCode::from_u16(code) {
        Ok(status) => {
            let reason = status.canonical_reason().unwrap_or("status");
            (status, Json(json!({ "error": reason }))).into_response()
        }
        Err(_) => StatusCode::BAD_REQUEST.into_response(),
    }
}

async fn not_json() -> &'static str {
    "definitely not json"
}

async fn scalar() -> Json<Value> {
    Json(json!(42))
}
