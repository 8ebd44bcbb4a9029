use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Path, Query, Request, State},
    http::{HeaderValue, StatusCode, header},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, patch, post},
};
use serde::{Deserialize, Serialize};
use tower_http::limit::RequestBodyLimitLayer;
use tracing::{error, info, warn};

use crate::commands::AppPlanner;
use weekplate_core::error::PlanError;
use weekplate_core::models::{ImportSummary, MealPlan, RawRecipe, Recipe, ShoppingListItem};
use weekplate_core::recipes::RecipeFilter;

const BODY_LIMIT: usize = 1024 * 1024; // 1 MB

#[derive(Clone)]
struct AppState {
    planner: Arc<AppPlanner>,
    api_key: Option<String>,
}

// --- Request / Response types ---

/// Only the version of the client's copy matters; the stored plan is
/// authoritative for everything else.
#[derive(Deserialize)]
struct PlanRef {
    version: Option<u64>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RerollRequest {
    current_plan: Option<PlanRef>,
    recipe_index_to_replace: i64,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ToggleItemRequest {
    item_name: String,
    acquired: bool,
    version: Option<u64>,
}

#[derive(Deserialize)]
struct RecipeQuery {
    search: Option<String>,
    main: Option<String>,
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

// --- Error handling ---

#[derive(Debug)]
enum ApiError {
    NotFound(String),
    BadRequest(String),
    Conflict(String),
    Unprocessable(String),
    Internal(anyhow::Error),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            Self::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            Self::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            Self::Conflict(msg) => (StatusCode::CONFLICT, msg),
            Self::Unprocessable(msg) => (StatusCode::UNPROCESSABLE_ENTITY, msg),
            Self::Internal(err) => {
                error!(error = %format!("{err:#}"), "internal server error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
        };
        (status, Json(ErrorResponse { error: message })).into_response()
    }
}

impl From<PlanError> for ApiError {
    fn from(err: PlanError) -> Self {
        match err {
            PlanError::EmptyPool => Self::Unprocessable(err.to_string()),
            PlanError::InvalidSlot { .. } | PlanError::InvalidRecipe(_) => {
                Self::BadRequest(err.to_string())
            }
            PlanError::ItemNotFound(_) | PlanError::PlanNotFound | PlanError::RecipeNotFound(_) => {
                Self::NotFound(err.to_string())
            }
            PlanError::VersionConflict { .. } => Self::Conflict(err.to_string()),
            PlanError::Store(inner) => Self::Internal(inner),
        }
    }
}

// --- Middleware ---

async fn require_auth(State(state): State<AppState>, request: Request, next: Next) -> Response {
    if let Some(ref expected_key) = state.api_key {
        let authorized = request
            .headers()
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "))
            .is_some_and(|token| token == expected_key);

        if !authorized {
            warn!(path = %request.uri().path(), "rejected request without a valid API key");
            return (
                StatusCode::UNAUTHORIZED,
                Json(ErrorResponse {
                    error: "Invalid or missing API key".to_string(),
                }),
            )
                .into_response();
        }
    }
    next.run(request).await
}

async fn security_headers(request: Request, next: Next) -> Response {
    let mut response = next.run(request).await;
    let headers = response.headers_mut();
    headers.insert(
        "x-content-type-options",
        HeaderValue::from_static("nosniff"),
    );
    headers.insert("x-frame-options", HeaderValue::from_static("DENY"));
    headers.insert(
        "content-security-policy",
        HeaderValue::from_static("default-src 'none'"),
    );
    response
}

// --- Meal plan handlers ---

async fn get_meal_plan(State(state): State<AppState>) -> Result<Json<MealPlan>, ApiError> {
    let plan = state.planner.current_plan()?.ok_or(PlanError::PlanNotFound)?;
    Ok(Json(plan))
}

async fn generate_meal_plan(
    State(state): State<AppState>,
) -> Result<(StatusCode, Json<MealPlan>), ApiError> {
    let plan = state.planner.generate_plan()?;
    Ok((StatusCode::CREATED, Json(plan)))
}

async fn reroll_meal_plan(
    State(state): State<AppState>,
    Json(req): Json<RerollRequest>,
) -> Result<Json<MealPlan>, ApiError> {
    let slot = usize::try_from(req.recipe_index_to_replace).map_err(|_| {
        ApiError::BadRequest(format!(
            "recipeIndexToReplace {} is out of range",
            req.recipe_index_to_replace
        ))
    })?;
    let expected_version = req.current_plan.and_then(|p| p.version);
    let plan = state.planner.reroll_slot(slot, expected_version)?;
    Ok(Json(plan))
}

async fn clear_meal_plan(State(state): State<AppState>) -> Result<StatusCode, ApiError> {
    if !state.planner.clear_plan()? {
        return Err(PlanError::PlanNotFound.into());
    }
    Ok(StatusCode::NO_CONTENT)
}

async fn toggle_shopping_item(
    State(state): State<AppState>,
    Json(req): Json<ToggleItemRequest>,
) -> Result<Json<ShoppingListItem>, ApiError> {
    let item = state
        .planner
        .set_item_acquired(&req.item_name, req.acquired, req.version)?;
    Ok(Json(item))
}

// --- Recipe handlers ---

async fn list_recipes(
    State(state): State<AppState>,
    Query(query): Query<RecipeQuery>,
) -> Result<Json<Vec<Recipe>>, ApiError> {
    let filter = RecipeFilter {
        search: query.search,
        main: query.main,
    };
    Ok(Json(state.planner.list_recipes(&filter)?))
}

async fn create_recipe(
    State(state): State<AppState>,
    Json(req): Json<RawRecipe>,
) -> Result<(StatusCode, Json<Recipe>), ApiError> {
    let recipe = state.planner.create_recipe(&req)?;
    Ok((StatusCode::CREATED, Json(recipe)))
}

async fn get_recipe(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Recipe>, ApiError> {
    Ok(Json(state.planner.get_recipe(&id)?))
}

async fn update_recipe(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<RawRecipe>,
) -> Result<Json<Recipe>, ApiError> {
    Ok(Json(state.planner.update_recipe(&id, &req)?))
}

async fn delete_recipe(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    state.planner.delete_recipe(&id)?;
    Ok(StatusCode::NO_CONTENT)
}

async fn export_recipes(State(state): State<AppState>) -> Result<Json<Vec<Recipe>>, ApiError> {
    Ok(Json(state.planner.export_recipes()?))
}

async fn import_recipes(
    State(state): State<AppState>,
    Json(documents): Json<Vec<RawRecipe>>,
) -> Result<Json<ImportSummary>, ApiError> {
    Ok(Json(state.planner.import_recipes(&documents)?))
}

fn build_router(state: AppState) -> Router {
    Router::new()
        .route(
            "/api/meal-plan",
            get(get_meal_plan)
                .post(generate_meal_plan)
                .put(reroll_meal_plan)
                .delete(clear_meal_plan),
        )
        .route(
            "/api/meal-plan/shopping-list",
            patch(toggle_shopping_item),
        )
        .route("/api/recipes", get(list_recipes).post(create_recipe))
        .route("/api/recipes/export", get(export_recipes))
        .route("/api/recipes/import", post(import_recipes))
        .route(
            "/api/recipes/{id}",
            get(get_recipe).put(update_recipe).delete(delete_recipe),
        )
        .route_layer(middleware::from_fn_with_state(state.clone(), require_auth))
        .layer(RequestBodyLimitLayer::new(BODY_LIMIT))
        .layer(middleware::from_fn(security_headers))
        .with_state(state)
}

// --- Server startup ---

pub async fn start_server(
    planner: AppPlanner,
    port: u16,
    bind: &str,
    api_key: Option<String>,
) -> anyhow::Result<()> {
    let state = AppState {
        planner: Arc::new(planner),
        api_key: api_key.clone(),
    };

    let app = build_router(state);

    if let Some(ref key) = api_key {
        eprintln!(
            "API key: {}...{} (see api_key file in data directory)",
            &key[..4.min(key.len())],
            &key[key.len().saturating_sub(4)..],
        );
    } else {
        eprintln!("Warning: Authentication disabled (--no-auth). API is open to anyone.");
    }

    if bind != "127.0.0.1" && bind != "localhost" && api_key.is_none() {
        eprintln!(
            "Warning: Listening on {bind} with no authentication. Any device on your network can access this API."
        );
    }

    let listener = tokio::net::TcpListener::bind(format!("{bind}:{port}")).await?;
    info!(%bind, port, "listening on http://{bind}:{port}");
    axum::serve(listener, app).await?;

    Ok(())
}
