use axum::{
    Router,
    extract::{Path, State},
    http::{StatusCode, header},
    response::{IntoResponse, Json},
    routing::{delete, get, post},
};
use serde_json::{Value, json};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{error, info};

use medease_core::{
    Companion, GUIDE_FILENAME, InMemorySessionStorage, MedEaseError, ModelClient, PatientInput,
    RigModelClient,
};

use crate::models::{
    ChatRequest, ChatResponse, CreateSessionResponse, GuideRequest, GuideResponse, HistoryResponse,
};

type ApiResult<T> = Result<Json<T>, ApiError>;
type ApiError = (StatusCode, Json<Value>);

fn bad_request_error(message: &str) -> ApiError {
    (StatusCode::BAD_REQUEST, Json(json!({ "error": message })))
}

fn error_response(err: MedEaseError) -> ApiError {
    let message = err.to_string();
    match err {
        MedEaseError::InvalidInput(_) => (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": message })),
        ),
        MedEaseError::SessionNotFound(_) | MedEaseError::NoGuide(_) => {
            (StatusCode::NOT_FOUND, Json(json!({ "error": message })))
        }
        MedEaseError::SessionBusy(_) => (StatusCode::CONFLICT, Json(json!({ "error": message }))),
        // External-call failures are recoverable: tell the client to retry
        MedEaseError::ModelCall(_) | MedEaseError::EmptyModelResponse => (
            StatusCode::BAD_GATEWAY,
            Json(json!({ "error": message, "retryable": true })),
        ),
        MedEaseError::Document(_) | MedEaseError::Storage(_) => {
            error!("internal error: {}", message);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": message })),
            )
        }
    }
}

#[derive(Clone)]
pub struct AppState {
    pub companion: Companion,
}

/// Builds the application router around the given model client.
pub fn create_app(model: Arc<dyn ModelClient>) -> Router {
    let companion = Companion::new(Arc::new(InMemorySessionStorage::new()), model);
    build_router(AppState { companion })
}

/// Builds the application with the OpenRouter-backed model from environment
/// configuration.
pub fn create_app_from_env() -> anyhow::Result<Router> {
    let model = RigModelClient::from_env()?;
    info!(model = %model.model(), "using OpenRouter completion model");
    Ok(create_app(Arc::new(model)))
}

fn build_router(app_state: AppState) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/health", get(health_check))
        .route("/sessions", post(create_session))
        .route("/sessions/{session_id}", delete(end_session))
        .route("/sessions/{session_id}/guide", post(generate_guide))
        .route("/sessions/{session_id}/document", get(download_document))
        .route("/sessions/{session_id}/chat", post(chat))
        .route("/sessions/{session_id}/history", get(get_history))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(app_state)
}

async fn root() -> Json<Value> {
    Json(json!({
        "service": "MedEase Pre-Surgery Companion",
        "version": "1.0.0",
        "description": "Personalized pre-surgery guides and supportive chat",
        "endpoints": {
            "POST /sessions": "Start a new companion session",
            "DELETE /sessions/{session_id}": "Discard a session",
            "POST /sessions/{session_id}/guide": "Generate a personalized pre-surgery guide",
            "GET /sessions/{session_id}/document": "Download the guide as a PDF",
            "POST /sessions/{session_id}/chat": "Ask MedEase a question",
            "GET /sessions/{session_id}/history": "Full chat transcript",
            "GET /health": "Health check"
        }
    }))
}

async fn health_check() -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "timestamp": chrono::Utc::now().to_rfc3339()
    }))
}

async fn create_session(State(state): State<AppState>) -> ApiResult<CreateSessionResponse> {
    let session = state
        .companion
        .start_session()
        .await
        .map_err(error_response)?;

    info!("Session {} created successfully", session.id);

    Ok(Json(CreateSessionResponse {
        session_id: session.id,
        created_at: session.created_at,
    }))
}

async fn end_session(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> ApiResult<Value> {
    state
        .companion
        .end_session(&session_id)
        .await
        .map_err(error_response)?;

    Ok(Json(json!({
        "session_id": session_id,
        "status": "discarded"
    })))
}

async fn generate_guide(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
    Json(request): Json<GuideRequest>,
) -> ApiResult<GuideResponse> {
    info!(
        "Generating guide for session {} (surgery: {})",
        session_id, request.surgery_type
    );

    // Reject invalid input before any model call
    let input = PatientInput::new(
        request.age,
        request.conditions,
        request.medications,
        request.surgery_type,
        request.notes,
    )
    .map_err(error_response)?;

    let guide = state
        .companion
        .generate_guide(&session_id, input)
        .await
        .map_err(error_response)?;

    Ok(Json(GuideResponse { session_id, guide }))
}

async fn download_document(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let bytes = state
        .companion
        .render_document(&session_id)
        .await
        .map_err(error_response)?;

    let headers = [
        (header::CONTENT_TYPE, "application/pdf".to_string()),
        (
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{GUIDE_FILENAME}\""),
        ),
    ];
    Ok((headers, bytes))
}

async fn chat(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
    Json(request): Json<ChatRequest>,
) -> ApiResult<ChatResponse> {
    if request.message.trim().is_empty() {
        return Err(bad_request_error("Message cannot be empty"));
    }

    let reply = state
        .companion
        .chat(&session_id, &request.message)
        .await
        .map_err(error_response)?;

    Ok(Json(ChatResponse { session_id, reply }))
}

async fn get_history(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> ApiResult<HistoryResponse> {
    let turns = state
        .companion
        .transcript(&session_id)
        .await
        .map_err(error_response)?;

    Ok(Json(HistoryResponse { session_id, turns }))
}
