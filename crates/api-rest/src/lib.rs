//! # API REST
//!
//! REST API for the clinical scribe.
//!
//! Handles:
//! - HTTP endpoints with axum
//! - OpenAPI/Swagger documentation
//! - REST-specific concerns (JSON request/response shapes, CORS, status codes)
//!
//! Normalisation is delegated to `medical-sections` and persistence to `scribe-core`.

#![warn(rust_2018_idioms)]

pub mod health;

use axum::{
    extract::{Path as AxumPath, Query, State},
    http::StatusCode,
    response::Json,
    routing::{get, post},
    Router,
};
use medical_sections::{
    detect_format, normalize_structured_data, parse_complex_medication_string, render_plain_text,
    DocumentFormat, MedicalSections, ValidationWarning,
};
use scribe_core::{
    default_format_from_env_value, CommandClient, CoreConfig, Note, NoteError, NoteService,
    NoteSummary, SavedNote, StructuringClient, StructuringService, DEFAULT_DATA_DIR,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::PathBuf;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use utoipa::{IntoParams, OpenApi, ToSchema};
use utoipa_swagger_ui::SwaggerUi;

pub use health::{HealthRes, HealthService};

/// Application state shared across REST handlers.
#[derive(Clone)]
pub struct AppState {
    cfg: Arc<CoreConfig>,
    note_service: Arc<NoteService>,
    structuring: Option<StructuringService>,
}

impl AppState {
    pub fn new(cfg: Arc<CoreConfig>) -> Self {
        Self {
            note_service: Arc::new(NoteService::new(cfg.clone())),
            cfg,
            structuring: None,
        }
    }

    /// Enables `POST /structure` using `client`.
    pub fn with_structuring(mut self, client: Arc<dyn StructuringClient>) -> Self {
        self.structuring = Some(StructuringService::new(self.cfg.clone(), client));
        self
    }
}

#[derive(Clone, Debug, Deserialize, ToSchema)]
pub struct NormalizeReq {
    /// Raw structured data: an object, a JSON string, or free text.
    #[serde(default)]
    #[schema(value_type = Object)]
    pub data: Value,
    /// Optional format hint (`standard`, `history`, `soap`, `consultation`, `prescription`).
    #[serde(default)]
    pub role: Option<String>,
}

#[derive(Clone, Debug, Serialize, ToSchema)]
pub struct NormalizeRes {
    #[schema(value_type = String)]
    pub format: DocumentFormat,
    #[schema(value_type = Object)]
    pub sections: MedicalSections,
}

impl From<MedicalSections> for NormalizeRes {
    fn from(sections: MedicalSections) -> Self {
        Self {
            format: sections.format(),
            sections,
        }
    }
}

#[derive(Clone, Debug, Serialize, ToSchema)]
pub struct DetectRes {
    #[schema(value_type = String)]
    pub format: DocumentFormat,
}

#[derive(Clone, Debug, Deserialize, ToSchema)]
pub struct ParseMedicationReq {
    pub text: String,
}

#[derive(Clone, Debug, Serialize, ToSchema)]
pub struct ParseMedicationRes {
    pub generic_name: String,
    pub brand_name: String,
    pub strength: String,
}

#[derive(Clone, Debug, Deserialize, ToSchema)]
pub struct StructureReq {
    pub transcript: String,
    #[serde(default)]
    pub role: Option<String>,
}

#[derive(Clone, Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ListNotesQuery {
    /// Only list notes owned by this user.
    pub user_id: Option<String>,
}

#[derive(Clone, Debug, Serialize, ToSchema)]
pub struct ListNotesRes {
    #[schema(value_type = Vec<Object>)]
    pub notes: Vec<NoteSummary>,
}

#[derive(Clone, Debug, Deserialize, ToSchema)]
pub struct CreateNoteReq {
    pub user_id: String,
    pub title: String,
    #[serde(default)]
    #[schema(value_type = Object)]
    pub content: Value,
    #[serde(default)]
    pub role: Option<String>,
}

#[derive(Clone, Debug, Deserialize, ToSchema)]
pub struct UpdateNoteReq {
    pub title: String,
    #[serde(default)]
    #[schema(value_type = Object)]
    pub content: Value,
    #[serde(default)]
    pub role: Option<String>,
}

#[derive(Clone, Debug, Serialize, ToSchema)]
pub struct NoteRes {
    #[schema(value_type = Object)]
    pub note: Note,
    #[schema(value_type = Vec<Object>)]
    pub warnings: Vec<ValidationWarning>,
}

impl From<SavedNote> for NoteRes {
    fn from(saved: SavedNote) -> Self {
        Self {
            note: saved.note,
            warnings: saved.warnings,
        }
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        health,
        normalize,
        detect,
        parse_medication,
        structure,
        list_notes,
        create_note,
        read_note,
        update_note,
        delete_note,
        export_note,
    ),
    components(schemas(
        HealthRes,
        NormalizeReq,
        NormalizeRes,
        DetectRes,
        ParseMedicationReq,
        ParseMedicationRes,
        StructureReq,
        ListNotesRes,
        CreateNoteReq,
        UpdateNoteReq,
        NoteRes,
    ))
)]
pub struct ApiDoc;

/// Resolves application state from the environment.
///
/// # Environment Variables
/// - `SCRIBE_DATA_DIR`: note storage root (default: [`DEFAULT_DATA_DIR`]), created if missing
/// - `SCRIBE_DEFAULT_FORMAT`: format requested when a transcript has no role (default: `standard`)
/// - `SCRIBE_STRUCTURE_COMMAND`: program (plus arguments) used by `POST /structure`; unset
///   disables the endpoint
///
/// # Errors
/// Returns an error if the default format is unknown or the data directory cannot be created.
pub fn state_from_env() -> anyhow::Result<AppState> {
    let data_dir = std::env::var("SCRIBE_DATA_DIR").unwrap_or_else(|_| DEFAULT_DATA_DIR.into());
    let data_path = PathBuf::from(&data_dir);
    if !data_path.exists() {
        std::fs::create_dir_all(&data_path)?;
        tracing::info!("Created data directory {}", data_path.display());
    }

    let default_format =
        default_format_from_env_value(std::env::var("SCRIBE_DEFAULT_FORMAT").ok())?;
    let cfg = Arc::new(CoreConfig::new(data_path, default_format)?);
    let state = AppState::new(cfg);

    let command = std::env::var("SCRIBE_STRUCTURE_COMMAND").unwrap_or_default();
    let mut parts = command.split_whitespace().map(str::to_string);
    match parts.next() {
        Some(program) => {
            tracing::info!("Structuring transcripts with `{}`", program);
            Ok(state.with_structuring(Arc::new(CommandClient::new(program, parts.collect()))))
        }
        None => Ok(state),
    }
}

/// Builds the REST router with Swagger UI and permissive CORS.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/normalize", post(normalize))
        .route("/detect", post(detect))
        .route("/medications/parse", post(parse_medication))
        .route("/structure", post(structure))
        .route("/notes", get(list_notes).post(create_note))
        .route(
            "/notes/:id",
            get(read_note).put(update_note).delete(delete_note),
        )
        .route("/notes/:id/export", get(export_note))
        .merge(
            SwaggerUi::new("/swagger-ui/{_:.*}").url("/api-docs/openapi.json", ApiDoc::openapi()),
        )
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Maps a note error to a status code, logging it.
fn note_error_status(context: &str, e: NoteError) -> (StatusCode, &'static str) {
    match e {
        NoteError::InvalidInput(_) => {
            tracing::warn!("{} rejected: {}", context, e);
            (StatusCode::BAD_REQUEST, "Invalid request")
        }
        NoteError::NotFound(_) => (StatusCode::NOT_FOUND, "Note not found"),
        NoteError::Upstream(_) => {
            tracing::error!("{} error: {:?}", context, e);
            (StatusCode::BAD_GATEWAY, "Structuring service failed")
        }
        _ => {
            tracing::error!("{} error: {:?}", context, e);
            (StatusCode::INTERNAL_SERVER_ERROR, "Internal error")
        }
    }
}

#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Health check response", body = HealthRes)
    )
)]
#[axum::debug_handler]
async fn health(State(_state): State<AppState>) -> Json<HealthRes> {
    Json(HealthService::check_health())
}

#[utoipa::path(
    post,
    path = "/normalize",
    request_body = NormalizeReq,
    responses(
        (status = 200, description = "Canonical record", body = NormalizeRes)
    )
)]
/// Normalises arbitrary structured data into one of the four canonical shapes.
///
/// Never fails on content: unrecognisable input comes back as a fallback standard note.
#[axum::debug_handler]
async fn normalize(
    State(_state): State<AppState>,
    Json(req): Json<NormalizeReq>,
) -> Json<NormalizeRes> {
    let sections = normalize_structured_data(&req.data, req.role.as_deref());
    Json(sections.into())
}

#[utoipa::path(
    post,
    path = "/detect",
    request_body = NormalizeReq,
    responses(
        (status = 200, description = "Detected format", body = DetectRes)
    )
)]
#[axum::debug_handler]
async fn detect(State(_state): State<AppState>, Json(req): Json<NormalizeReq>) -> Json<DetectRes> {
    Json(DetectRes {
        format: detect_format(&req.data, req.role.as_deref()),
    })
}

#[utoipa::path(
    post,
    path = "/medications/parse",
    request_body = ParseMedicationReq,
    responses(
        (status = 200, description = "Parsed medication", body = ParseMedicationRes)
    )
)]
#[axum::debug_handler]
async fn parse_medication(
    State(_state): State<AppState>,
    Json(req): Json<ParseMedicationReq>,
) -> Json<ParseMedicationRes> {
    let parsed = parse_complex_medication_string(&req.text);
    Json(ParseMedicationRes {
        generic_name: parsed.generic_name,
        brand_name: parsed.brand_name,
        strength: parsed.strength,
    })
}

#[utoipa::path(
    post,
    path = "/structure",
    request_body = StructureReq,
    responses(
        (status = 200, description = "Structured note", body = NormalizeRes),
        (status = 400, description = "Bad request"),
        (status = 502, description = "Structuring service failed"),
        (status = 503, description = "Structuring not configured")
    )
)]
/// Structures a transcript through the configured structuring client.
#[axum::debug_handler]
async fn structure(
    State(state): State<AppState>,
    Json(req): Json<StructureReq>,
) -> Result<Json<NormalizeRes>, (StatusCode, &'static str)> {
    let Some(service) = state.structuring.clone() else {
        return Err((
            StatusCode::SERVICE_UNAVAILABLE,
            "Structuring not configured",
        ));
    };

    // Clients may block on I/O.
    let result = tokio::task::spawn_blocking(move || {
        service.structure_transcript(&req.transcript, req.role.as_deref())
    })
    .await
    .map_err(|e| {
        tracing::error!("Structure task error: {:?}", e);
        (StatusCode::INTERNAL_SERVER_ERROR, "Internal error")
    })?;

    match result {
        Ok(sections) => Ok(Json(sections.into())),
        Err(e) => Err(note_error_status("Structure", e)),
    }
}

#[utoipa::path(
    get,
    path = "/notes",
    params(ListNotesQuery),
    responses(
        (status = 200, description = "Saved notes, newest first", body = ListNotesRes)
    )
)]
#[axum::debug_handler]
async fn list_notes(
    State(state): State<AppState>,
    Query(query): Query<ListNotesQuery>,
) -> Json<ListNotesRes> {
    let notes = state.note_service.list(query.user_id.as_deref());
    Json(ListNotesRes { notes })
}

#[utoipa::path(
    post,
    path = "/notes",
    request_body = CreateNoteReq,
    responses(
        (status = 201, description = "Note created", body = NoteRes),
        (status = 400, description = "Bad request"),
        (status = 500, description = "Internal server error")
    )
)]
/// Normalises the supplied content and saves it as a new note.
#[axum::debug_handler]
async fn create_note(
    State(state): State<AppState>,
    Json(req): Json<CreateNoteReq>,
) -> Result<(StatusCode, Json<NoteRes>), (StatusCode, &'static str)> {
    let content = normalize_structured_data(&req.content, req.role.as_deref());
    match state.note_service.create(&req.user_id, &req.title, content) {
        Ok(saved) => Ok((StatusCode::CREATED, Json(saved.into()))),
        Err(e) => Err(note_error_status("Create note", e)),
    }
}

#[utoipa::path(
    get,
    path = "/notes/{id}",
    params(("id" = String, Path, description = "Note id (32 lowercase hex characters)")),
    responses(
        (status = 200, description = "Note"),
        (status = 400, description = "Invalid note id"),
        (status = 404, description = "Note not found")
    )
)]
#[axum::debug_handler]
async fn read_note(
    State(state): State<AppState>,
    AxumPath(id): AxumPath<String>,
) -> Result<Json<Note>, (StatusCode, &'static str)> {
    state
        .note_service
        .read(&id)
        .map(Json)
        .map_err(|e| note_error_status("Read note", e))
}

#[utoipa::path(
    put,
    path = "/notes/{id}",
    request_body = UpdateNoteReq,
    params(("id" = String, Path, description = "Note id (32 lowercase hex characters)")),
    responses(
        (status = 200, description = "Note updated", body = NoteRes),
        (status = 400, description = "Bad request"),
        (status = 404, description = "Note not found"),
        (status = 500, description = "Internal server error")
    )
)]
#[axum::debug_handler]
async fn update_note(
    State(state): State<AppState>,
    AxumPath(id): AxumPath<String>,
    Json(req): Json<UpdateNoteReq>,
) -> Result<Json<NoteRes>, (StatusCode, &'static str)> {
    let content = normalize_structured_data(&req.content, req.role.as_deref());
    state
        .note_service
        .update(&id, &req.title, content)
        .map(|saved| Json(saved.into()))
        .map_err(|e| note_error_status("Update note", e))
}

#[utoipa::path(
    delete,
    path = "/notes/{id}",
    params(("id" = String, Path, description = "Note id (32 lowercase hex characters)")),
    responses(
        (status = 204, description = "Note deleted"),
        (status = 400, description = "Invalid note id"),
        (status = 404, description = "Note not found")
    )
)]
#[axum::debug_handler]
async fn delete_note(
    State(state): State<AppState>,
    AxumPath(id): AxumPath<String>,
) -> Result<StatusCode, (StatusCode, &'static str)> {
    state
        .note_service
        .delete(&id)
        .map(|()| StatusCode::NO_CONTENT)
        .map_err(|e| note_error_status("Delete note", e))
}

#[utoipa::path(
    get,
    path = "/notes/{id}/export",
    params(("id" = String, Path, description = "Note id (32 lowercase hex characters)")),
    responses(
        (
            status = 200,
            description = "Plain-text rendering of the note",
            body = String,
            content_type = "text/plain"
        ),
        (status = 400, description = "Invalid note id"),
        (status = 404, description = "Note not found")
    )
)]
#[axum::debug_handler]
async fn export_note(
    State(state): State<AppState>,
    AxumPath(id): AxumPath<String>,
) -> Result<String, (StatusCode, &'static str)> {
    state
        .note_service
        .read(&id)
        .map(|note| render_plain_text(&note.content))
        .map_err(|e| note_error_status("Export note", e))
}
