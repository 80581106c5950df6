//! Route handlers translating HTTP requests into `RunStore`/`Orchestrator`
//! calls, following the teacher's `AppState`/`AppError` split.

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::Json;
use axum::routing::{get, post};
use axum::Router;
use dashmap::DashMap;
use kwr_api::RunStore;
use kwr_contracts::types::{
    ApiError, ApiResponse, ComponentHealthDto, HealthResponse, RoadmapExportDto, RoadmapItemDto,
    RunDetailDto, RunSummaryDto, SubmitRunRequest,
};
use kwr_core::ids::RunId;
use kwr_core::models::{Run, RunStatus};
use kwr_core::values::Phrase;
use kwr_core::KwrError;
use kwr_pipeline::orchestrator::{CancellationSignal, Orchestrator};
use serde::Deserialize;
use tracing::{error, info};

use crate::container::ServiceContainer;

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    pub container: Arc<ServiceContainer>,
    pub orchestrator: Arc<Orchestrator>,
    pub cancellations: Arc<DashMap<RunId, CancellationSignal>>,
}

impl AppState {
    pub fn new(
        container: Arc<ServiceContainer>,
        orchestrator: Arc<Orchestrator>,
        cancellations: Arc<DashMap<RunId, CancellationSignal>>,
    ) -> Self {
        Self {
            container,
            orchestrator,
            cancellations,
        }
    }

    fn store(&self) -> Arc<dyn RunStore> {
        self.container.run_store()
    }
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/api/runs", post(submit_run).get(list_runs))
        .route("/api/runs/:id", get(get_run))
        .route("/api/runs/:id/roadmap", get(get_roadmap))
        .route("/api/runs/:id/progress", get(get_progress))
        .route("/api/runs/:id/cancel", post(cancel_run))
        .route("/api/runs/:id/resume", post(resume_run))
        .route("/healthz", get(healthz))
        .route("/metrics", get(metrics))
        .with_state(state)
}

/// Shallow-merges `overrides` onto `base`, object field by object field.
/// `Settings`' sections (`expansion`, `clustering`, ...) are themselves
/// objects, so a caller overriding a single knob (e.g. `{"expansion":
/// {"max_dream100": 50}}`) doesn't clobber the rest of that section.
fn merge_settings(base: serde_json::Value, overrides: serde_json::Value) -> serde_json::Value {
    match (base, overrides) {
        (serde_json::Value::Object(mut base_map), serde_json::Value::Object(override_map)) => {
            for (key, value) in override_map {
                let merged = match base_map.remove(&key) {
                    Some(existing) => merge_settings(existing, value),
                    None => value,
                };
                base_map.insert(key, merged);
            }
            serde_json::Value::Object(base_map)
        }
        (_, overrides) => overrides,
    }
}

async fn submit_run(
    State(state): State<AppState>,
    Json(request): Json<SubmitRunRequest>,
) -> Result<Json<ApiResponse<RunSummaryDto>>, AppError> {
    let seeds: std::result::Result<Vec<Phrase>, _> =
        request.seeds.iter().map(|s| Phrase::new(s)).collect();
    let seeds = seeds.map_err(|e| KwrError::input_validation("seeds", e))?;

    let base_settings = serde_json::to_value(state.container.settings().as_ref())
        .map_err(|e| KwrError::internal(format!("failed to serialize base settings: {e}")))?;
    let merged = match request.settings_overrides {
        Some(overrides) => merge_settings(base_settings, overrides),
        None => base_settings,
    };
    kwr_config::validate_settings(
        &serde_json::from_value(merged.clone())
            .map_err(|e| KwrError::input_validation("settings_overrides", e.to_string()))?,
    )
    .map_err(KwrError::from)?;

    let mut run = Run::new(request.owner_id, seeds, request.market, request.language, merged, request.budget_limit)?;
    state.store().create_run(run.clone()).await?;

    let run_id = run.id;
    let cancellation = CancellationSignal::new();
    state.cancellations.insert(run_id, cancellation.clone());

    let store = state.store();
    let orchestrator = state.orchestrator.clone();
    let cancellations = state.cancellations.clone();
    tokio::spawn(async move {
        let result = orchestrator.execute(&mut run, &cancellation).await;
        if let Err(e) = &result {
            error!(run_id = %run_id, error = %e, "run execution failed");
        }
        if let Err(e) = store.update_run(run).await {
            error!(run_id = %run_id, error = %e, "failed to persist final run state");
        }
        cancellations.remove(&run_id);
    });

    let run = state.store().get_run(run_id).await?;
    Ok(Json(ApiResponse::success(run_summary(&run))))
}

#[derive(Debug, Deserialize)]
struct ListRunsQuery {
    owner_id: Option<String>,
}

async fn list_runs(
    State(state): State<AppState>,
    Query(query): Query<ListRunsQuery>,
) -> Result<Json<ApiResponse<Vec<RunSummaryDto>>>, AppError> {
    let runs = state.store().list_runs(query.owner_id.as_deref()).await?;
    Ok(Json(ApiResponse::success(runs.iter().map(run_summary).collect())))
}

async fn get_run(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<RunDetailDto>>, AppError> {
    let run_id = parse_run_id(&id)?;
    let run = state.store().get_run(run_id).await?;
    Ok(Json(ApiResponse::success(run_detail(&run))))
}

async fn get_roadmap(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<RoadmapExportDto>>, AppError> {
    let run_id = parse_run_id(&id)?;
    let items = state.store().list_roadmap_items(run_id).await?;
    let dto = RoadmapExportDto {
        run_id: run_id.to_string(),
        items: items.iter().map(roadmap_item_dto).collect(),
        generated_at: chrono::Utc::now(),
    };
    Ok(Json(ApiResponse::success(dto)))
}

#[derive(Debug, serde::Serialize)]
struct ProgressSnapshot {
    run_id: String,
    status: String,
    current_stage: Option<String>,
    progress_pct: u8,
}

async fn get_progress(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<ProgressSnapshot>>, AppError> {
    let run_id = parse_run_id(&id)?;
    let run = state.store().get_run(run_id).await?;
    let progress_pct = state.store().get_progress(run_id).await?.unwrap_or(run.progress);
    Ok(Json(ApiResponse::success(ProgressSnapshot {
        run_id: run_id.to_string(),
        status: format!("{:?}", run.status),
        current_stage: run.current_stage.map(|s| format!("{:?}", s)),
        progress_pct,
    })))
}

async fn cancel_run(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<RunSummaryDto>>, AppError> {
    let run_id = parse_run_id(&id)?;
    if let Some(signal) = state.cancellations.get(&run_id) {
        signal.cancel();
    }
    let mut run = state.store().get_run(run_id).await?;
    if !matches!(run.status, RunStatus::Completed | RunStatus::Failed | RunStatus::Cancelled) {
        run.transition_to(RunStatus::Cancelled)?;
        state.store().update_run(run.clone()).await?;
    }
    info!(run_id = %run_id, "run cancellation requested");
    Ok(Json(ApiResponse::success(run_summary(&run))))
}

async fn resume_run(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<RunSummaryDto>>, AppError> {
    let run_id = parse_run_id(&id)?;
    let mut run = state.store().get_run(run_id).await?;
    if run.status != RunStatus::Failed {
        return Err(KwrError::input_validation("status", "only a Failed run can be resumed").into());
    }

    let cancellation = CancellationSignal::new();
    state.cancellations.insert(run_id, cancellation.clone());
    let store = state.store();
    let orchestrator = state.orchestrator.clone();
    let cancellations = state.cancellations.clone();
    tokio::spawn(async move {
        let result = orchestrator.resume(&mut run, &cancellation).await;
        if let Err(e) = &result {
            error!(run_id = %run_id, error = %e, "run resume failed");
        }
        if let Err(e) = store.update_run(run).await {
            error!(run_id = %run_id, error = %e, "failed to persist resumed run state");
        }
        cancellations.remove(&run_id);
    });

    let run = state.store().get_run(run_id).await?;
    Ok(Json(ApiResponse::success(run_summary(&run))))
}

async fn healthz(State(state): State<AppState>) -> Json<HealthResponse> {
    let report = state.container.health().check_health().await;
    Json(HealthResponse {
        healthy: report.status == kwr_observability::health::HealthStatus::Healthy,
        components: report
            .checks
            .into_iter()
            .map(|c| ComponentHealthDto {
                component: c.name,
                status: c.status.to_string(),
                message: Some(c.message),
            })
            .collect(),
    })
}

async fn metrics(State(state): State<AppState>) -> String {
    state.container.metrics_registry().export_prometheus()
}

fn parse_run_id(raw: &str) -> Result<RunId, AppError> {
    raw.parse()
        .map_err(|_| KwrError::input_validation("id", "not a valid run id").into())
}

fn run_summary(run: &Run) -> RunSummaryDto {
    RunSummaryDto {
        id: run.id.to_string(),
        owner_id: run.owner_id.clone(),
        status: format!("{:?}", run.status),
        current_stage: run.current_stage.map(|s| format!("{:?}", s)),
        progress: run.progress,
        created_seeds: run.seeds.iter().map(|p| p.as_str().to_string()).collect(),
        total_cost: run.api_usage.total_cost,
        budget_limit: run.budget_limit,
    }
}

fn run_detail(run: &Run) -> RunDetailDto {
    RunDetailDto {
        summary: run_summary(run),
        completed_stages: run.completed_stages.iter().map(|s| format!("{:?}", s)).collect(),
        error_log: run.error_log.clone(),
        warnings: run.warnings.clone(),
        started_at: run.started_at,
        completed_at: run.completed_at,
    }
}

fn roadmap_item_dto(item: &kwr_core::models::RoadmapItem) -> RoadmapItemDto {
    RoadmapItemDto {
        primary_keyword: item.primary_keyword.as_str().to_string(),
        secondary_keywords: item.secondary_keywords.iter().map(|p| p.as_str().to_string()).collect(),
        stage: format!("{:?}", item.stage),
        cluster_label: item.cluster_label.clone(),
        volume: item.volume,
        difficulty: item.difficulty,
        blended_score: item.blended_score.value(),
        quick_win: item.quick_win,
        suggested_title: item.suggested_title.clone(),
        dri: item.dri.clone(),
        due_date: item.due_date,
        notes: item.notes.clone(),
    }
}

#[derive(Debug)]
pub struct AppError(KwrError);

impl From<KwrError> for AppError {
    fn from(err: KwrError) -> Self {
        Self(err)
    }
}

impl axum::response::IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let (status, code) = match &self.0 {
            KwrError::InputValidation { .. } => (StatusCode::BAD_REQUEST, "input_validation"),
            KwrError::NotFound { .. } => (StatusCode::NOT_FOUND, "not_found"),
            KwrError::QuotaExceeded { .. } | KwrError::Busy { .. } => (StatusCode::TOO_MANY_REQUESTS, "busy"),
            KwrError::BudgetExceeded { .. } => (StatusCode::PAYMENT_REQUIRED, "budget_exceeded"),
            KwrError::QualityGateFailure { .. } => (StatusCode::UNPROCESSABLE_ENTITY, "quality_gate_failure"),
            KwrError::Timeout { .. } => (StatusCode::GATEWAY_TIMEOUT, "timeout"),
            KwrError::Cancelled => (StatusCode::CONFLICT, "cancelled"),
            KwrError::ProviderTransient { .. } | KwrError::ProviderPermanent { .. } => {
                (StatusCode::BAD_GATEWAY, "provider_error")
            }
            KwrError::Internal { .. } => (StatusCode::INTERNAL_SERVER_ERROR, "internal"),
        };

        let body = ApiResponse::<()>::error(ApiError::new(code, &self.0.to_string()));
        (status, Json(body)).into_response()
    }
}
