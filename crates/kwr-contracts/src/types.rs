/// Request and Response Contracts
///
/// Wire-facing DTOs shared between the CLI, the HTTP service, and
/// `kwr-api`'s `RunStore`, kept independent of `kwr-core`'s domain model so
/// the two can evolve separately.
use serde::{Deserialize, Serialize};

/// Standard API response wrapper.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<ApiError>,
    pub timestamp: Option<String>,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
            timestamp: Some(chrono::Utc::now().to_rfc3339()),
        }
    }

    pub fn error(error: ApiError) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(error),
            timestamp: Some(chrono::Utc::now().to_rfc3339()),
        }
    }
}

/// Standard API error structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiError {
    pub code: String,
    pub message: String,
    pub details: Option<serde_json::Value>,
}

impl ApiError {
    pub fn new(code: &str, message: &str) -> Self {
        Self {
            code: code.to_string(),
            message: message.to_string(),
            details: None,
        }
    }

    pub fn with_details(code: &str, message: &str, details: serde_json::Value) -> Self {
        Self {
            code: code.to_string(),
            message: message.to_string(),
            details: Some(details),
        }
    }
}

/// `POST /runs` request body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmitRunRequest {
    pub owner_id: String,
    pub seeds: Vec<String>,
    pub market: String,
    pub language: String,
    pub budget_limit: f64,
    #[serde(default)]
    pub settings_overrides: Option<serde_json::Value>,
}

/// `POST /runs` / `GET /runs/:id` response body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunSummaryDto {
    pub id: String,
    pub owner_id: String,
    pub status: String,
    pub current_stage: Option<String>,
    pub progress: u8,
    pub created_seeds: Vec<String>,
    pub total_cost: f64,
    pub budget_limit: f64,
}

/// Full run detail, including per-stage completion and any accumulated
/// errors/warnings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunDetailDto {
    pub summary: RunSummaryDto,
    pub completed_stages: Vec<String>,
    pub error_log: Vec<String>,
    pub warnings: Vec<String>,
    pub started_at: Option<chrono::DateTime<chrono::Utc>>,
    pub completed_at: Option<chrono::DateTime<chrono::Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KeywordDto {
    pub phrase: String,
    pub tier: String,
    pub parent_phrase: Option<String>,
    pub volume: u32,
    pub difficulty: u8,
    pub intent: String,
    pub blended_score: Option<f32>,
    pub quick_win: bool,
    pub cluster_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClusterDto {
    pub id: String,
    pub label: String,
    pub size: usize,
    pub score: f32,
    pub representative_phrases: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoadmapItemDto {
    pub primary_keyword: String,
    pub secondary_keywords: Vec<String>,
    pub stage: String,
    pub cluster_label: String,
    pub volume: u32,
    pub difficulty: u8,
    pub blended_score: f32,
    pub quick_win: bool,
    pub suggested_title: String,
    pub dri: Option<String>,
    pub due_date: chrono::NaiveDate,
    pub notes: String,
}

/// `GET /runs/:id/roadmap` response body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoadmapExportDto {
    pub run_id: String,
    pub items: Vec<RoadmapItemDto>,
    pub generated_at: chrono::DateTime<chrono::Utc>,
}

/// Wire shape of a Progress Bus event, as delivered over the streaming
/// status endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgressEventDto {
    pub run_id: String,
    pub stage: String,
    pub stage_progress_pct: u8,
    pub overall_progress_pct: u8,
    pub message: Option<String>,
    pub emitted_at: chrono::DateTime<chrono::Utc>,
}

/// `GET /healthz` response body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub healthy: bool,
    pub components: Vec<ComponentHealthDto>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComponentHealthDto {
    pub component: String,
    pub status: String,
    pub message: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn api_response_success_carries_no_error() {
        let resp = ApiResponse::success(42);
        assert!(resp.success);
        assert_eq!(resp.data, Some(42));
        assert!(resp.error.is_none());
    }

    #[test]
    fn api_response_error_carries_no_data() {
        let resp: ApiResponse<u32> = ApiResponse::error(ApiError::new("not_found", "run missing"));
        assert!(!resp.success);
        assert!(resp.data.is_none());
        assert_eq!(resp.error.unwrap().code, "not_found");
    }
}
