use serde::Serialize;
use utoipa::ToSchema;

/// Health check payload.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, ToSchema)]
pub struct HealthRes {
    pub ok: bool,
    pub message: String,
}

/// Simple health service for the scribe API.
#[derive(Clone, Default)]
pub struct HealthService;

impl HealthService {
    pub fn new() -> Self {
        Self
    }

    /// Reports the service as healthy. There is no dependency to probe yet.
    pub fn check_health() -> HealthRes {
        HealthRes {
            ok: true,
            message: "Scribe is alive".into(),
        }
    }
}
