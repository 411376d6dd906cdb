use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Live hub and process statistics
#[derive(Serialize, Deserialize, ToSchema)]
pub struct DiagnosticsResponse {
    /// Document groups with at least one live connection
    pub n_groups: u32,
    /// Live connections across all groups
    pub n_connections: u32,
    pub cpu_usage: f32,
    pub memory_alloc: u64,
    pub memory_total: u64,
    pub memory_free: u64,
}
