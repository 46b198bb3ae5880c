use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Runtime diagnostics for the broadcast service
#[derive(Serialize, Deserialize, ToSchema)]
pub struct DiagnosticsResponse {
    /// Number of open collaboration connections
    pub n_conn: u32,
    /// Number of live document rooms
    pub n_rooms: u32,
    pub cpu_usage: f32,
    pub memory_alloc: u64,
    pub memory_total: u64,
    pub memory_free: u64,
    /// Server time (RFC 3339)
    pub server_time: String,
}
