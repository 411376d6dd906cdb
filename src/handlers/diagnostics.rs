use axum::{
    extract::{Extension, State},
    http::StatusCode,
    Json,
};
use std::sync::{Arc, Mutex, OnceLock};
use sysinfo::System;
use tracing::info;

use crate::models::DiagnosticsResponse;
use crate::routes::auth_middleware::CurrentUser;
use crate::ws::hub::SessionHub;

static SYSTEM_MONITOR: OnceLock<Mutex<System>> = OnceLock::new();

/// Live hub and process statistics
pub async fn diagnostics(
    State(hub): State<Arc<SessionHub>>,
    Extension(user): Extension<CurrentUser>,
) -> (StatusCode, Json<DiagnosticsResponse>) {
    let n_groups = hub.group_count().await as u32;
    let n_connections = hub.connection_count().await as u32;

    // System stats
    let (cpu_usage, memory_alloc, memory_free, memory_total) = {
        let sys_lock = SYSTEM_MONITOR.get_or_init(|| Mutex::new(System::new_all()));
        match sys_lock.lock() {
            Ok(mut sys) => {
                sys.refresh_cpu();
                sys.refresh_memory();
                (
                    sys.global_cpu_info().cpu_usage(),
                    sys.used_memory(),
                    sys.free_memory(),
                    sys.total_memory(),
                )
            }
            Err(_) => (0.0, 0, 0, 0),
        }
    };

    info!(
        "Diagnostics for {}: CPU: {:.2}%, Mem: {}/{} MB (Free: {} MB), Conn: {}, Groups: {}",
        user.id,
        cpu_usage,
        memory_alloc / 1024 / 1024,
        memory_total / 1024 / 1024,
        memory_free / 1024 / 1024,
        n_connections,
        n_groups
    );

    (
        StatusCode::OK,
        Json(DiagnosticsResponse {
            n_groups,
            n_connections,
            cpu_usage,
            memory_alloc,
            memory_total,
            memory_free,
        }),
    )
}
