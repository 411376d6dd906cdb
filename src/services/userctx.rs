use moka::sync::Cache;
use std::sync::OnceLock;
use std::time::Duration;
use tracing::{error, info};
use uuid::Uuid;

use crate::db::dbdocs;
use crate::models::UserRow;

static USER_CTX_CACHE: OnceLock<Cache<String, UserRow>> = OnceLock::new();

pub fn init_user_ctx_cache() {
    USER_CTX_CACHE.get_or_init(|| {
        Cache::builder()
            .max_capacity(100_000)
            .time_to_idle(Duration::from_secs(5 * 60))
            .build()
    });
    info!("User cache initialized");
}

fn get_user_ctx_cache() -> &'static Cache<String, UserRow> {
    USER_CTX_CACHE
        .get()
        .expect("User cache not initialized. Call init_user_ctx_cache() first.")
}

/// Resolve a user by uid, from cache or the users table
pub async fn get_or_fetch_user(uid: &str) -> Result<UserRow, String> {
    let cache = get_user_ctx_cache();

    if let Some(user) = cache.get(uid) {
        return Ok(user);
    }

    info!("User cache miss for uid {}. Loading from database.", uid);
    let user_uuid =
        Uuid::parse_str(uid).map_err(|e| format!("Invalid user id '{}': {}", uid, e))?;

    let db = dbdocs::get_db().ok_or_else(|| "Database not initialized".to_string())?;
    match db.find_user_by_id(user_uuid).await {
        Ok(Some(user)) => {
            cache.insert(uid.to_string(), user.clone());
            Ok(user)
        }
        Ok(None) => Err(format!("User {} not found", uid)),
        Err(e) => {
            error!("Failed to load user {}: {}", uid, e);
            Err(format!("Failed to load user {}: {}", uid, e))
        }
    }
}
