use axum::{extract::Request, http::StatusCode, middleware::Next, response::Response};
use tracing::{error, info};
use uuid::Uuid;

use crate::config;
use crate::services::auth_service::{get_auth_token, validate_jwt};
use crate::services::userctx;

/// Authenticated user injected into request extensions
#[derive(Clone, Debug)]
pub struct CurrentUser {
    pub id: Uuid,
    pub name: String,
    pub email: String,
}

pub async fn auth_middleware(mut req: Request, next: Next) -> Result<Response, StatusCode> {
    // 1. Get the auth token from the request
    let token = match get_auth_token(&req) {
        Ok(token) => token,
        Err(_) => return Err(StatusCode::UNAUTHORIZED),
    };

    // 2. Validate Token
    let config = config::get_config();
    let secret = match &config.jwt_secret {
        Some(secret) => secret,
        None => {
            error!("JWT secret not configured");
            return Err(StatusCode::INTERNAL_SERVER_ERROR);
        }
    };
    let token_data = match validate_jwt(&token, secret) {
        Ok(token_data) => token_data,
        Err(e) => {
            error!("JWT validation failed: {}", e);
            return Err(StatusCode::UNAUTHORIZED);
        }
    };

    // 3. Only user tokens grant API access
    let token_type = token_data
        .claims
        .get("type")
        .and_then(|v| v.as_str())
        .ok_or_else(|| {
            error!("JWT token does not contain 'type' claim");
            StatusCode::UNAUTHORIZED
        })?;
    if token_type != "user" {
        error!("Invalid token type: {}", token_type);
        return Err(StatusCode::UNAUTHORIZED);
    }

    // 4. Extract the UID
    let user_uid = if let Some(sub) = token_data.claims.get("sub").and_then(|v| v.as_str()) {
        sub.to_string()
    } else {
        error!("JWT token does not contain 'sub' claim");
        return Err(StatusCode::UNAUTHORIZED);
    };

    info!("User token validated successfully for {}", user_uid);

    // 5. Load the user and stash it for downstream handlers
    let user = match userctx::get_or_fetch_user(&user_uid).await {
        Ok(user) => user,
        Err(e) => {
            error!("Failed to load user context for {}: {}", user_uid, e);
            return Err(StatusCode::UNAUTHORIZED);
        }
    };
    req.extensions_mut().insert(CurrentUser {
        id: user.id,
        name: user.name,
        email: user.email,
    });

    // Token is valid and we have the user, proceed to next middleware/handler
    Ok(next.run(req).await)
}
