use axum::{extract::Extension, http::StatusCode, Json};
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::config;
use crate::db::dbdocs;
use crate::models::{AuthResponse, ErrorResponse, LoginRequest, SignupRequest, UserResponse};
use crate::routes::auth_middleware::CurrentUser;
use crate::services::auth_service;

/// Register a new user
pub async fn signup(
    Json(request): Json<SignupRequest>,
) -> Result<(StatusCode, Json<AuthResponse>), (StatusCode, Json<ErrorResponse>)> {
    info!("Signup request for email: {}", request.email);

    // Validate email format (basic check)
    if !request.email.contains('@') {
        warn!("Invalid email format: {}", request.email);
        return Err(ErrorResponse::of(StatusCode::BAD_REQUEST, "Invalid email format"));
    }

    // Validate password length
    if request.password.len() < 8 {
        warn!("Password too short for {}", request.email);
        return Err(ErrorResponse::of(
            StatusCode::BAD_REQUEST,
            "Password must be at least 8 characters",
        ));
    }

    if request.name.trim().is_empty() {
        return Err(ErrorResponse::of(StatusCode::BAD_REQUEST, "Name is required"));
    }

    let db = match dbdocs::get_db() {
        Some(db) => db,
        None => {
            error!("Database not initialized");
            return Err(ErrorResponse::of(
                StatusCode::SERVICE_UNAVAILABLE,
                "Database not available",
            ));
        }
    };

    // Reject duplicate emails
    match db.find_user_by_email(&request.email).await {
        Ok(Some(_)) => {
            warn!("Email already registered: {}", request.email);
            return Err(ErrorResponse::of(StatusCode::CONFLICT, "User already exists"));
        }
        Ok(None) => {}
        Err(e) => {
            error!("Failed to check existing user {}: {}", request.email, e);
            return Err(ErrorResponse::of(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Server error during signup",
            ));
        }
    }

    let password_hash = match auth_service::hash_password(&request.password) {
        Ok(hash) => hash,
        Err(e) => {
            error!("Failed to hash password: {}", e);
            return Err(ErrorResponse::of(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Server error during signup",
            ));
        }
    };

    let user = match db
        .insert_user(&request.name, &request.email, &password_hash)
        .await
    {
        Ok(user) => user,
        Err(e) => {
            error!("Failed to create user {}: {}", request.email, e);
            return Err(ErrorResponse::of(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to create user",
            ));
        }
    };

    let token = issue_token(user.id)?;
    info!("User registered: {} ({})", user.name, user.email);

    Ok((
        StatusCode::CREATED,
        Json(AuthResponse {
            token,
            user: UserResponse::from(&user),
        }),
    ))
}

/// Log an existing user in
pub async fn login(
    Json(request): Json<LoginRequest>,
) -> Result<(StatusCode, Json<AuthResponse>), (StatusCode, Json<ErrorResponse>)> {
    info!("Login request for email: {}", request.email);

    let db = match dbdocs::get_db() {
        Some(db) => db,
        None => {
            error!("Database not initialized");
            return Err(ErrorResponse::of(
                StatusCode::SERVICE_UNAVAILABLE,
                "Database not available",
            ));
        }
    };

    let user = match db.find_user_by_email(&request.email).await {
        Ok(Some(user)) => user,
        Ok(None) => {
            warn!("Login for unknown email: {}", request.email);
            return Err(ErrorResponse::of(
                StatusCode::UNAUTHORIZED,
                "Invalid email or password",
            ));
        }
        Err(e) => {
            error!("Failed to load user {}: {}", request.email, e);
            return Err(ErrorResponse::of(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Server error during login",
            ));
        }
    };

    if !auth_service::verify_password(&request.password, &user.password_hash) {
        warn!("Invalid password for {}", request.email);
        return Err(ErrorResponse::of(
            StatusCode::UNAUTHORIZED,
            "Invalid email or password",
        ));
    }

    let token = issue_token(user.id)?;
    info!("User logged in: {}", user.email);

    Ok((
        StatusCode::OK,
        Json(AuthResponse {
            token,
            user: UserResponse::from(&user),
        }),
    ))
}

/// Return the authenticated user
pub async fn current_user(Extension(user): Extension<CurrentUser>) -> Json<UserResponse> {
    Json(UserResponse {
        id: user.id,
        name: user.name,
        email: user.email,
    })
}

fn issue_token(user_id: Uuid) -> Result<String, (StatusCode, Json<ErrorResponse>)> {
    let config = config::get_config();
    let secret = match &config.jwt_secret {
        Some(secret) => secret,
        None => {
            error!("JWT secret not configured");
            return Err(ErrorResponse::of(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Authentication not configured",
            ));
        }
    };

    auth_service::issue_user_token(user_id, secret).map_err(|e| {
        error!("Failed to issue token for {}: {}", user_id, e);
        ErrorResponse::of(StatusCode::INTERNAL_SERVER_ERROR, "Failed to issue token")
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    // Validation runs before any database access, so these pass without a pool.

    #[tokio::test]
    async fn signup_rejects_invalid_email() {
        let request = SignupRequest {
            name: "Test".to_string(),
            email: "not-an-email".to_string(),
            password: "password123".to_string(),
        };
        let (status, _) = signup(Json(request)).await.unwrap_err();
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn signup_rejects_short_password() {
        let request = SignupRequest {
            name: "Test".to_string(),
            email: "user@example.com".to_string(),
            password: "short".to_string(),
        };
        let (status, _) = signup(Json(request)).await.unwrap_err();
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn signup_rejects_blank_name() {
        let request = SignupRequest {
            name: "   ".to_string(),
            email: "user@example.com".to_string(),
            password: "password123".to_string(),
        };
        let (status, _) = signup(Json(request)).await.unwrap_err();
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }
}
