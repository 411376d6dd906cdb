use axum::http::{self};
use chrono::{Duration, Utc};
use jsonwebtoken::{
    decode, encode, Algorithm, DecodingKey, EncodingKey, Header, TokenData, Validation,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Claims carried by an auth token
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    #[serde(rename = "type")]
    pub type_: String,
    pub exp: usize,
}

// Get the auth token from a request
pub fn get_auth_token<B>(req: &http::Request<B>) -> Result<String, String> {
    // 1. Try to get token from Authorization header
    if let Some(auth_header) = req.headers().get(http::header::AUTHORIZATION) {
        let auth_str = auth_header
            .to_str()
            .map_err(|_| "Invalid Authorization header".to_string())?;
        Ok(auth_str
            .strip_prefix("Bearer ")
            .unwrap_or(auth_str)
            .to_string())
    }
    // 2. Try to get token from cookies
    else {
        let cookie_header = req
            .headers()
            .get(http::header::COOKIE)
            .ok_or_else(|| "Missing Authorization header or Cookie".to_string())?
            .to_str()
            .map_err(|_| "Invalid Cookie header".to_string())?;

        for cookie in cookie::Cookie::split_parse(cookie_header) {
            if let Ok(c) = cookie {
                if c.name() == "auth_token" {
                    return Ok(c.value().to_string());
                }
            }
        }
        Err("auth_token cookie not found".to_string())
    }
}

// Issue a token for a user, valid for one day
pub fn issue_user_token(user_id: Uuid, secret: &str) -> Result<String, jsonwebtoken::errors::Error> {
    let expiration = Utc::now()
        .checked_add_signed(Duration::days(1))
        .expect("valid timestamp")
        .timestamp();

    let claims = Claims {
        sub: user_id.to_string(),
        type_: "user".to_string(),
        exp: expiration as usize,
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
}

// Validate a JWT token and return the token data
pub fn validate_jwt(
    token: &str,
    secret: &str,
) -> Result<TokenData<serde_json::Value>, jsonwebtoken::errors::Error> {
    let validation = Validation::new(Algorithm::HS256);
    let decoding_key = DecodingKey::from_secret(secret.as_bytes());
    decode::<serde_json::Value>(token, &decoding_key, &validation)
}

// Hash a password for storage
pub fn hash_password(password: &str) -> Result<String, bcrypt::BcryptError> {
    bcrypt::hash(password, bcrypt::DEFAULT_COST)
}

// Check a password against its stored hash. A malformed hash counts as a
// non-match rather than an error.
pub fn verify_password(password: &str, password_hash: &str) -> bool {
    bcrypt::verify(password, password_hash).unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "test-secret";

    #[test]
    fn issued_token_round_trips() {
        let user_id = Uuid::new_v4();
        let token = issue_user_token(user_id, SECRET).unwrap();
        let data = validate_jwt(&token, SECRET).unwrap();

        assert_eq!(
            data.claims.get("sub").and_then(|v| v.as_str()),
            Some(user_id.to_string().as_str())
        );
        assert_eq!(
            data.claims.get("type").and_then(|v| v.as_str()),
            Some("user")
        );
    }

    #[test]
    fn token_with_wrong_secret_is_rejected() {
        let token = issue_user_token(Uuid::new_v4(), SECRET).unwrap();
        assert!(validate_jwt(&token, "other-secret").is_err());
    }

    #[test]
    fn password_hash_verifies() {
        let hash = hash_password("hunter2hunter2").unwrap();
        assert!(verify_password("hunter2hunter2", &hash));
        assert!(!verify_password("wrong password", &hash));
    }

    #[test]
    fn malformed_hash_is_a_non_match() {
        assert!(!verify_password("anything", "not-a-bcrypt-hash"));
    }

    #[test]
    fn bearer_prefix_is_stripped() {
        let req = http::Request::builder()
            .header(http::header::AUTHORIZATION, "Bearer abc.def.ghi")
            .body(())
            .unwrap();
        assert_eq!(get_auth_token(&req).unwrap(), "abc.def.ghi");
    }

    #[test]
    fn cookie_fallback_is_used() {
        let req = http::Request::builder()
            .header(http::header::COOKIE, "session=x; auth_token=tok123")
            .body(())
            .unwrap();
        assert_eq!(get_auth_token(&req).unwrap(), "tok123");
    }

    #[test]
    fn missing_credentials_are_an_error() {
        let req = http::Request::builder().body(()).unwrap();
        assert!(get_auth_token(&req).is_err());
    }
}
