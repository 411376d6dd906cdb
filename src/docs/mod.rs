use crate::models::*;
use utoipa::OpenApi;

/// Health check endpoint
#[utoipa::path(
    get,
    path = "/api/health",
    responses(
        (status = 200, description = "Service is healthy", body = HealthResponse)
    )
)]
#[allow(dead_code)]
pub async fn health_check_doc() {}

/// Register a new user
#[utoipa::path(
    post,
    path = "/api/auth/signup",
    request_body = SignupRequest,
    responses(
        (status = 201, description = "User registered", body = AuthResponse),
        (status = 400, description = "Invalid email or password", body = ErrorResponse),
        (status = 409, description = "Email already registered", body = ErrorResponse)
    )
)]
#[allow(dead_code)]
pub async fn signup_doc() {}

/// Fetch a document
#[utoipa::path(
    get,
    path = "/api/documents/{id}",
    params(
        ("id" = String, Path, description = "Document id")
    ),
    responses(
        (status = 200, description = "Document found", body = DocumentRecord),
        (status = 403, description = "Caller is not owner or collaborator", body = ErrorResponse),
        (status = 404, description = "Document not found", body = ErrorResponse)
    )
)]
#[allow(dead_code)]
pub async fn get_document_doc() {}

#[derive(OpenApi)]
#[openapi(
    paths(
        health_check_doc,
        signup_doc,
        get_document_doc,
    ),
    components(
        schemas(
            HealthResponse,
            ErrorResponse,
            SignupRequest,
            LoginRequest,
            AuthResponse,
            UserResponse,
            DocumentRecord,
            CollaboratorEntry,
            Role,
            CreateDocumentRequest,
            UpdateDocumentRequest,
            ShareRequest,
            ShareResponse,
            MessageResponse,
            DiagnosticsResponse,
        )
    ),
    tags(
        (name = "api", description = "API endpoints")
    )
)]
pub struct ApiDoc;
