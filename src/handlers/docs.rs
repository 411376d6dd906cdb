use axum::{
    extract::{Extension, Path},
    http::StatusCode,
    Json,
};
use std::sync::Arc;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::db::dbdocs::{self, DbDocs};
use crate::models::{
    CreateDocumentRequest, DocumentRecord, ErrorResponse, MessageResponse, ShareRequest,
    ShareResponse, UpdateDocumentRequest,
};
use crate::routes::auth_middleware::CurrentUser;

type HandlerError = (StatusCode, Json<ErrorResponse>);

/// Create a document owned by the caller
pub async fn create_document(
    Extension(user): Extension<CurrentUser>,
    Json(request): Json<CreateDocumentRequest>,
) -> Result<(StatusCode, Json<DocumentRecord>), HandlerError> {
    if request.title.trim().is_empty() {
        return Err(ErrorResponse::of(StatusCode::BAD_REQUEST, "Title is required"));
    }

    let db = require_db()?;
    let content = request.content.unwrap_or_default();

    match db.insert_document(&request.title, &content, user.id).await {
        Ok(doc) => {
            info!("Document {} created by {}", doc.id, user.id);
            Ok((StatusCode::CREATED, Json(doc)))
        }
        Err(e) => {
            error!("Failed to create document for {}: {}", user.id, e);
            Err(ErrorResponse::of(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to create document",
            ))
        }
    }
}

/// List documents the caller owns or collaborates on
pub async fn list_documents(
    Extension(user): Extension<CurrentUser>,
) -> Result<Json<Vec<DocumentRecord>>, HandlerError> {
    let db = require_db()?;

    match db.list_documents_for_user(user.id).await {
        Ok(docs) => Ok(Json(docs)),
        Err(e) => {
            error!("Failed to list documents for {}: {}", user.id, e);
            Err(ErrorResponse::of(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to fetch documents",
            ))
        }
    }
}

/// Fetch a single document, owner or collaborator only
pub async fn get_document(
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<String>,
) -> Result<Json<DocumentRecord>, HandlerError> {
    let doc_uuid = parse_doc_id(&id)?;
    let db = require_db()?;
    let doc = fetch_document(&db, doc_uuid).await?;

    if !doc.can_view(user.id) {
        warn!("User {} denied view on document {}", user.id, doc.id);
        return Err(ErrorResponse::of(StatusCode::FORBIDDEN, "Access denied"));
    }

    Ok(Json(doc))
}

/// Replace a document's content, owner or editor only
pub async fn update_document(
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<String>,
    Json(request): Json<UpdateDocumentRequest>,
) -> Result<Json<DocumentRecord>, HandlerError> {
    let doc_uuid = parse_doc_id(&id)?;
    let db = require_db()?;
    let doc = fetch_document(&db, doc_uuid).await?;

    if !doc.can_edit(user.id) {
        warn!("User {} denied edit on document {}", user.id, doc.id);
        return Err(ErrorResponse::of(StatusCode::FORBIDDEN, "Permission denied"));
    }

    // Absent content keeps the current text
    let content = request.content.unwrap_or_else(|| doc.content.clone());

    if let Err(e) = db.update_document_content(doc_uuid, &content).await {
        error!("Failed to update document {}: {}", doc_uuid, e);
        return Err(ErrorResponse::of(
            StatusCode::INTERNAL_SERVER_ERROR,
            "Failed to update document",
        ));
    }

    let updated = fetch_document(&db, doc_uuid).await?;
    info!("Document {} updated by {}", doc_uuid, user.id);
    Ok(Json(updated))
}

/// Delete a document, owner only
pub async fn delete_document(
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<String>,
) -> Result<Json<MessageResponse>, HandlerError> {
    let doc_uuid = parse_doc_id(&id)?;
    let db = require_db()?;
    let doc = fetch_document(&db, doc_uuid).await?;

    if !doc.is_owner(user.id) {
        warn!("User {} denied delete on document {}", user.id, doc.id);
        return Err(ErrorResponse::of(
            StatusCode::FORBIDDEN,
            "Only the owner can delete a document",
        ));
    }

    match db.delete_document(doc_uuid).await {
        Ok(true) => {
            info!("Document {} deleted by {}", doc_uuid, user.id);
            Ok(Json(MessageResponse {
                message: "Document deleted".to_string(),
            }))
        }
        Ok(false) => Err(ErrorResponse::of(StatusCode::NOT_FOUND, "Document not found")),
        Err(e) => {
            error!("Failed to delete document {}: {}", doc_uuid, e);
            Err(ErrorResponse::of(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to delete document",
            ))
        }
    }
}

/// Add a collaborator by email, owner only
pub async fn share_document(
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<String>,
    Json(request): Json<ShareRequest>,
) -> Result<Json<ShareResponse>, HandlerError> {
    let doc_uuid = parse_doc_id(&id)?;
    let db = require_db()?;
    let doc = fetch_document(&db, doc_uuid).await?;

    if !doc.is_owner(user.id) {
        warn!("User {} denied share on document {}", user.id, doc.id);
        return Err(ErrorResponse::of(
            StatusCode::FORBIDDEN,
            "Only the owner can share a document",
        ));
    }

    let target = match db.find_user_by_email(&request.email).await {
        Ok(Some(target)) => target,
        Ok(None) => {
            return Err(ErrorResponse::of(StatusCode::NOT_FOUND, "User not found"));
        }
        Err(e) => {
            error!("Failed to look up user {}: {}", request.email, e);
            return Err(ErrorResponse::of(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to add collaborator",
            ));
        }
    };

    if let Err(e) = db.add_collaborator(doc_uuid, target.id, request.role).await {
        error!("Failed to add collaborator to {}: {}", doc_uuid, e);
        return Err(ErrorResponse::of(
            StatusCode::INTERNAL_SERVER_ERROR,
            "Failed to add collaborator",
        ));
    }

    let document = fetch_document(&db, doc_uuid).await?;
    Ok(Json(ShareResponse {
        message: "User added as collaborator".to_string(),
        document,
    }))
}

fn parse_doc_id(id: &str) -> Result<Uuid, HandlerError> {
    Uuid::parse_str(id).map_err(|e| {
        error!("Invalid document UUID '{}': {}", id, e);
        ErrorResponse::of(
            StatusCode::BAD_REQUEST,
            format!("Invalid document id '{}'", id),
        )
    })
}

fn require_db() -> Result<Arc<DbDocs>, HandlerError> {
    dbdocs::get_db().ok_or_else(|| {
        error!("Database not initialized");
        ErrorResponse::of(StatusCode::SERVICE_UNAVAILABLE, "Database not available")
    })
}

async fn fetch_document(db: &DbDocs, id: Uuid) -> Result<DocumentRecord, HandlerError> {
    match db.get_document(id).await {
        Ok(Some(doc)) => Ok(doc),
        Ok(None) => Err(ErrorResponse::of(StatusCode::NOT_FOUND, "Document not found")),
        Err(e) => {
            error!("Failed to load document {}: {}", id, e);
            Err(ErrorResponse::of(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to load document",
            ))
        }
    }
}
