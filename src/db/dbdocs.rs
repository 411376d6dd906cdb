use async_trait::async_trait;
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::{Error as SqlxError, Row};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::OnceCell;
use tracing::{debug, info};
use uuid::Uuid;

use crate::models::{CollaboratorEntry, DocumentRecord, Role, UserRow};
use crate::ws::store::{ContentStore, StoreError};

// Global database instance
static DB: OnceCell<Arc<DbDocs>> = OnceCell::const_new();

/// Initialize the global database connection
///
/// # Arguments
/// * `database_url` - PostgreSQL connection string
pub async fn init_db(database_url: &str) -> Result<(), Box<dyn std::error::Error>> {
    let db = DbDocs::new(database_url).await?;
    DB.set(Arc::new(db))
        .map_err(|_| "Database already initialized")?;
    Ok(())
}

/// Get the global database instance
///
/// # Returns
/// * `Option<Arc<DbDocs>>` - Database instance if initialized
pub fn get_db() -> Option<Arc<DbDocs>> {
    DB.get().cloned()
}

/// Database connection pool
pub struct DbDocs {
    pool: PgPool,
}

impl DbDocs {
    /// Create a new database connection pool
    pub async fn new(database_url: &str) -> Result<Self, SqlxError> {
        info!("Connecting to database...");

        let pool = PgPoolOptions::new()
            .max_connections(20)
            .min_connections(2)
            .acquire_timeout(Duration::from_secs(30))
            .idle_timeout(Duration::from_secs(600)) // Close idle connections after 10 minutes
            .max_lifetime(Duration::from_secs(1800)) // Recycle connections after 30 minutes
            .connect(database_url)
            .await?;

        info!("Database connection pool created successfully");

        Ok(Self { pool })
    }

    /// Insert a new user with an already-hashed password
    pub async fn insert_user(
        &self,
        name: &str,
        email: &str,
        password_hash: &str,
    ) -> Result<UserRow, SqlxError> {
        let query_sql = r#"
            INSERT INTO users (id, name, email, password_hash, created_at, updated_at)
            VALUES ($1, $2, $3, $4, NOW(), NOW())
            RETURNING id, name, email, password_hash, created_at, updated_at;
        "#;

        let user = sqlx::query_as::<_, UserRow>(query_sql)
            .bind(Uuid::new_v4())
            .bind(name)
            .bind(email)
            .bind(password_hash)
            .fetch_one(&self.pool)
            .await?;

        info!("User created: {}", user.id);
        Ok(user)
    }

    /// Find a user by email
    pub async fn find_user_by_email(&self, email: &str) -> Result<Option<UserRow>, SqlxError> {
        let query_sql = r#"
            SELECT id, name, email, password_hash, created_at, updated_at
            FROM users
            WHERE email = $1;
        "#;

        sqlx::query_as::<_, UserRow>(query_sql)
            .bind(email)
            .fetch_optional(&self.pool)
            .await
    }

    /// Find a user by id
    pub async fn find_user_by_id(&self, id: Uuid) -> Result<Option<UserRow>, SqlxError> {
        let query_sql = r#"
            SELECT id, name, email, password_hash, created_at, updated_at
            FROM users
            WHERE id = $1;
        "#;

        sqlx::query_as::<_, UserRow>(query_sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
    }

    /// Insert a document owned by a user
    pub async fn insert_document(
        &self,
        title: &str,
        content: &str,
        owner: Uuid,
    ) -> Result<DocumentRecord, SqlxError> {
        let query_sql = r#"
            INSERT INTO documents (id, title, content, owner, created_at, updated_at)
            VALUES ($1, $2, $3, $4, NOW(), NOW())
            RETURNING id, title, content, owner, created_at, updated_at;
        "#;

        let row = sqlx::query(query_sql)
            .bind(Uuid::new_v4())
            .bind(title)
            .bind(content)
            .bind(owner)
            .fetch_one(&self.pool)
            .await?;

        let doc = DocumentRecord {
            id: row.try_get("id")?,
            title: row.try_get("title")?,
            content: row.try_get("content")?,
            owner: row.try_get("owner")?,
            collaborators: Vec::new(),
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        };

        info!("Document created: {}", doc.id);
        Ok(doc)
    }

    /// Load a document by id, with its collaborator list aggregated in
    pub async fn get_document(&self, id: Uuid) -> Result<Option<DocumentRecord>, SqlxError> {
        let query_sql = r#"
            SELECT
                d.id,
                d.title,
                d.content,
                d.owner,
                d.created_at,
                d.updated_at,
                COALESCE(
                    (SELECT json_agg(json_build_object('user', dc.user_id, 'role', dc.role))
                     FROM document_collaborators dc WHERE dc.document_id = d.id),
                    '[]'
                ) AS collaborators
            FROM documents d
            WHERE d.id = $1;
        "#;

        let row = sqlx::query(query_sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(row) => Ok(Some(row_to_document(&row)?)),
            None => Ok(None),
        }
    }

    /// List every document a user owns or collaborates on
    pub async fn list_documents_for_user(
        &self,
        user_id: Uuid,
    ) -> Result<Vec<DocumentRecord>, SqlxError> {
        let query_sql = r#"
            SELECT DISTINCT
                d.id,
                d.title,
                d.content,
                d.owner,
                d.created_at,
                d.updated_at,
                COALESCE(
                    (SELECT json_agg(json_build_object('user', c.user_id, 'role', c.role))
                     FROM document_collaborators c WHERE c.document_id = d.id),
                    '[]'
                ) AS collaborators
            FROM documents d
            LEFT JOIN document_collaborators dc ON d.id = dc.document_id
            WHERE d.owner = $1 OR dc.user_id = $1
            ORDER BY d.updated_at DESC;
        "#;

        let rows = sqlx::query(query_sql)
            .bind(user_id)
            .fetch_all(&self.pool)
            .await?;

        rows.iter().map(row_to_document).collect()
    }

    /// Replace a document's content
    ///
    /// # Returns
    /// * `Result<u64, SqlxError>` - Number of rows updated (0 when the
    ///   document does not exist)
    pub async fn update_document_content(
        &self,
        id: Uuid,
        content: &str,
    ) -> Result<u64, SqlxError> {
        let query_sql = r#"
            UPDATE documents
            SET content = $2,
                updated_at = NOW()
            WHERE id = $1;
        "#;

        let result = sqlx::query(query_sql)
            .bind(id)
            .bind(content)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected())
    }

    /// Delete a document and its collaborator entries
    pub async fn delete_document(&self, id: Uuid) -> Result<bool, SqlxError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM document_collaborators WHERE document_id = $1;")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        let result = sqlx::query("DELETE FROM documents WHERE id = $1;")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        Ok(result.rows_affected() > 0)
    }

    /// Add a collaborator with a role to a document
    pub async fn add_collaborator(
        &self,
        document_id: Uuid,
        user_id: Uuid,
        role: Role,
    ) -> Result<(), SqlxError> {
        let query_sql = r#"
            INSERT INTO document_collaborators (document_id, user_id, role)
            VALUES ($1, $2, $3);
        "#;

        sqlx::query(query_sql)
            .bind(document_id)
            .bind(user_id)
            .bind(role.as_str())
            .execute(&self.pool)
            .await?;

        info!("Collaborator {} added to document {} as {}", user_id, document_id, role.as_str());
        Ok(())
    }

    /// Read just the content cell of a document
    pub async fn read_content(&self, id: Uuid) -> Result<Option<String>, SqlxError> {
        let row = sqlx::query("SELECT content FROM documents WHERE id = $1;")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(row) => Ok(Some(row.try_get("content")?)),
            None => Ok(None),
        }
    }

    /// Overwrite the content cell of a document
    ///
    /// Last write wins: no version check, the most recently committed update
    /// determines the stored value.
    pub async fn write_content(&self, id: Uuid, content: &str) -> Result<u64, SqlxError> {
        let result = sqlx::query(
            "UPDATE documents SET content = $2, updated_at = NOW() WHERE id = $1;",
        )
        .bind(id)
        .bind(content)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }
}

fn row_to_document(row: &sqlx::postgres::PgRow) -> Result<DocumentRecord, SqlxError> {
    // Deserialize the aggregated collaborator list
    let collaborators: Vec<CollaboratorEntry> =
        serde_json::from_value(row.try_get("collaborators")?)
            .map_err(|e| SqlxError::Decode(Box::new(e)))?;

    Ok(DocumentRecord {
        id: row.try_get("id")?,
        title: row.try_get("title")?,
        content: row.try_get("content")?,
        owner: row.try_get("owner")?,
        collaborators,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

/// Hub-facing adapter over the global database handle.
///
/// Resolves the pool per call so the hub keeps running (in degraded,
/// nothing-persisted mode) when no database URL was configured.
pub struct DbContentStore;

#[async_trait]
impl ContentStore for DbContentStore {
    async fn read(&self, document_id: &str) -> Result<Option<String>, StoreError> {
        let db = get_db().ok_or(StoreError::Unavailable)?;
        let doc_uuid = Uuid::parse_str(document_id)
            .map_err(|_| StoreError::InvalidId(document_id.to_string()))?;

        db.read_content(doc_uuid)
            .await
            .map_err(|e| StoreError::Database(e.to_string()))
    }

    async fn write(&self, document_id: &str, content: &str) -> Result<(), StoreError> {
        let db = get_db().ok_or(StoreError::Unavailable)?;
        let doc_uuid = Uuid::parse_str(document_id)
            .map_err(|_| StoreError::InvalidId(document_id.to_string()))?;

        let rows = db
            .write_content(doc_uuid, content)
            .await
            .map_err(|e| StoreError::Database(e.to_string()))?;

        if rows == 0 {
            // No document record to update; the change stays live-only.
            debug!("No stored document {}, content write skipped", document_id);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn content_store_reports_unavailable_without_init() {
        // The global pool is never initialized in unit tests.
        let store = DbContentStore;
        match store.read("0c9d7a4e-6f7f-4b1a-9f8e-2d3c4b5a6978").await {
            Err(StoreError::Unavailable) => {}
            other => panic!("expected Unavailable, got {:?}", other),
        }
    }
}
