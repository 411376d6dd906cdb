use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

/// Collaborator role on a document
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Owner,
    Editor,
    Viewer,
}

impl Role {
    /// Whether this role may replace document content
    pub fn can_edit(self) -> bool {
        matches!(self, Role::Owner | Role::Editor)
    }

    /// Database column value for this role
    pub fn as_str(self) -> &'static str {
        match self {
            Role::Owner => "owner",
            Role::Editor => "editor",
            Role::Viewer => "viewer",
        }
    }
}

/// Collaborator entry aggregated onto a document row
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CollaboratorEntry {
    pub user: Uuid,
    pub role: Role,
}

/// Document with owner and collaborator list
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct DocumentRecord {
    pub id: Uuid,
    pub title: String,
    pub content: String,
    pub owner: Uuid,
    pub collaborators: Vec<CollaboratorEntry>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl DocumentRecord {
    /// Effective role of a user on this document. Ownership wins over any
    /// collaborator entry.
    pub fn role_of(&self, user_id: Uuid) -> Option<Role> {
        if self.owner == user_id {
            return Some(Role::Owner);
        }
        self.collaborators
            .iter()
            .find(|c| c.user == user_id)
            .map(|c| c.role)
    }

    pub fn can_view(&self, user_id: Uuid) -> bool {
        self.role_of(user_id).is_some()
    }

    pub fn can_edit(&self, user_id: Uuid) -> bool {
        self.role_of(user_id).map_or(false, Role::can_edit)
    }

    pub fn is_owner(&self, user_id: Uuid) -> bool {
        self.owner == user_id
    }
}

/// Request body for creating a document
#[derive(Deserialize, Debug, ToSchema)]
pub struct CreateDocumentRequest {
    pub title: String,
    pub content: Option<String>,
}

/// Request body for replacing document content
#[derive(Deserialize, Debug, ToSchema)]
pub struct UpdateDocumentRequest {
    pub content: Option<String>,
}

/// Request body for adding a collaborator
#[derive(Deserialize, Debug, ToSchema)]
pub struct ShareRequest {
    pub email: String,
    pub role: Role,
}

/// Response carrying only a confirmation message
#[derive(Serialize, Deserialize, Debug, ToSchema)]
pub struct MessageResponse {
    pub message: String,
}

/// Response after adding a collaborator
#[derive(Serialize, Deserialize, Debug, ToSchema)]
pub struct ShareResponse {
    pub message: String,
    pub document: DocumentRecord,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(owner: Uuid, collaborators: Vec<CollaboratorEntry>) -> DocumentRecord {
        DocumentRecord {
            id: Uuid::new_v4(),
            title: "notes".to_string(),
            content: String::new(),
            owner,
            collaborators,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn owner_has_full_access() {
        let owner = Uuid::new_v4();
        let doc = record(owner, vec![]);
        assert_eq!(doc.role_of(owner), Some(Role::Owner));
        assert!(doc.can_view(owner));
        assert!(doc.can_edit(owner));
        assert!(doc.is_owner(owner));
    }

    #[test]
    fn editor_can_edit_but_does_not_own() {
        let owner = Uuid::new_v4();
        let editor = Uuid::new_v4();
        let doc = record(
            owner,
            vec![CollaboratorEntry {
                user: editor,
                role: Role::Editor,
            }],
        );
        assert!(doc.can_view(editor));
        assert!(doc.can_edit(editor));
        assert!(!doc.is_owner(editor));
    }

    #[test]
    fn viewer_cannot_edit() {
        let owner = Uuid::new_v4();
        let viewer = Uuid::new_v4();
        let doc = record(
            owner,
            vec![CollaboratorEntry {
                user: viewer,
                role: Role::Viewer,
            }],
        );
        assert!(doc.can_view(viewer));
        assert!(!doc.can_edit(viewer));
    }

    #[test]
    fn stranger_has_no_access() {
        let doc = record(Uuid::new_v4(), vec![]);
        let stranger = Uuid::new_v4();
        assert_eq!(doc.role_of(stranger), None);
        assert!(!doc.can_view(stranger));
        assert!(!doc.can_edit(stranger));
    }

    #[test]
    fn ownership_wins_over_collaborator_entry() {
        let owner = Uuid::new_v4();
        // An owner also listed as viewer must still edit
        let doc = record(
            owner,
            vec![CollaboratorEntry {
                user: owner,
                role: Role::Viewer,
            }],
        );
        assert_eq!(doc.role_of(owner), Some(Role::Owner));
        assert!(doc.can_edit(owner));
    }

    #[test]
    fn role_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&Role::Editor).unwrap(), "\"editor\"");
        let role: Role = serde_json::from_str("\"viewer\"").unwrap();
        assert_eq!(role, Role::Viewer);
    }
}
