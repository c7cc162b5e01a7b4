use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Represents a todo item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Todo {
    /// The unique identifier for the todo.
    pub id: Uuid,
    /// What needs doing. Never blank.
    pub title: String,
    /// Whether the todo is done.
    pub completed: bool,
    /// The user who created the todo. Set once, never reassigned.
    pub owner_id: Uuid,
    /// The timestamp when the todo was created.
    pub created_at: DateTime<Utc>,
    /// The timestamp when the todo was last updated.
    pub updated_at: DateTime<Utc>,
}

impl Todo {
    pub fn new(title: String, owner_id: Uuid) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            title,
            completed: false,
            owner_id,
            created_at: now,
            updated_at: now,
        }
    }

    /// Applies the fields present in `patch`, leaving the rest untouched.
    pub fn apply(&mut self, patch: TodoPatch) {
        if let Some(title) = patch.title {
            self.title = title;
        }
        if let Some(completed) = patch.completed {
            self.completed = completed;
        }
        self.updated_at = Utc::now();
    }
}

/// A merge-patch for a todo: `None` means "leave as is".
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TodoPatch {
    pub title: Option<String>,
    pub completed: Option<bool>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn apply_only_touches_supplied_fields() {
        let mut todo = Todo::new("X".to_string(), Uuid::new_v4());

        todo.apply(TodoPatch {
            title: None,
            completed: Some(true),
        });
        assert_eq!(todo.title, "X");
        assert!(todo.completed);

        todo.apply(TodoPatch {
            title: Some("Y".to_string()),
            completed: None,
        });
        assert_eq!(todo.title, "Y");
        assert!(todo.completed);
    }

    #[test]
    fn serializes_owner_as_owner_id() {
        let owner = Uuid::new_v4();
        let todo = Todo::new("Buy milk".to_string(), owner);
        let json = sonic_rs::to_string(&todo).unwrap();
        assert!(json.contains(&format!(r#""ownerId":"{}""#, owner)));
        assert!(json.contains(r#""completed":false"#));
    }
}
