//! Todo types: the unit of work whose completion drives the game.
//!
//! A todo is either open or completed. Completion is the only transition
//! with side effects (rewards), and those are applied by
//! [`crate::service::MiningGame`], not here; this module only decides
//! *whether* a patch completes a todo.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::ValidationError;

/// Todo priority. Determines the base coin and experience rewards.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
}

impl Priority {
    pub const ALL: [Priority; 3] = [Priority::Low, Priority::Medium, Priority::High];

    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::Low => "low",
            Priority::Medium => "medium",
            Priority::High => "high",
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Priority {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "low" => Ok(Priority::Low),
            "medium" => Ok(Priority::Medium),
            "high" => Ok(Priority::High),
            other => Err(ValidationError::InvalidValue {
                field: "priority".into(),
                message: format!("expected low, medium or high, got '{other}'"),
            }),
        }
    }
}

/// Category of a todo, for grouping in the list.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "lowercase")]
pub enum TodoCategory {
    Work,
    Personal,
    Health,
    Learning,
    #[default]
    Other,
}

impl TodoCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            TodoCategory::Work => "work",
            TodoCategory::Personal => "personal",
            TodoCategory::Health => "health",
            TodoCategory::Learning => "learning",
            TodoCategory::Other => "other",
        }
    }
}

impl fmt::Display for TodoCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TodoCategory {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "work" => Ok(TodoCategory::Work),
            "personal" => Ok(TodoCategory::Personal),
            "health" => Ok(TodoCategory::Health),
            "learning" => Ok(TodoCategory::Learning),
            "other" => Ok(TodoCategory::Other),
            other => Err(ValidationError::InvalidValue {
                field: "category".into(),
                message: format!(
                    "expected work, personal, health, learning or other, got '{other}'"
                ),
            }),
        }
    }
}

/// A tracked todo.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Todo {
    /// Unique identifier (UUID v4)
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub priority: Priority,
    pub category: TodoCategory,
    #[serde(default)]
    pub completed: bool,
    pub created_at: DateTime<Utc>,
    /// Set when the todo transitions to completed, cleared when reopened.
    pub completed_at: Option<DateTime<Utc>>,
}

/// Payload for creating a todo.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct NewTodo {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub priority: Priority,
    #[serde(default)]
    pub category: TodoCategory,
}

impl NewTodo {
    pub fn new(title: impl Into<String>) -> Self {
        NewTodo {
            title: title.into(),
            ..Default::default()
        }
    }

    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_category(mut self, category: TodoCategory) -> Self {
        self.category = category;
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Validate and turn into a fresh, open todo.
    pub fn into_todo(self) -> Result<Todo, ValidationError> {
        let title = self.title.trim();
        if title.is_empty() {
            return Err(ValidationError::Empty {
                field: "title".into(),
            });
        }
        Ok(Todo {
            id: uuid::Uuid::new_v4().to_string(),
            title: title.to_string(),
            description: self.description.unwrap_or_default(),
            priority: self.priority,
            category: self.category,
            completed: false,
            created_at: Utc::now(),
            completed_at: None,
        })
    }
}

/// Partial update. Absent fields are left untouched.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct TodoPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<Priority>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<TodoCategory>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed: Option<bool>,
}

impl TodoPatch {
    pub fn complete() -> Self {
        TodoPatch {
            completed: Some(true),
            ..Default::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == TodoPatch::default()
    }
}

/// What applying a patch did to the completion flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompletionChange {
    /// Open -> completed. The caller awards rewards for this.
    Completed,
    /// Completed -> open.
    Reopened,
    Unchanged,
}

impl Todo {
    /// Apply a patch in place and report the completion transition.
    ///
    /// `now` stamps `completed_at` on completion.
    pub fn apply(
        &mut self,
        patch: &TodoPatch,
        now: DateTime<Utc>,
    ) -> Result<CompletionChange, ValidationError> {
        if let Some(title) = &patch.title {
            let title = title.trim();
            if title.is_empty() {
                return Err(ValidationError::Empty {
                    field: "title".into(),
                });
            }
            self.title = title.to_string();
        }
        if let Some(description) = &patch.description {
            self.description = description.clone();
        }
        if let Some(priority) = patch.priority {
            self.priority = priority;
        }
        if let Some(category) = patch.category {
            self.category = category;
        }

        let change = match (self.completed, patch.completed) {
            (false, Some(true)) => {
                self.completed = true;
                self.completed_at = Some(now);
                CompletionChange::Completed
            }
            (true, Some(false)) => {
                self.completed = false;
                self.completed_at = None;
                CompletionChange::Reopened
            }
            _ => CompletionChange::Unchanged,
        };
        Ok(change)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn open_todo() -> Todo {
        NewTodo::new("Dig tunnel")
            .with_priority(Priority::High)
            .into_todo()
            .unwrap()
    }

    #[test]
    fn new_todo_defaults() {
        let todo = NewTodo::new("  Water plants ").into_todo().unwrap();
        assert_eq!(todo.title, "Water plants");
        assert_eq!(todo.description, "");
        assert_eq!(todo.priority, Priority::Medium);
        assert_eq!(todo.category, TodoCategory::Other);
        assert!(!todo.completed);
        assert!(todo.completed_at.is_none());
        assert!(uuid::Uuid::parse_str(&todo.id).is_ok());
    }

    #[test]
    fn blank_title_is_rejected() {
        let err = NewTodo::new("   ").into_todo().unwrap_err();
        assert!(matches!(err, ValidationError::Empty { .. }));
    }

    #[test]
    fn completing_stamps_completed_at() {
        let mut todo = open_todo();
        let now = Utc::now();
        let change = todo.apply(&TodoPatch::complete(), now).unwrap();
        assert_eq!(change, CompletionChange::Completed);
        assert!(todo.completed);
        assert_eq!(todo.completed_at, Some(now));
    }

    #[test]
    fn completing_twice_is_unchanged() {
        let mut todo = open_todo();
        todo.apply(&TodoPatch::complete(), Utc::now()).unwrap();
        let change = todo.apply(&TodoPatch::complete(), Utc::now()).unwrap();
        assert_eq!(change, CompletionChange::Unchanged);
    }

    #[test]
    fn reopening_clears_completed_at() {
        let mut todo = open_todo();
        todo.apply(&TodoPatch::complete(), Utc::now()).unwrap();
        let patch = TodoPatch {
            completed: Some(false),
            ..Default::default()
        };
        assert_eq!(
            todo.apply(&patch, Utc::now()).unwrap(),
            CompletionChange::Reopened
        );
        assert!(!todo.completed);
        assert!(todo.completed_at.is_none());
    }

    #[test]
    fn absent_fields_are_untouched() {
        let mut todo = open_todo();
        let before = todo.clone();
        let patch = TodoPatch {
            category: Some(TodoCategory::Work),
            ..Default::default()
        };
        todo.apply(&patch, Utc::now()).unwrap();
        assert_eq!(todo.title, before.title);
        assert_eq!(todo.priority, Priority::High);
        assert_eq!(todo.category, TodoCategory::Work);
    }

    #[test]
    fn patch_with_blank_title_fails() {
        let mut todo = open_todo();
        let patch = TodoPatch {
            title: Some(" ".into()),
            ..Default::default()
        };
        assert!(todo.apply(&patch, Utc::now()).is_err());
        assert_eq!(todo.title, "Dig tunnel");
    }

    #[test]
    fn wire_format_is_lowercase() {
        let todo = open_todo();
        let json = serde_json::to_value(&todo).unwrap();
        assert_eq!(json["priority"], "high");
        assert_eq!(json["category"], "other");
        assert_eq!(json["completed"], false);
    }

    #[test]
    fn create_payload_accepts_minimal_json() {
        let new: NewTodo = serde_json::from_str(r#"{"title":"Read"}"#).unwrap();
        assert_eq!(new.priority, Priority::Medium);
        assert_eq!(new.category, TodoCategory::Other);
        assert!(new.description.is_none());
    }

    #[test]
    fn priority_parses_case_insensitively() {
        assert_eq!("HIGH".parse::<Priority>().unwrap(), Priority::High);
        assert!("urgent".parse::<Priority>().is_err());
        assert_eq!(
            "learning".parse::<TodoCategory>().unwrap(),
            TodoCategory::Learning
        );
    }
}
