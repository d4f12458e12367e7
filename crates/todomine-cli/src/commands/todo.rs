use clap::Subcommand;
use todomine_core::{NewTodo, Priority, TodoCategory, TodoPatch};

use super::{open_game, print_events, print_json, CmdResult};

#[derive(Subcommand)]
pub enum TodoAction {
    /// Create a new todo
    Create {
        /// Todo title
        title: String,
        /// Longer description
        #[arg(long, short)]
        description: Option<String>,
        /// low, medium or high
        #[arg(long, short, default_value = "medium")]
        priority: Priority,
        /// work, personal, health, learning or other
        #[arg(long, short, default_value = "other")]
        category: TodoCategory,
    },
    /// List todos, oldest first
    List {
        /// Only show open todos
        #[arg(long)]
        open: bool,
    },
    /// Show a single todo
    Get {
        /// Todo ID
        id: String,
    },
    /// Update fields of a todo
    Update {
        /// Todo ID
        id: String,
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        description: Option<String>,
        #[arg(long)]
        priority: Option<Priority>,
        #[arg(long)]
        category: Option<TodoCategory>,
        /// Mark completed (true) or reopen (false)
        #[arg(long)]
        completed: Option<bool>,
    },
    /// Complete a todo and collect its coins
    Complete {
        /// Todo ID
        id: String,
    },
    /// Delete a todo
    Delete {
        /// Todo ID
        id: String,
    },
}

pub fn run(action: TodoAction) -> CmdResult {
    let mut game = open_game()?;

    match action {
        TodoAction::Create {
            title,
            description,
            priority,
            category,
        } => {
            let mut new = NewTodo::new(title)
                .with_priority(priority)
                .with_category(category);
            if let Some(description) = description {
                new = new.with_description(description);
            }
            let todo = game.create_todo(new)?;
            print_json(&todo)?;
        }
        TodoAction::List { open } => {
            let todos: Vec<_> = game
                .list_todos()?
                .into_iter()
                .filter(|t| !open || !t.completed)
                .collect();
            print_json(&todos)?;
        }
        TodoAction::Get { id } => {
            print_json(&game.get_todo(&id)?)?;
        }
        TodoAction::Update {
            id,
            title,
            description,
            priority,
            category,
            completed,
        } => {
            let patch = TodoPatch {
                title,
                description,
                priority,
                category,
                completed,
            };
            if patch.is_empty() {
                return Err("nothing to update".into());
            }
            let todo = game.update_todo(&id, &patch)?;
            print_json(&todo)?;
        }
        TodoAction::Complete { id } => {
            let todo = game.complete_todo(&id)?;
            print_json(&todo)?;
        }
        TodoAction::Delete { id } => {
            game.delete_todo(&id)?;
            print_json(&serde_json::json!({ "message": "Todo deleted successfully" }))?;
        }
    }

    print_events(&mut game)
}
