//! # Todomine Core Library
//!
//! Business logic for Todomine, a todo list where finishing tasks mines
//! coins. The CLI and the HTTP server are thin layers over this crate.
//!
//! ## Architecture
//!
//! - **Todos**: validated creation and partial updates with completion tracking
//! - **Game**: coin rewards, levels, streaks, upgrades, auto mining, achievements
//! - **Mine**: a wall-clock scene state machine that the caller drives with `tick()`
//! - **Storage**: SQLite persistence and TOML configuration
//!
//! ## Key Components
//!
//! - [`MiningGame`]: every user-facing operation, transactional over [`Database`]
//! - [`MineScene`]: miners and ore carts for the animated view
//! - [`Config`]: Application configuration management

pub mod error;
pub mod events;
pub mod game;
pub mod mine;
pub mod service;
pub mod storage;
pub mod todo;

pub use error::{ConfigError, CoreError, DatabaseError, ValidationError};
pub use events::Event;
pub use game::{
    AchievementId, AchievementStatus, AutoMineOutcome, CompletionReward, GameRules, GameStats,
    PurchaseReceipt, StatsPatch, Upgrade,
};
pub use mine::{MineScene, MinerPhase, PhaseTimings, SceneEvent, SceneSnapshot};
pub use service::MiningGame;
pub use storage::{Config, Database};
pub use todo::{NewTodo, Priority, Todo, TodoCategory, TodoPatch};
