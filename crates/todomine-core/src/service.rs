//! The game service: every user-facing operation in one place.
//!
//! Both the CLI and the HTTP server are thin layers over [`MiningGame`].
//! Each operation loads what it needs, applies the pure rules from
//! [`crate::game`] / [`crate::todo`], persists inside one transaction and
//! queues [`Event`]s for clients to poll.

use chrono::{DateTime, Utc};
use std::collections::VecDeque;
use tracing::{debug, info};

use crate::error::{CoreError, Result};
use crate::events::Event;
use crate::game::{
    achievements, upgrades, AchievementStatus, AutoMineOutcome, GameRules, GameStats,
    PurchaseReceipt, StatsPatch, Upgrade, DEFAULT_USER,
};
use crate::storage::{Config, Database};
use crate::todo::{CompletionChange, NewTodo, Todo, TodoPatch};

/// Events kept for polling; older ones are dropped first.
const EVENT_BACKLOG: usize = 256;

pub struct MiningGame {
    db: Database,
    rules: GameRules,
    user_id: String,
    events: VecDeque<Event>,
}

impl MiningGame {
    pub fn new(db: Database, rules: GameRules) -> Self {
        Self {
            db,
            rules,
            user_id: DEFAULT_USER.to_string(),
            events: VecDeque::new(),
        }
    }

    /// Open the on-disk database with rules taken from `config`.
    pub fn open(config: &Config) -> Result<Self> {
        Ok(Self::new(Database::open()?, config.game_rules()))
    }

    /// In-memory game with default rules.
    pub fn in_memory() -> Result<Self> {
        Ok(Self::new(Database::open_memory()?, GameRules::default()))
    }

    pub fn db(&self) -> &Database {
        &self.db
    }

    pub fn rules(&self) -> &GameRules {
        &self.rules
    }

    // ── Todos ────────────────────────────────────────────────────────

    pub fn list_todos(&self) -> Result<Vec<Todo>> {
        Ok(self.db.list_todos()?)
    }

    pub fn get_todo(&self, id: &str) -> Result<Todo> {
        self.db
            .get_todo(id)?
            .ok_or_else(|| CoreError::not_found("Todo", id))
    }

    pub fn create_todo(&mut self, new: NewTodo) -> Result<Todo> {
        let todo = new.into_todo()?;
        self.db.insert_todo(&todo)?;
        debug!(todo_id = %todo.id, priority = %todo.priority, "todo created");
        self.push_event(Event::TodoCreated {
            todo_id: todo.id.clone(),
            title: todo.title.clone(),
            at: todo.created_at,
        });
        Ok(todo)
    }

    /// Apply a partial update. Completing an open todo awards rewards based
    /// on the priority it had before this patch.
    pub fn update_todo(&mut self, id: &str, patch: &TodoPatch) -> Result<Todo> {
        let now = Utc::now();
        let rules = self.rules;
        let user_id = self.user_id.clone();

        let (todo, events) = self.db.transaction(|db| {
            let mut todo = db
                .get_todo(id)?
                .ok_or_else(|| CoreError::not_found("Todo", id))?;
            let reward_priority = todo.priority;
            let change = todo.apply(patch, now)?;
            db.update_todo(&todo)?;

            let mut events = Vec::new();
            match change {
                CompletionChange::Completed => {
                    let mut stats = load_or_init_stats(db, &user_id, now)?;
                    let reward = stats.award_completion(reward_priority, &rules, now);
                    db.save_stats(&stats)?;
                    info!(
                        todo_id = %todo.id,
                        coins = reward.coins,
                        streak = reward.current_streak,
                        level = reward.new_level,
                        "todo completed"
                    );
                    events.push(Event::TodoCompleted {
                        todo_id: todo.id.clone(),
                        priority: reward_priority,
                        reward,
                        at: now,
                    });
                    events.extend(unlock_achievements(db, &user_id, &stats, now)?);
                }
                CompletionChange::Reopened => {
                    debug!(todo_id = %todo.id, "todo reopened");
                    events.push(Event::TodoReopened {
                        todo_id: todo.id.clone(),
                        at: now,
                    });
                }
                CompletionChange::Unchanged => {}
            }
            Ok((todo, events))
        })?;

        self.push_events(events);
        Ok(todo)
    }

    pub fn complete_todo(&mut self, id: &str) -> Result<Todo> {
        self.update_todo(id, &TodoPatch::complete())
    }

    pub fn delete_todo(&mut self, id: &str) -> Result<()> {
        if !self.db.delete_todo(id)? {
            return Err(CoreError::not_found("Todo", id));
        }
        debug!(todo_id = %id, "todo deleted");
        self.push_event(Event::TodoDeleted {
            todo_id: id.to_string(),
            at: Utc::now(),
        });
        Ok(())
    }

    // ── Stats ────────────────────────────────────────────────────────

    /// Current stats; the first call creates and stores the defaults.
    pub fn stats(&self) -> Result<GameStats> {
        load_or_init_stats(&self.db, &self.user_id, Utc::now())
    }

    pub fn update_stats(&mut self, patch: &StatsPatch) -> Result<GameStats> {
        self.mutate_stats(|stats, now| {
            stats.apply_patch(patch, now)?;
            Ok(Event::StatsEdited { at: now })
        })
        .map(|(stats, _)| stats)
    }

    // ── Upgrades ─────────────────────────────────────────────────────

    pub fn upgrades(&self) -> Result<Vec<Upgrade>> {
        Ok(upgrades::list(&self.stats()?))
    }

    pub fn purchase_upgrade(&mut self, upgrade_id: &str) -> Result<PurchaseReceipt> {
        let def = upgrades::find(upgrade_id)
            .ok_or_else(|| CoreError::not_found("Upgrade", upgrade_id))?;
        let (_, receipt) = self.mutate_stats(|stats, now| {
            let receipt = def.purchase(stats)?;
            stats.last_activity = now;
            Ok((
                Event::UpgradePurchased {
                    upgrade_id: def.id.to_string(),
                    cost: receipt.cost,
                    new_level: receipt.new_level,
                    at: now,
                },
                receipt,
            ))
        })?;
        info!(
            upgrade = def.id,
            cost = receipt.cost,
            level = receipt.new_level,
            "upgrade purchased"
        );
        Ok(receipt)
    }

    // ── Auto mining ──────────────────────────────────────────────────

    /// One auto-mine tick. A tick without auto miners writes nothing.
    pub fn auto_mine(&mut self) -> Result<AutoMineOutcome> {
        let current = self.stats()?;
        if current.auto_miners == 0 {
            return Ok(AutoMineOutcome {
                coins_earned: 0,
                new_total: current.coins,
            });
        }
        let (_, outcome) = self.mutate_stats(|stats, now| {
            let outcome = stats.auto_mine(now);
            Ok((
                Event::AutoMined {
                    coins_earned: outcome.coins_earned,
                    new_total: outcome.new_total,
                    at: now,
                },
                outcome,
            ))
        })?;
        debug!(coins = outcome.coins_earned, total = outcome.new_total, "auto mined");
        Ok(outcome)
    }

    // ── Achievements ─────────────────────────────────────────────────

    /// The whole catalog with unlock times.
    pub fn achievements(&self) -> Result<Vec<AchievementStatus>> {
        let unlocked = self.db.unlocked_achievements(&self.user_id)?;
        Ok(achievements::ACHIEVEMENTS
            .iter()
            .map(|a| AchievementStatus {
                achievement: *a,
                unlocked_at: unlocked
                    .iter()
                    .find(|(id, _)| *id == a.id)
                    .map(|(_, at)| *at),
            })
            .collect())
    }

    // ── Events ───────────────────────────────────────────────────────

    /// Take every queued event, oldest first.
    pub fn drain_events(&mut self) -> Vec<Event> {
        self.events.drain(..).collect()
    }

    pub fn pending_events(&self) -> usize {
        self.events.len()
    }

    // ── Internal ─────────────────────────────────────────────────────

    /// Load, mutate and save stats in one transaction, then check
    /// achievements. `f` returns the event describing the mutation plus a
    /// value for the caller; an error leaves everything untouched.
    fn mutate_stats<T, F>(&mut self, f: F) -> Result<(GameStats, T::Value)>
    where
        F: FnOnce(&mut GameStats, DateTime<Utc>) -> Result<T>,
        T: IntoMutation,
    {
        let now = Utc::now();
        let user_id = self.user_id.clone();
        let (stats, value, events) = self.db.transaction(|db| {
            let mut stats = load_or_init_stats(db, &user_id, now)?;
            let (event, value) = f(&mut stats, now)?.into_mutation();
            db.save_stats(&stats)?;
            let mut events = vec![event];
            events.extend(unlock_achievements(db, &user_id, &stats, now)?);
            Ok((stats, value, events))
        })?;
        self.push_events(events);
        Ok((stats, value))
    }

    fn push_event(&mut self, event: Event) {
        if self.events.len() == EVENT_BACKLOG {
            self.events.pop_front();
        }
        self.events.push_back(event);
    }

    fn push_events(&mut self, events: impl IntoIterator<Item = Event>) {
        for event in events {
            self.push_event(event);
        }
    }
}

/// Result of a stats mutation closure: the event plus an optional payload.
trait IntoMutation {
    type Value;
    fn into_mutation(self) -> (Event, Self::Value);
}

impl IntoMutation for Event {
    type Value = ();
    fn into_mutation(self) -> (Event, ()) {
        (self, ())
    }
}

impl<V> IntoMutation for (Event, V) {
    type Value = V;
    fn into_mutation(self) -> (Event, V) {
        self
    }
}

fn load_or_init_stats(db: &Database, user_id: &str, now: DateTime<Utc>) -> Result<GameStats> {
    if let Some(stats) = db.load_stats(user_id)? {
        return Ok(stats);
    }
    let mut stats = GameStats::new(now);
    stats.user_id = user_id.to_string();
    db.save_stats(&stats)?;
    debug!(user_id, "initialized game stats");
    Ok(stats)
}

fn unlock_achievements(
    db: &Database,
    user_id: &str,
    stats: &GameStats,
    now: DateTime<Utc>,
) -> Result<Vec<Event>> {
    let unlocked: Vec<_> = db
        .unlocked_achievements(user_id)?
        .into_iter()
        .map(|(id, _)| id)
        .collect();

    let mut events = Vec::new();
    for achievement in achievements::check(stats, &unlocked) {
        if db.record_achievement(user_id, achievement.id, now)? {
            info!(achievement = %achievement.id, "achievement unlocked");
            events.push(Event::AchievementUnlocked {
                achievement_id: achievement.id,
                name: achievement.name.to_string(),
                at: now,
            });
        }
    }
    Ok(events)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::AchievementId;
    use crate::todo::Priority;

    fn game() -> MiningGame {
        MiningGame::in_memory().unwrap()
    }

    fn add(game: &mut MiningGame, title: &str, priority: Priority) -> Todo {
        game.create_todo(NewTodo::new(title).with_priority(priority))
            .unwrap()
    }

    #[test]
    fn stats_are_created_on_first_access() {
        let game = game();
        let stats = game.stats().unwrap();
        assert_eq!(stats.level, 1);
        assert_eq!(stats.mining_power, 1);
        assert_eq!(stats.user_id, DEFAULT_USER);
        assert!(game.db().load_stats(DEFAULT_USER).unwrap().is_some());
    }

    #[test]
    fn completing_awards_coins_once() {
        let mut game = game();
        let todo = add(&mut game, "Haul ore", Priority::High);

        let done = game.complete_todo(&todo.id).unwrap();
        assert!(done.completed);
        assert_eq!(game.stats().unwrap().coins, 50);

        game.complete_todo(&todo.id).unwrap();
        assert_eq!(game.stats().unwrap().coins, 50);
        assert_eq!(game.stats().unwrap().total_todos_completed, 1);
    }

    #[test]
    fn reward_uses_priority_before_patch() {
        let mut game = game();
        let todo = add(&mut game, "Scout", Priority::Low);
        let patch = TodoPatch {
            priority: Some(Priority::High),
            completed: Some(true),
            ..Default::default()
        };
        let updated = game.update_todo(&todo.id, &patch).unwrap();
        assert_eq!(updated.priority, Priority::High);
        assert_eq!(game.stats().unwrap().coins, 10);
    }

    #[test]
    fn missing_todo_is_not_found() {
        let mut game = game();
        assert!(matches!(
            game.complete_todo("nope"),
            Err(CoreError::NotFound { kind: "Todo", .. })
        ));
        assert!(matches!(
            game.delete_todo("nope"),
            Err(CoreError::NotFound { .. })
        ));
        assert!(matches!(game.get_todo("nope"), Err(CoreError::NotFound { .. })));
    }

    #[test]
    fn first_completion_unlocks_achievement_and_emits_events() {
        let mut game = game();
        let todo = add(&mut game, "Begin", Priority::Medium);
        game.drain_events();

        game.complete_todo(&todo.id).unwrap();
        let events = game.drain_events();
        assert!(matches!(events[0], Event::TodoCompleted { .. }));
        assert!(matches!(
            events[1],
            Event::AchievementUnlocked {
                achievement_id: AchievementId::FirstTask,
                ..
            }
        ));
        assert_eq!(game.pending_events(), 0);

        let statuses = game.achievements().unwrap();
        let unlocked: Vec<_> = statuses
            .iter()
            .filter(|s| s.unlocked())
            .map(|s| s.achievement.id)
            .collect();
        assert_eq!(unlocked, vec![AchievementId::FirstTask]);
    }

    #[test]
    fn purchase_flow() {
        let mut game = game();
        let err = game.purchase_upgrade("mining_power").unwrap_err();
        assert_eq!(err.to_string(), "Not enough coins");

        game.update_stats(&StatsPatch {
            coins: Some(150),
            ..Default::default()
        })
        .unwrap();
        let receipt = game.purchase_upgrade("mining_power").unwrap();
        assert_eq!(receipt.cost, 100);
        assert_eq!(receipt.new_level, 1);

        let stats = game.stats().unwrap();
        assert_eq!(stats.coins, 50);
        assert_eq!(stats.mining_power, 2);

        let pickaxe = &game.upgrades().unwrap()[0];
        assert_eq!(pickaxe.current_level, 1);
        assert_eq!(pickaxe.cost, 200);

        assert!(matches!(
            game.purchase_upgrade("dynamite"),
            Err(CoreError::NotFound { kind: "Upgrade", .. })
        ));
    }

    #[test]
    fn failed_purchase_changes_nothing() {
        let mut game = game();
        game.update_stats(&StatsPatch {
            coins: Some(10),
            ..Default::default()
        })
        .unwrap();
        game.drain_events();
        let before = game.stats().unwrap();
        assert!(game.purchase_upgrade("efficiency").is_err());
        assert_eq!(game.stats().unwrap(), before);
        assert_eq!(game.pending_events(), 0);
    }

    #[test]
    fn auto_mine_without_miners_is_a_no_op() {
        let mut game = game();
        let before = game.stats().unwrap();
        let outcome = game.auto_mine().unwrap();
        assert_eq!(outcome.coins_earned, 0);
        assert_eq!(game.stats().unwrap(), before);
    }

    #[test]
    fn auto_miner_purchase_then_mining() {
        let mut game = game();
        game.update_stats(&StatsPatch {
            coins: Some(500),
            ..Default::default()
        })
        .unwrap();
        game.purchase_upgrade("auto_miner_1").unwrap();
        let outcome = game.auto_mine().unwrap();
        assert_eq!(outcome, AutoMineOutcome { coins_earned: 1, new_total: 1 });

        let ids: Vec<_> = game
            .drain_events()
            .into_iter()
            .filter_map(|e| match e {
                Event::AchievementUnlocked { achievement_id, .. } => Some(achievement_id),
                _ => None,
            })
            .collect();
        assert_eq!(ids, vec![AchievementId::AutomationMaster]);
    }

    #[test]
    fn rewards_cap_the_balance_at_max() {
        let mut game = game();
        game.update_stats(&StatsPatch {
            coins: Some(i64::MAX),
            auto_miners: Some(1),
            ..Default::default()
        })
        .unwrap();

        let todo = add(&mut game, "Overflow", Priority::High);
        game.complete_todo(&todo.id).unwrap();
        let stats = game.stats().unwrap();
        assert_eq!(stats.coins, i64::MAX);
        assert_eq!(stats.total_todos_completed, 1);

        let outcome = game.auto_mine().unwrap();
        assert_eq!(outcome.coins_earned, 0);
        assert_eq!(outcome.new_total, i64::MAX);
    }

    #[test]
    fn invalid_stats_patch_is_rejected() {
        let mut game = game();
        let err = game
            .update_stats(&StatsPatch {
                mining_power: Some(0),
                ..Default::default()
            })
            .unwrap_err();
        assert!(matches!(err, CoreError::Validation(_)));
    }

    #[test]
    fn event_backlog_is_bounded() {
        let mut game = game();
        for i in 0..(EVENT_BACKLOG + 10) {
            game.create_todo(NewTodo::new(format!("todo {i}"))).unwrap();
        }
        let events = game.drain_events();
        assert_eq!(events.len(), EVENT_BACKLOG);
        assert!(matches!(&events[0], Event::TodoCreated { title, .. } if title == "todo 10"));
    }
}
