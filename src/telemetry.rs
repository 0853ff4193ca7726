use parking_lot::RwLock;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

/// In-memory counters for the refresh pipeline. Cheap to clone; clones share state.
#[derive(Clone, Default)]
pub struct Telemetry {
    shared: Arc<RwLock<TelemetryData>>,
}

impl Telemetry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_strategy_attempt(&self, strategy: &str, succeeded: bool) {
        let mut guard = self.shared.write();
        let stats = guard
            .strategies
            .entry(strategy.to_string())
            .or_insert_with(StrategyStats::default);
        stats.attempts = stats.attempts.saturating_add(1);
        if succeeded {
            stats.successes = stats.successes.saturating_add(1);
        } else {
            stats.failures = stats.failures.saturating_add(1);
        }
    }

    pub fn record_load(&self, outcome: LoadKind, entry_count: usize) {
        let now = now_ts();
        let mut guard = self.shared.write();
        match outcome {
            LoadKind::Loaded => {
                guard.loads = guard.loads.saturating_add(1);
                guard.last_entry_count = entry_count;
                guard.last_load_ts = Some(now);
            }
            LoadKind::Failed => guard.load_failures = guard.load_failures.saturating_add(1),
            LoadKind::Skipped => guard.skipped_loads = guard.skipped_loads.saturating_add(1),
        }
    }

    pub fn record_search_commit(&self) {
        let mut guard = self.shared.write();
        guard.search_commits = guard.search_commits.saturating_add(1);
    }

    pub fn record_copy(&self, succeeded: bool) {
        let mut guard = self.shared.write();
        if succeeded {
            guard.copies = guard.copies.saturating_add(1);
        } else {
            guard.copy_failures = guard.copy_failures.saturating_add(1);
        }
    }

    pub fn snapshot(&self) -> TelemetrySnapshot {
        let guard = self.shared.read();
        let mut strategies: Vec<_> = guard
            .strategies
            .iter()
            .map(|(name, stats)| StrategySnapshot {
                strategy: name.clone(),
                attempts: stats.attempts,
                successes: stats.successes,
                failures: stats.failures,
            })
            .collect();
        strategies.sort_by(|a, b| a.strategy.cmp(&b.strategy));
        TelemetrySnapshot {
            captured_at: now_ts(),
            loads: guard.loads,
            load_failures: guard.load_failures,
            skipped_loads: guard.skipped_loads,
            last_entry_count: guard.last_entry_count,
            last_load_ts: guard.last_load_ts,
            search_commits: guard.search_commits,
            copies: guard.copies,
            copy_failures: guard.copy_failures,
            strategies,
        }
    }
}

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum LoadKind {
    Loaded,
    Failed,
    Skipped,
}

#[derive(Default)]
struct TelemetryData {
    strategies: HashMap<String, StrategyStats>,
    loads: u64,
    load_failures: u64,
    skipped_loads: u64,
    last_entry_count: usize,
    last_load_ts: Option<u64>,
    search_commits: u64,
    copies: u64,
    copy_failures: u64,
}

#[derive(Default, Clone)]
struct StrategyStats {
    attempts: u64,
    successes: u64,
    failures: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct StrategySnapshot {
    pub strategy: String,
    pub attempts: u64,
    pub successes: u64,
    pub failures: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct TelemetrySnapshot {
    pub captured_at: u64,
    pub loads: u64,
    pub load_failures: u64,
    pub skipped_loads: u64,
    pub last_entry_count: usize,
    pub last_load_ts: Option<u64>,
    pub search_commits: u64,
    pub copies: u64,
    pub copy_failures: u64,
    pub strategies: Vec<StrategySnapshot>,
}

fn now_ts() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default()
}
