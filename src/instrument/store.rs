//!
//! Sharded error statistics
//! ------------------------
//! Error counters are kept in five independently locked shards: per thread,
//! per account (user@host), per user, per host and global. Live threads record
//! into their own slot; when a thread disconnects its counters are folded into
//! a parent shard, and accounts/hosts fold upward when they are dropped.
//!
//! Fold rules (thread disconnect):
//! - user and host known: into the account
//! - user only: into the user and into global
//! - host only: into the host
//! - neither: into global
//!
//! Dropping an account folds into its user and its host; dropping a host folds
//! into global; dropping a user discards it. With these rules every recorded
//! occurrence is held by exactly one of {global, a host, an account, a thread},
//! which is what `VisitFlags::GLOBAL_BY_ERROR` visits.
//!
//! Readers take one shard lock at a time. A fan-out is therefore not an atomic
//! snapshot across shards: a fold racing with a visit may be seen twice or not
//! at all for that read. This is acceptable for monitoring data.

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, warn};

use super::catalog::ErrorCatalog;
use super::error_stat::ErrorStats;
use super::visitor::{ConnectionVisitor, VisitFlags};
use crate::config::PfsConfig;

pub type ThreadId = u64;

/// Shared handle passed to every table instance reading the store.
pub type SharedErrorStore = Arc<ErrorStore>;

#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AccountKey {
    pub user: String,
    pub host: String,
}

impl AccountKey {
    pub fn new<U: Into<String>, H: Into<String>>(user: U, host: H) -> Self {
        Self { user: user.into(), host: host.into() }
    }
}

/// A category of the key space; `items` bounds the item index.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorClass {
    pub index: u32,
    pub name: String,
    pub items: u32,
}

#[derive(Debug)]
struct ThreadSlot {
    user: Option<String>,
    host: Option<String>,
    stats: ErrorStats,
}

pub struct ErrorStore {
    classes: Vec<ErrorClass>,
    layout: Vec<usize>,
    catalog: Arc<ErrorCatalog>,
    threads: RwLock<BTreeMap<ThreadId, ThreadSlot>>,
    accounts: RwLock<BTreeMap<AccountKey, ErrorStats>>,
    users: RwLock<BTreeMap<String, ErrorStats>>,
    hosts: RwLock<BTreeMap<String, ErrorStats>>,
    global: RwLock<ErrorStats>,
}

impl ErrorStore {
    /// Classes are re-indexed by position so that `find_error_class(i)` is `classes[i]`.
    pub fn new(classes: Vec<ErrorClass>, catalog: Arc<ErrorCatalog>) -> Self {
        let classes: Vec<ErrorClass> = classes
            .into_iter()
            .enumerate()
            .map(|(i, c)| ErrorClass { index: i as u32, ..c })
            .collect();
        let layout: Vec<usize> = classes.iter().map(|c| c.items as usize).collect();
        let global = ErrorStats::with_layout(&layout);
        debug!(target: "perfschema::stats", "error store: classes={} layout={:?}", classes.len(), layout);
        Self {
            classes,
            layout,
            catalog,
            threads: RwLock::new(BTreeMap::new()),
            accounts: RwLock::new(BTreeMap::new()),
            users: RwLock::new(BTreeMap::new()),
            hosts: RwLock::new(BTreeMap::new()),
            global: RwLock::new(global),
        }
    }

    pub fn from_config(cfg: &PfsConfig) -> Self {
        Self::new(cfg.error_classes(), Arc::new(ErrorCatalog::builtin().clone()))
    }

    pub fn shared(self) -> SharedErrorStore { Arc::new(self) }

    pub fn classes(&self) -> &[ErrorClass] { &self.classes }

    pub fn find_error_class(&self, index: u32) -> Option<&ErrorClass> {
        self.classes.get(index as usize)
    }

    pub fn catalog(&self) -> &ErrorCatalog { &self.catalog }

    /// Upper bound on the number of (class, item) keys.
    pub fn key_space_len(&self) -> u64 {
        self.classes.iter().map(|c| u64::from(c.items)).sum()
    }

    fn fresh_stats(&self) -> ErrorStats { ErrorStats::with_layout(&self.layout) }

    // ---- connection lifecycle ----

    /// Start instrumenting a thread. Re-registering an id first disconnects the old slot.
    pub fn register_thread(&self, thread: ThreadId, user: Option<&str>, host: Option<&str>) {
        if self.threads.read().contains_key(&thread) {
            debug!(target: "perfschema::stats", "register_thread: thread={} already registered; disconnecting old slot", thread);
            self.disconnect_thread(thread);
        }
        if let Some(u) = user {
            self.users.write().entry(u.to_string()).or_insert_with(|| self.fresh_stats());
        }
        if let Some(h) = host {
            self.hosts.write().entry(h.to_string()).or_insert_with(|| self.fresh_stats());
        }
        if let (Some(u), Some(h)) = (user, host) {
            self.accounts.write().entry(AccountKey::new(u, h)).or_insert_with(|| self.fresh_stats());
        }
        let slot = ThreadSlot {
            user: user.map(str::to_string),
            host: host.map(str::to_string),
            stats: self.fresh_stats(),
        };
        self.threads.write().insert(thread, slot);
    }

    /// Stop instrumenting a thread and fold its counters into its parent shard.
    /// Returns false if the thread was not registered.
    pub fn disconnect_thread(&self, thread: ThreadId) -> bool {
        let Some(slot) = self.threads.write().remove(&thread) else {
            return false;
        };
        debug!(target: "perfschema::stats", "disconnect_thread: thread={} user={:?} host={:?} events={}", thread, slot.user, slot.host, slot.stats.total_count());
        match (slot.user, slot.host) {
            (Some(user), Some(host)) => {
                let key = AccountKey::new(user, host);
                self.accounts.write().entry(key).or_insert_with(|| self.fresh_stats()).aggregate(&slot.stats);
            }
            (Some(user), None) => {
                self.users.write().entry(user).or_insert_with(|| self.fresh_stats()).aggregate(&slot.stats);
                self.global.write().aggregate(&slot.stats);
            }
            (None, Some(host)) => {
                self.hosts.write().entry(host).or_insert_with(|| self.fresh_stats()).aggregate(&slot.stats);
            }
            (None, None) => self.global.write().aggregate(&slot.stats),
        }
        true
    }

    /// Drop an account, folding its counters into its user and its host.
    pub fn drop_account(&self, user: &str, host: &str) -> bool {
        let key = AccountKey::new(user, host);
        let Some(stats) = self.accounts.write().remove(&key) else {
            return false;
        };
        self.users.write().entry(user.to_string()).or_insert_with(|| self.fresh_stats()).aggregate(&stats);
        self.hosts.write().entry(host.to_string()).or_insert_with(|| self.fresh_stats()).aggregate(&stats);
        true
    }

    /// Drop a host, folding its counters into global.
    pub fn drop_host(&self, host: &str) -> bool {
        let Some(stats) = self.hosts.write().remove(host) else {
            return false;
        };
        self.global.write().aggregate(&stats);
        true
    }

    /// Drop a user. User counters are duplicated in hosts or global, so they are discarded.
    pub fn drop_user(&self, user: &str) -> bool {
        self.users.write().remove(user).is_some()
    }

    // ---- recording ----

    pub fn record_error(&self, thread: ThreadId, class: u32, item: usize, handled: bool) {
        let now = chrono::Utc::now().timestamp_micros().max(1) as u64;
        self.record_error_at(thread, class, item, handled, now);
    }

    /// Record one occurrence at `now_us`. Items outside the class bound are
    /// accounted in slot 0; unregistered threads record into global.
    pub fn record_error_at(&self, thread: ThreadId, class: u32, item: usize, handled: bool, now_us: u64) {
        let Some(klass) = self.find_error_class(class) else {
            warn!(target: "perfschema::stats", "record_error: unknown error class {}", class);
            return;
        };
        if klass.items == 0 {
            return;
        }
        let item = if item < klass.items as usize { item } else { 0 };
        let class = class as usize;

        if let Some(slot) = self.threads.write().get_mut(&thread) {
            if let Some(stat) = slot.stats.stat_mut(class, item) {
                stat.record(now_us, handled);
            }
            return;
        }
        if let Some(stat) = self.global.write().stat_mut(class, item) {
            stat.record(now_us, handled);
        }
    }

    /// Record a server error by number into class 0.
    pub fn record_error_number(&self, thread: ThreadId, number: u32, handled: bool) {
        let item = self.catalog.index_of(number).unwrap_or(0);
        self.record_error(thread, 0, item, handled);
    }

    // ---- fan-out read ----

    pub fn visit_global(&self, flags: VisitFlags, visitor: &mut dyn ConnectionVisitor) {
        visitor.visit_global(&self.global.read());
        if flags.hosts {
            for (host, stats) in self.hosts.read().iter() {
                visitor.visit_host(host, stats);
            }
        }
        if flags.users {
            for (user, stats) in self.users.read().iter() {
                visitor.visit_user(user, stats);
            }
        }
        if flags.accounts {
            for (key, stats) in self.accounts.read().iter() {
                visitor.visit_account(key, stats);
            }
        }
        if flags.threads {
            for (id, slot) in self.threads.read().iter() {
                visitor.visit_thread(*id, &slot.stats);
            }
        }
        // no session shard: sessions are threads seen through a client handle
    }

    // ---- reset ----

    pub fn reset_threads(&self) {
        self.threads.write().values_mut().for_each(|s| s.stats.reset());
    }

    pub fn reset_accounts(&self) {
        self.accounts.write().values_mut().for_each(ErrorStats::reset);
    }

    pub fn reset_users(&self) {
        self.users.write().values_mut().for_each(ErrorStats::reset);
    }

    pub fn reset_hosts(&self) {
        self.hosts.write().values_mut().for_each(ErrorStats::reset);
    }

    pub fn reset_global(&self) {
        self.global.write().reset();
    }

    /// Best-effort reset of every shard. Races with concurrent recorders are not excluded.
    pub fn reset_all(&self) {
        self.reset_threads();
        self.reset_accounts();
        self.reset_users();
        self.reset_hosts();
        self.reset_global();
        debug!(target: "perfschema::stats", "reset_all: all error shards cleared");
    }

    pub fn thread_count(&self) -> usize { self.threads.read().len() }
    pub fn account_count(&self) -> usize { self.accounts.read().len() }
}

#[cfg(test)]
#[path = "store_tests.rs"]
mod store_tests;
