use super::error_stat::{ErrorStat, ErrorStats};
use super::store::{AccountKey, ErrorClass, ThreadId};

/// Which shard dimensions take part in a `visit_global` fan-out.
/// The global shard is always visited.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[allow(clippy::struct_excessive_bools)]
pub struct VisitFlags {
    pub hosts: bool,
    pub users: bool,
    pub accounts: bool,
    pub threads: bool,
    pub sessions: bool,
}

impl VisitFlags {
    /// Global-only.
    pub const GLOBAL: VisitFlags = VisitFlags { hosts: false, users: false, accounts: false, threads: false, sessions: false };

    /// Every live event is held by exactly one of global, a host, an account
    /// or a thread, so this combination counts each occurrence once.
    /// Users are excluded because account teardown folds into both user and host.
    pub const GLOBAL_BY_ERROR: VisitFlags = VisitFlags { hosts: true, users: false, accounts: true, threads: true, sessions: false };
}

/// Read-only visitor over shard entries. Implement only what you need.
pub trait ConnectionVisitor {
    fn visit_global(&mut self, _stats: &ErrorStats) {}
    fn visit_host(&mut self, _host: &str, _stats: &ErrorStats) {}
    fn visit_user(&mut self, _user: &str, _stats: &ErrorStats) {}
    fn visit_account(&mut self, _account: &AccountKey, _stats: &ErrorStats) {}
    fn visit_thread(&mut self, _thread: ThreadId, _stats: &ErrorStats) {}
}

/// Sums one `(class, item)` counter across every visited shard entry.
#[derive(Debug)]
pub struct ConnectionErrorVisitor {
    class: usize,
    item: usize,
    pub stat: ErrorStat,
}

impl ConnectionErrorVisitor {
    pub fn new(class: &ErrorClass, item: usize) -> Self {
        Self { class: class.index as usize, item, stat: ErrorStat::default() }
    }

    fn add(&mut self, stats: &ErrorStats) {
        if let Some(s) = stats.stat(self.class, self.item) {
            self.stat.aggregate(s);
        }
    }
}

impl ConnectionVisitor for ConnectionErrorVisitor {
    fn visit_global(&mut self, stats: &ErrorStats) { self.add(stats); }
    fn visit_host(&mut self, _host: &str, stats: &ErrorStats) { self.add(stats); }
    fn visit_user(&mut self, _user: &str, stats: &ErrorStats) { self.add(stats); }
    fn visit_account(&mut self, _account: &AccountKey, stats: &ErrorStats) { self.add(stats); }
    fn visit_thread(&mut self, _thread: ThreadId, stats: &ErrorStats) { self.add(stats); }
}
