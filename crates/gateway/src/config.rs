//! Gateway construction options.

/// Which mechanism the gateway uses to turn a SQL mutation into the
/// per-row `(action, old?, new?)` callbacks `BaseTable` listens for
/// (§4.2).
///
/// Both strategies must produce identical observable callbacks; the
/// choice is purely a performance/complexity tradeoff. Trigger-based
/// capture is the default: it needs one shadow table and three
/// triggers per touched table, set up once, and then a single drain
/// query per mutation rather than a pre-read keyed off the mutation's
/// own WHERE clause.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CaptureStrategy {
    /// Shadow tables + `INSERT`/`UPDATE`/`DELETE` triggers, drained
    /// after each mutation inside the same transaction.
    Trigger,
    /// No triggers: INSERT rows are read back by `last_insert_rowid`,
    /// UPDATE/DELETE rows are pre-read via the mutation's own WHERE
    /// clause before it runs.
    Synthesis,
}

/// SQLite journal mode, set once at connection open.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum JournalMode {
    Wal,
    Memory,
    Delete,
}

impl JournalMode {
    fn pragma_value(self) -> &'static str {
        match self {
            JournalMode::Wal => "WAL",
            JournalMode::Memory => "MEMORY",
            JournalMode::Delete => "DELETE",
        }
    }
}

/// Construction options for a [`crate::StoreGateway`].
#[derive(Clone, Debug)]
pub struct GatewayConfig {
    pub capture_strategy: CaptureStrategy,
    pub journal_mode: JournalMode,
    pub foreign_keys: bool,
}

impl GatewayConfig {
    /// In-memory database, trigger-based capture, WAL is meaningless
    /// for `:memory:` so journal mode is forced to `MEMORY`.
    pub fn in_memory() -> Self {
        Self { capture_strategy: CaptureStrategy::Trigger, journal_mode: JournalMode::Memory, foreign_keys: true }
    }

    /// On-disk database with WAL journaling, suitable for a
    /// long-lived process with concurrent readers.
    pub fn on_disk() -> Self {
        Self { capture_strategy: CaptureStrategy::Trigger, journal_mode: JournalMode::Wal, foreign_keys: true }
    }

    pub fn with_capture_strategy(mut self, strategy: CaptureStrategy) -> Self {
        self.capture_strategy = strategy;
        self
    }

    pub fn with_journal_mode(mut self, mode: JournalMode) -> Self {
        self.journal_mode = mode;
        self
    }

    pub fn with_foreign_keys(mut self, enabled: bool) -> Self {
        self.foreign_keys = enabled;
        self
    }

    /// The `PRAGMA` statements to run once, right after opening the
    /// connection.
    pub(crate) fn pragma_statements(&self) -> String {
        format!(
            "PRAGMA journal_mode = {}; PRAGMA foreign_keys = {}; PRAGMA synchronous = NORMAL; PRAGMA temp_store = MEMORY;",
            self.journal_mode.pragma_value(),
            if self.foreign_keys { "ON" } else { "OFF" }
        )
    }
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self::in_memory()
    }
}
