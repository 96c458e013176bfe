//! **dirlabel** - Directory-based pull request labeling
//!
//! Changed file paths are matched against declarative glob rules; each file picks
//! its single strongest rule, winners aggregate into label decisions, and the
//! decisions are reconciled against the labels already on the pull request with
//! exclusive/additive namespace handling.

/// Command-line interface with clap integration
pub mod cli;

/// CLI command handlers
pub mod cli_ext {
    /// `dirlabel decide` and shared input helpers
    pub mod decide_cmd;

    /// `dirlabel plan` dry-run reconciliation
    pub mod plan_cmd;

    /// `dirlabel check` configuration validation
    pub mod check_cmd;
}

/// Core engine - matching, decisions and reconciliation
pub mod core {
    /// Platform-independent path form
    pub mod normalize;
    pub use normalize::normalize;

    /// Glob compilation (globset) with dot/nocase/matchBase options
    pub mod pattern;
    pub use pattern::{CompiledPattern, MatchOptions, PatternError, compile};

    /// Include/exclude evaluation with priority/specificity tie-break
    pub mod matcher;
    pub use matcher::{MatchResult, PatternHit, Rank, evaluate};

    /// Per-file rule resolution, label aggregation and capping
    pub mod decision;
    pub use decision::{CapOutcome, LabelDecision, RejectedDecision, Rule, RuleSet, cap_by_max_labels, decide_labels};

    /// Label namespaces and exclusive-conflict detection
    pub mod namespace;
    pub use namespace::{NamespaceKind, NamespacePolicy, extract_namespace};

    /// Remote label store seam, error taxonomy and in-memory store
    pub mod store;
    pub use store::{LabelStore, MemoryLabelStore, RemoteError, TargetId};

    /// Namespace-aware idempotent reconciliation
    pub mod reconcile;
    pub use reconcile::{ApplyResult, FailedLabel, ReconcileError, Reconciler, reconcile};

    /// Compile-once facade over the whole pipeline
    pub mod labeler;
    pub use labeler::{LabelRun, Labeler};
}

/// Infrastructure - Configuration and logging
pub mod infra {
    /// Layered configuration loading and validation
    pub mod config;
    pub use self::config::{ConfigError, LabelerConfig, RawConfig, load_config};

    /// tracing-subscriber setup
    pub mod logging;
}

// Strategic re-exports for library consumers
pub use cli::{AppContext, Cli, Commands};
pub use crate::core::{
    ApplyResult, LabelDecision, LabelRun, LabelStore, Labeler, MemoryLabelStore, NamespacePolicy, ReconcileError,
    RemoteError, Rule, cap_by_max_labels, decide_labels, reconcile,
};
pub use crate::infra::{LabelerConfig, load_config};
