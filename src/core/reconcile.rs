//! Filepath: src/core/reconcile.rs
//! Namespace-aware, idempotent reconciliation of decided labels against the
//! labels already on a pull request.
//!
//! Per target label:
//! - already present → skipped, no mutation
//! - exclusive namespace → every other existing label of that namespace is
//!   removed (never a label that is itself a target)
//! - otherwise → added, in one batch
//!
//! Removals run before additions. If the batch add is rejected as
//! unprocessable (some label is undefined), each label is retried alone and,
//! when allowed, created with default color and description first.
//!
//! Only the initial listing can abort the whole call. Every later failure is
//! recorded per label in `ApplyResult::failed` and processing continues.

use std::slice;

use indexmap::IndexSet;
use serde::Serialize;
use tracing::{debug, info, instrument, warn};

use crate::core::{
    decision::LabelDecision,
    namespace::{DEFAULT_DELIMITER, NamespacePolicy},
    store::{LabelStore, RemoteError, TargetId},
};

/// Color given to labels created on the fly.
pub const DEFAULT_LABEL_COLOR: &str = "ededed";

/// Description given to labels created on the fly.
pub const DEFAULT_LABEL_DESCRIPTION: &str = "";

/// Which step failed for a label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LabelOperation
{
    Add,
    Remove,
    Create,
}

/// Non-fatal per-label failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FailedLabel
{
    pub label: String,
    pub operation: LabelOperation,
    pub reason: String,
    pub error: RemoteError,
}

impl FailedLabel
{
    fn new(
        label: &str,
        operation: LabelOperation,
        error: RemoteError,
    ) -> Self
    {
        let verb = match operation
        {
            LabelOperation::Add => "add",
            LabelOperation::Remove => "remove",
            LabelOperation::Create => "create",
        };
        Self {
            label: label.to_string(),
            operation,
            reason: format!("failed to {verb} label: {error}"),
            error,
        }
    }
}

/// Outcome of one reconciliation.
///
/// Every decided label ends up in exactly one of `applied`, `skipped` or
/// `failed`. `removed` (and `failed` entries with the `Remove` operation)
/// refer to labels that were already on the pull request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ApplyResult
{
    pub applied: Vec<String>,
    pub skipped: Vec<String>,
    pub removed: Vec<String>,
    pub failed: Vec<FailedLabel>,
}

impl ApplyResult
{
    /// No per-label failures.
    pub fn is_clean(&self) -> bool
    {
        self.failed
            .is_empty()
    }

    /// Longest retry hint among rate-limited failures, if any was throttled.
    pub fn rate_limited(&self) -> Option<Option<u64>>
    {
        self.failed
            .iter()
            .filter_map(|f| match f.error
            {
                RemoteError::RateLimited { retry_after_secs } => Some(retry_after_secs),
                _ => None,
            })
            .reduce(|a, b| a.max(b))
    }
}

/// Whole-call failure: the existing labels could not be listed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ReconcileError
{
    #[error("permission denied listing labels on #{target}: {message}")]
    PermissionDenied
    {
        target: TargetId, message: String
    },

    #[error("rate limited listing labels on #{target}{}", retry_suffix(.retry_after_secs))]
    RateLimited
    {
        target: TargetId,
        retry_after_secs: Option<u64>,
    },

    #[error("failed to list labels on #{target}: {source}")]
    Remote
    {
        target: TargetId,
        #[source]
        source: RemoteError,
    },
}

fn retry_suffix(secs: &Option<u64>) -> String
{
    secs.map(|s| format!(" (retry after {s}s)"))
        .unwrap_or_default()
}

impl ReconcileError
{
    fn from_list(
        target: TargetId,
        err: RemoteError,
    ) -> Self
    {
        match err
        {
            RemoteError::PermissionDenied { message } => ReconcileError::PermissionDenied { target, message },
            RemoteError::RateLimited { retry_after_secs } =>
            {
                ReconcileError::RateLimited { target, retry_after_secs }
            }
            other => ReconcileError::Remote { target, source: other },
        }
    }

    /// Retry hint for rate-limit aborts.
    pub fn retry_after_secs(&self) -> Option<u64>
    {
        match self
        {
            ReconcileError::RateLimited { retry_after_secs, .. } => *retry_after_secs,
            _ => None,
        }
    }
}

/// Mutations needed to reach the decided label set, computed without I/O.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReconcilePlan
{
    pub skip: Vec<String>,
    pub add: Vec<String>,
    pub remove: Vec<String>,
}

impl ReconcilePlan
{
    pub fn is_noop(&self) -> bool
    {
        self.add
            .is_empty()
            && self
                .remove
                .is_empty()
    }
}

/// Compute skip/add/remove sets for `decisions` against `existing`.
pub fn plan_reconciliation(
    existing: &[String],
    decisions: &[LabelDecision],
    policy: &NamespacePolicy,
    delimiter: char,
) -> ReconcilePlan
{
    let targets: IndexSet<&str> = decisions
        .iter()
        .map(|d| d.label.as_str())
        .collect();

    let mut plan = ReconcilePlan::default();
    let mut remove: IndexSet<&str> = IndexSet::new();

    for &label in &targets
    {
        if existing
            .iter()
            .any(|e| e == label)
        {
            plan.skip
                .push(label.to_string());
        }
        else
        {
            plan.add
                .push(label.to_string());
        }

        remove.extend(
            policy
                .conflicts(label, existing, delimiter)
                .into_iter()
                .filter(|c| !targets.contains(c)),
        );
    }

    plan.remove = remove
        .into_iter()
        .map(str::to_string)
        .collect();
    plan
}

/// Drives a [`LabelStore`] to apply decisions for one pull request.
#[derive(Debug, Clone)]
pub struct Reconciler<'p>
{
    policy: &'p NamespacePolicy,
    delimiter: char,
    create_if_missing: bool,
}

impl<'p> Reconciler<'p>
{
    pub fn new(policy: &'p NamespacePolicy) -> Self
    {
        Self { policy, delimiter: DEFAULT_DELIMITER, create_if_missing: false }
    }

    pub fn with_delimiter(
        mut self,
        delimiter: char,
    ) -> Self
    {
        self.delimiter = delimiter;
        self
    }

    pub fn with_create_if_missing(
        mut self,
        create: bool,
    ) -> Self
    {
        self.create_if_missing = create;
        self
    }

    /// Reconcile `decisions` against the labels on `target`.
    #[instrument(skip(self, store, decisions), fields(decisions = decisions.len()))]
    pub fn reconcile<S>(
        &self,
        store: &mut S,
        target: TargetId,
        decisions: &[LabelDecision],
    ) -> Result<ApplyResult, ReconcileError>
    where
        S: LabelStore + ?Sized,
    {
        if decisions.is_empty()
        {
            debug!("no decisions; nothing to reconcile");
            return Ok(ApplyResult::default());
        }

        let existing = store
            .list_labels(target)
            .map_err(|e| ReconcileError::from_list(target, e))?;

        let plan = plan_reconciliation(&existing, decisions, self.policy, self.delimiter);
        debug!(?plan, existing = existing.len(), "reconciliation planned");

        let mut result = ApplyResult { skipped: plan.skip, ..ApplyResult::default() };

        // Removals first, each independent
        for label in &plan.remove
        {
            match store.remove_label(target, label)
            {
                Ok(()) => result
                    .removed
                    .push(label.clone()),
                Err(e) =>
                {
                    warn!(%label, error = %e, "label removal failed");
                    result
                        .failed
                        .push(FailedLabel::new(label, LabelOperation::Remove, e));
                }
            }
        }

        if !plan
            .add
            .is_empty()
        {
            self.add_batch(store, target, &plan.add, &mut result);
        }

        info!(
            applied = result.applied.len(),
            skipped = result.skipped.len(),
            removed = result.removed.len(),
            failed = result.failed.len(),
            "labels reconciled"
        );
        Ok(result)
    }

    fn add_batch<S>(
        &self,
        store: &mut S,
        target: TargetId,
        labels: &[String],
        result: &mut ApplyResult,
    ) where
        S: LabelStore + ?Sized,
    {
        match store.add_labels(target, labels)
        {
            Ok(()) => result
                .applied
                .extend_from_slice(labels),
            Err(e) if e.is_unprocessable() =>
            {
                info!(error = %e, "batch add rejected; retrying label by label");
                for label in labels
                {
                    self.add_one(store, target, label, result);
                }
            }
            Err(e) =>
            {
                warn!(error = %e, count = labels.len(), "batch add failed");
                result
                    .failed
                    .extend(
                        labels
                            .iter()
                            .map(|l| FailedLabel::new(l, LabelOperation::Add, e.clone())),
                    );
            }
        }
    }

    fn add_one<S>(
        &self,
        store: &mut S,
        target: TargetId,
        label: &String,
        result: &mut ApplyResult,
    ) where
        S: LabelStore + ?Sized,
    {
        let err = match store.add_labels(target, slice::from_ref(label))
        {
            Ok(()) =>
            {
                result
                    .applied
                    .push(label.clone());
                return;
            }
            Err(e) => e,
        };

        if !(err.is_unprocessable() && self.create_if_missing)
        {
            warn!(%label, error = %err, "label add failed");
            result
                .failed
                .push(FailedLabel::new(label, LabelOperation::Add, err));
            return;
        }

        debug!(%label, "label undefined; creating it");
        if let Err(e) = store.create_label(target, label, DEFAULT_LABEL_COLOR, DEFAULT_LABEL_DESCRIPTION)
        {
            warn!(%label, error = %e, "label creation failed");
            result
                .failed
                .push(FailedLabel::new(label, LabelOperation::Create, e));
            return;
        }

        match store.add_labels(target, slice::from_ref(label))
        {
            Ok(()) => result
                .applied
                .push(label.clone()),
            Err(e) =>
            {
                warn!(%label, error = %e, "label add failed after creation");
                result
                    .failed
                    .push(FailedLabel::new(label, LabelOperation::Add, e));
            }
        }
    }
}

/// Reconcile with the default `:` delimiter.
pub fn reconcile<S>(
    store: &mut S,
    target: TargetId,
    decisions: &[LabelDecision],
    policy: &NamespacePolicy,
    create_if_missing: bool,
) -> Result<ApplyResult, ReconcileError>
where
    S: LabelStore + ?Sized,
{
    Reconciler::new(policy)
        .with_create_if_missing(create_if_missing)
        .reconcile(store, target, decisions)
}
