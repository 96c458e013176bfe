//! Filepath: src/core/store.rs
//! Remote label store seam.
//!
//! `LabelStore` is the capability the reconciler drives: list, batch add,
//! remove, create. Every call returns a tagged `RemoteError` on failure so
//! callers match each failure kind explicitly. `RemoteError::from_response`
//! maps raw HTTP status + headers onto that taxonomy; HTTP-backed stores
//! call it on every non-2xx response.
//!
//! `MemoryLabelStore` is an in-process implementation with a call log and
//! scripted failures, used for dry runs and tests. It reports its own
//! failures as the HTTP statuses a hosted API would return, through the
//! same classification.

use std::collections::{BTreeSet, HashMap};

use chrono::{DateTime, Utc};
use indexmap::IndexSet;
use serde::Serialize;

/// Pull request (or issue) number the labels live on.
pub type TargetId = u64;

/// Failure of a single remote call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, thiserror::Error)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RemoteError
{
    /// Credentials lack access to the resource
    #[error("permission denied: {message}")]
    PermissionDenied
    {
        message: String
    },

    /// Throttled; the caller owns backoff
    #[error("rate limited{}", fmt_retry_after(.retry_after_secs))]
    RateLimited
    {
        retry_after_secs: Option<u64>
    },

    /// Request refers to something the remote cannot process, e.g. a label
    /// that is not defined in the repository
    #[error("unprocessable: {message}")]
    Unprocessable
    {
        message: String
    },

    /// Any other remote failure
    #[error("remote API error {status}: {message}")]
    Api
    {
        status: u16, message: String
    },
}

fn fmt_retry_after(secs: &Option<u64>) -> String
{
    match secs
    {
        Some(s) => format!(" (retry after {s}s)"),
        None => String::new(),
    }
}

impl RemoteError
{
    /// Classify an HTTP failure.
    ///
    /// - 401 → permission denied
    /// - 403 with exhausted quota, `retry-after`, or a rate-limit message → rate limited
    /// - other 403 → permission denied
    /// - 429 → rate limited
    /// - 422 → unprocessable
    /// - anything else → generic API error
    pub fn from_response(
        status: u16,
        message: impl Into<String>,
        headers: &[(&str, &str)],
        now: DateTime<Utc>,
    ) -> Self
    {
        let message = message.into();

        let throttled = header(headers, "x-ratelimit-remaining") == Some("0")
            || header(headers, "retry-after").is_some()
            || message
                .to_ascii_lowercase()
                .contains("rate limit");

        match status
        {
            401 => RemoteError::PermissionDenied { message },
            403 if throttled =>
            {
                RemoteError::RateLimited { retry_after_secs: retry_after(headers, now) }
            }
            403 => RemoteError::PermissionDenied { message },
            429 => RemoteError::RateLimited { retry_after_secs: retry_after(headers, now) },
            422 => RemoteError::Unprocessable { message },
            _ => RemoteError::Api { status, message },
        }
    }

    pub fn is_unprocessable(&self) -> bool
    {
        matches!(self, RemoteError::Unprocessable { .. })
    }

    pub fn retry_after_secs(&self) -> Option<u64>
    {
        match self
        {
            RemoteError::RateLimited { retry_after_secs } => *retry_after_secs,
            _ => None,
        }
    }
}

/// Case-insensitive header lookup.
fn header<'h>(
    headers: &[(&str, &'h str)],
    name: &str,
) -> Option<&'h str>
{
    headers
        .iter()
        .find(|(k, _)| k.eq_ignore_ascii_case(name))
        .map(|(_, v)| v.trim())
}

/// Seconds to wait: `retry-after` wins, else the distance to
/// `x-ratelimit-reset` (epoch seconds), clamped at zero.
pub fn retry_after(
    headers: &[(&str, &str)],
    now: DateTime<Utc>,
) -> Option<u64>
{
    if let Some(secs) = header(headers, "retry-after").and_then(|v| v.parse::<u64>().ok())
    {
        return Some(secs);
    }

    header(headers, "x-ratelimit-reset")
        .and_then(|v| v.parse::<i64>().ok())
        .map(|reset| {
            (reset - now.timestamp())
                .max(0)
                .unsigned_abs()
        })
}

/// Label operations on one pull request.
///
/// Calls are issued one at a time; `&mut self` keeps them sequential.
pub trait LabelStore
{
    /// Names of the labels currently on `target`
    fn list_labels(
        &mut self,
        target: TargetId,
    ) -> Result<Vec<String>, RemoteError>;

    /// Attach all `names` in one request
    fn add_labels(
        &mut self,
        target: TargetId,
        names: &[String],
    ) -> Result<(), RemoteError>;

    /// Detach one label
    fn remove_label(
        &mut self,
        target: TargetId,
        name: &str,
    ) -> Result<(), RemoteError>;

    /// Define a label in the repository
    fn create_label(
        &mut self,
        target: TargetId,
        name: &str,
        color: &str,
        description: &str,
    ) -> Result<(), RemoteError>;
}

/// Operation kinds, for call logs and scripted failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreOp
{
    List,
    Add,
    Remove,
    Create,
}

/// One recorded call against a [`MemoryLabelStore`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "op", rename_all = "lowercase")]
pub enum StoreCall
{
    List
    {
        target: TargetId
    },
    Add
    {
        target: TargetId, names: Vec<String>
    },
    Remove
    {
        target: TargetId, name: String
    },
    Create
    {
        target: TargetId,
        name: String,
        color: String,
        description: String,
    },
}

impl StoreCall
{
    pub fn op(&self) -> StoreOp
    {
        match self
        {
            StoreCall::List { .. } => StoreOp::List,
            StoreCall::Add { .. } => StoreOp::Add,
            StoreCall::Remove { .. } => StoreOp::Remove,
            StoreCall::Create { .. } => StoreOp::Create,
        }
    }

    fn touches(
        &self,
        label: &str,
    ) -> bool
    {
        match self
        {
            StoreCall::List { .. } => false,
            StoreCall::Add { names, .. } => names
                .iter()
                .any(|n| n == label),
            StoreCall::Remove { name, .. } | StoreCall::Create { name, .. } => name == label,
        }
    }
}

#[derive(Debug, Clone)]
struct ScriptedFailure
{
    op: StoreOp,
    label: Option<String>,
    error: RemoteError,
}

/// In-process label store.
///
/// When label definitions are tracked (`with_defined`), adding an
/// undefined label rejects the whole request as `Unprocessable`, and
/// `create_label` defines it. Without tracking every label is addable.
#[derive(Debug, Clone, Default)]
pub struct MemoryLabelStore
{
    labels: HashMap<TargetId, IndexSet<String>>,
    defined: Option<BTreeSet<String>>,
    failures: Vec<ScriptedFailure>,
    calls: Vec<StoreCall>,
}

impl MemoryLabelStore
{
    pub fn new() -> Self
    {
        Self::default()
    }

    /// Seed the labels already on `target`.
    pub fn with_labels<I, S>(
        mut self,
        target: TargetId,
        labels: I,
    ) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let set: IndexSet<String> = labels
            .into_iter()
            .map(Into::into)
            .collect();

        if let Some(defined) = self
            .defined
            .as_mut()
        {
            defined.extend(
                set.iter()
                    .cloned(),
            );
        }

        self.labels
            .entry(target)
            .or_default()
            .extend(set);
        self
    }

    /// Track repository label definitions, starting with `defined` plus
    /// every label already seeded on a target.
    pub fn with_defined<I, S>(
        mut self,
        defined: I,
    ) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut set: BTreeSet<String> = defined
            .into_iter()
            .map(Into::into)
            .collect();
        set.extend(
            self.labels
                .values()
                .flatten()
                .cloned(),
        );
        self.defined = Some(set);
        self
    }

    /// Fail the next `op` call with `error`.
    pub fn fail_next(
        mut self,
        op: StoreOp,
        error: RemoteError,
    ) -> Self
    {
        self.failures
            .push(ScriptedFailure { op, label: None, error });
        self
    }

    /// Fail the next `op` call with the classification of an HTTP reply.
    pub fn fail_next_response(
        self,
        op: StoreOp,
        status: u16,
        message: &str,
        headers: &[(&str, &str)],
    ) -> Self
    {
        let error = RemoteError::from_response(status, message, headers, Utc::now());
        self.fail_next(op, error)
    }

    /// Fail the next `op` call that involves `label` with `error`.
    pub fn fail_label(
        mut self,
        op: StoreOp,
        label: impl Into<String>,
        error: RemoteError,
    ) -> Self
    {
        self.failures
            .push(ScriptedFailure { op, label: Some(label.into()), error });
        self
    }

    /// Labels currently on `target`, in insertion order.
    pub fn labels(
        &self,
        target: TargetId,
    ) -> Vec<String>
    {
        self.labels
            .get(&target)
            .map(|s| {
                s.iter()
                    .cloned()
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Every call made so far, failed ones included.
    pub fn calls(&self) -> &[StoreCall]
    {
        &self.calls
    }

    /// Calls of one kind.
    pub fn calls_of(
        &self,
        op: StoreOp,
    ) -> Vec<&StoreCall>
    {
        self.calls
            .iter()
            .filter(|c| c.op() == op)
            .collect()
    }

    pub fn is_defined(
        &self,
        label: &str,
    ) -> bool
    {
        self.defined
            .as_ref()
            .is_none_or(|d| d.contains(label))
    }

    /// Log the call, then fire a matching scripted failure if any.
    fn record(
        &mut self,
        call: StoreCall,
    ) -> Result<(), RemoteError>
    {
        let pos = self
            .failures
            .iter()
            .position(|f| {
                f.op == call.op()
                    && f.label
                        .as_deref()
                        .is_none_or(|l| call.touches(l))
            });

        self.calls
            .push(call);

        match pos
        {
            Some(i) => Err(self
                .failures
                .remove(i)
                .error),
            None => Ok(()),
        }
    }
}

/// Header-less response with `status`, classified like a remote reply.
fn status_error(
    status: u16,
    message: String,
) -> RemoteError
{
    RemoteError::from_response(status, message, &[], Utc::now())
}

impl LabelStore for MemoryLabelStore
{
    fn list_labels(
        &mut self,
        target: TargetId,
    ) -> Result<Vec<String>, RemoteError>
    {
        self.record(StoreCall::List { target })?;
        Ok(self.labels(target))
    }

    fn add_labels(
        &mut self,
        target: TargetId,
        names: &[String],
    ) -> Result<(), RemoteError>
    {
        self.record(StoreCall::Add { target, names: names.to_vec() })?;

        if let Some(missing) = names
            .iter()
            .find(|n| !self.is_defined(n))
        {
            return Err(status_error(422, format!("label {missing:?} does not exist")));
        }

        self.labels
            .entry(target)
            .or_default()
            .extend(
                names
                    .iter()
                    .cloned(),
            );
        Ok(())
    }

    fn remove_label(
        &mut self,
        target: TargetId,
        name: &str,
    ) -> Result<(), RemoteError>
    {
        self.record(StoreCall::Remove { target, name: name.to_string() })?;

        let removed = self
            .labels
            .get_mut(&target)
            .is_some_and(|s| s.shift_remove(name));

        if removed
        {
            Ok(())
        }
        else
        {
            Err(status_error(404, format!("label {name:?} is not on #{target}")))
        }
    }

    fn create_label(
        &mut self,
        target: TargetId,
        name: &str,
        color: &str,
        description: &str,
    ) -> Result<(), RemoteError>
    {
        self.record(StoreCall::Create {
            target,
            name: name.to_string(),
            color: color.to_string(),
            description: description.to_string(),
        })?;

        if let Some(defined) = self
            .defined
            .as_mut()
        {
            if !defined.insert(name.to_string())
            {
                return Err(status_error(422, format!("label {name:?} already exists")));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests
{
    use chrono::TimeZone;

    use super::*;

    fn now() -> DateTime<Utc>
    {
        Utc.timestamp_opt(1_700_000_000, 0)
            .unwrap()
    }

    #[test]
    fn classifies_permission_and_generic_errors()
    {
        assert!(matches!(
            RemoteError::from_response(401, "bad credentials", &[], now()),
            RemoteError::PermissionDenied { .. }
        ));
        assert!(matches!(
            RemoteError::from_response(403, "Resource not accessible by integration", &[], now()),
            RemoteError::PermissionDenied { .. }
        ));
        assert_eq!(
            RemoteError::from_response(500, "boom", &[], now()),
            RemoteError::Api { status: 500, message: "boom".into() }
        );
        assert!(RemoteError::from_response(422, "Validation Failed", &[], now()).is_unprocessable());
    }

    #[test]
    fn classifies_rate_limits_with_retry_hints()
    {
        let reset = (1_700_000_000 + 42).to_string();
        let err = RemoteError::from_response(
            403,
            "forbidden",
            &[("X-RateLimit-Remaining", "0"), ("X-RateLimit-Reset", reset.as_str())],
            now(),
        );
        assert_eq!(err, RemoteError::RateLimited { retry_after_secs: Some(42) });

        let err = RemoteError::from_response(429, "slow down", &[("Retry-After", "7")], now());
        assert_eq!(err.retry_after_secs(), Some(7));
        assert_eq!(err.to_string(), "rate limited (retry after 7s)");

        let err = RemoteError::from_response(403, "API rate limit exceeded", &[], now());
        assert_eq!(err, RemoteError::RateLimited { retry_after_secs: None });
    }

    #[test]
    fn reset_in_the_past_clamps_to_zero()
    {
        assert_eq!(retry_after(&[("x-ratelimit-reset", "1")], now()), Some(0));
        assert_eq!(retry_after(&[], now()), None);
    }

    #[test]
    fn memory_store_rejects_undefined_labels_in_batch()
    {
        let mut store = MemoryLabelStore::new()
            .with_labels(1, ["bug"])
            .with_defined(["area:ui"]);

        let err = store
            .add_labels(1, &["area:ui".to_string(), "area:new".to_string()])
            .unwrap_err();
        assert!(err.is_unprocessable());
        assert_eq!(store.labels(1), vec!["bug"]);

        store
            .create_label(1, "area:new", "ededed", "")
            .unwrap();
        store
            .add_labels(1, &["area:ui".to_string(), "area:new".to_string()])
            .unwrap();
        assert_eq!(store.labels(1), vec!["bug", "area:ui", "area:new"]);
    }

    #[test]
    fn scripted_failures_fire_once_and_are_logged()
    {
        let mut store = MemoryLabelStore::new()
            .with_labels(3, ["a", "b"])
            .fail_label(StoreOp::Remove, "b", RemoteError::Api { status: 500, message: "x".into() });

        assert!(
            store
                .remove_label(3, "a")
                .is_ok()
        );
        assert!(
            store
                .remove_label(3, "b")
                .is_err()
        );
        assert!(
            store
                .remove_label(3, "b")
                .is_ok()
        );
        assert_eq!(
            store
                .calls_of(StoreOp::Remove)
                .len(),
            3
        );
    }

    #[test]
    fn removing_absent_label_is_not_found()
    {
        let mut store = MemoryLabelStore::new();
        assert!(matches!(store.remove_label(9, "x"), Err(RemoteError::Api { status: 404, .. })));
    }

    #[test]
    fn creating_a_defined_label_is_unprocessable()
    {
        let mut store = MemoryLabelStore::new().with_defined(["area:ui"]);

        let err = store
            .create_label(1, "area:ui", "ededed", "")
            .unwrap_err();
        assert_eq!(err, RemoteError::Unprocessable { message: "label \"area:ui\" already exists".into() });

        store
            .create_label(1, "area:new", "ededed", "")
            .unwrap();
        assert!(store.is_defined("area:new"));
    }

    #[test]
    fn untracked_store_accepts_any_creation()
    {
        let mut store = MemoryLabelStore::new();

        store
            .create_label(1, "area:ui", "ededed", "")
            .unwrap();
        store
            .create_label(1, "area:ui", "ededed", "")
            .unwrap();
        assert_eq!(
            store
                .calls_of(StoreOp::Create)
                .len(),
            2
        );
    }
}
