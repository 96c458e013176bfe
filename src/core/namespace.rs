//! Filepath: src/core/namespace.rs
//! Label namespaces: the prefix before a delimiter (`size:M` → `size`).
//!
//! The delimiter is a per-call parameter. Reconciliation uses `:`, while
//! other label families may use `/`; the two are never merged here.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

/// Delimiter used by label reconciliation.
pub const DEFAULT_DELIMITER: char = ':';

/// Prefix before the first `delimiter`, or `None` when absent.
pub fn extract_namespace(
    label: &str,
    delimiter: char,
) -> Option<&str>
{
    label
        .split_once(delimiter)
        .map(|(ns, _)| ns)
}

/// How a namespace behaves when a new label arrives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NamespaceKind
{
    /// One label at a time; newcomers replace existing ones
    Exclusive,
    /// Labels coexist
    Additive,
}

/// Exclusive and additive namespace names.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NamespacePolicy
{
    pub exclusive: BTreeSet<String>,
    pub additive: BTreeSet<String>,
}

impl NamespacePolicy
{
    pub fn new<I, J, S, T>(
        exclusive: I,
        additive: J,
    ) -> Self
    where
        I: IntoIterator<Item = S>,
        J: IntoIterator<Item = T>,
        S: Into<String>,
        T: Into<String>,
    {
        Self {
            exclusive: exclusive
                .into_iter()
                .map(Into::into)
                .collect(),
            additive: additive
                .into_iter()
                .map(Into::into)
                .collect(),
        }
    }

    /// Classify `label`. Labels without a namespace, or with one the
    /// policy does not list as exclusive, are additive.
    pub fn kind_of(
        &self,
        label: &str,
        delimiter: char,
    ) -> NamespaceKind
    {
        match extract_namespace(label, delimiter)
        {
            Some(ns)
                if self
                    .exclusive
                    .contains(ns) =>
            {
                NamespaceKind::Exclusive
            }
            _ => NamespaceKind::Additive,
        }
    }

    /// Existing labels that must go before `label` is applied: every other
    /// label in the same exclusive namespace. Never returns `label` itself.
    pub fn conflicts<'e>(
        &self,
        label: &str,
        existing: &'e [String],
        delimiter: char,
    ) -> Vec<&'e str>
    {
        let Some(ns) = extract_namespace(label, delimiter)
        else
        {
            return Vec::new();
        };

        if !self
            .exclusive
            .contains(ns)
        {
            return Vec::new();
        }

        existing
            .iter()
            .map(String::as_str)
            .filter(|e| *e != label && extract_namespace(e, delimiter) == Some(ns))
            .collect()
    }
}

#[cfg(test)]
mod tests
{
    use super::*;

    fn labels(names: &[&str]) -> Vec<String>
    {
        names
            .iter()
            .map(|s| s.to_string())
            .collect()
    }

    #[test]
    fn namespace_is_prefix_before_first_delimiter()
    {
        assert_eq!(extract_namespace("size:M", ':'), Some("size"));
        assert_eq!(extract_namespace("a:b:c", ':'), Some("a"));
        assert_eq!(extract_namespace("bug", ':'), None);
        assert_eq!(extract_namespace(":odd", ':'), Some(""));
    }

    #[test]
    fn delimiter_is_scoped_to_the_call()
    {
        assert_eq!(extract_namespace("area/ui", '/'), Some("area"));
        assert_eq!(extract_namespace("area/ui", ':'), None);
    }

    #[test]
    fn kinds_default_to_additive()
    {
        let policy = NamespacePolicy::new(["size"], ["meta"]);
        assert_eq!(policy.kind_of("size:S", ':'), NamespaceKind::Exclusive);
        assert_eq!(policy.kind_of("meta:x", ':'), NamespaceKind::Additive);
        assert_eq!(policy.kind_of("area:x", ':'), NamespaceKind::Additive);
        assert_eq!(policy.kind_of("plain", ':'), NamespaceKind::Additive);
    }

    #[test]
    fn conflicts_only_in_exclusive_namespaces()
    {
        let policy = NamespacePolicy::new(["size"], ["meta"]);
        let existing = labels(&["size:S", "size:L", "meta:important", "sizeable"]);

        assert_eq!(policy.conflicts("size:M", &existing, ':'), vec!["size:S", "size:L"]);
        assert!(
            policy
                .conflicts("meta:reviewed", &existing, ':')
                .is_empty()
        );
        assert!(
            policy
                .conflicts("plain", &existing, ':')
                .is_empty()
        );
    }

    #[test]
    fn target_label_is_never_its_own_conflict()
    {
        let policy = NamespacePolicy::new(["size"], Vec::<String>::new());
        let existing = labels(&["size:M", "size:S"]);
        assert_eq!(policy.conflicts("size:M", &existing, ':'), vec!["size:S"]);
    }
}
