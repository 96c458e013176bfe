//! Filepath: src/core/decision.rs
//! Label decisions for a batch of changed files.
//!
//! Pipeline:
//! 1) Compile every rule once (`RuleSet::compile`)
//! 2) Per file, in parallel: pick the single strongest rule
//! 3) Fold the per-file winners, in input order, into one decision per label
//! 4) Sort by priority, then specificity (strongest first)
//!
//! A file contributes to at most one label. Files that match nothing or hit
//! an exclude are dropped silently.

use std::collections::BTreeSet;

use indexmap::IndexMap;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, trace, warn};

use crate::core::{
    matcher::{MatchResult, PatternHit, Rank, evaluate_normalized},
    normalize::normalize,
    pattern::{CompiledPattern, MatchOptions, PatternError, compile},
};

/// A configured mapping from globs to one label.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rule
{
    pub label: String,
    pub include: Vec<String>,
    #[serde(default)]
    pub exclude: Vec<String>,
    #[serde(default)]
    pub priority: Option<i64>,
}

/// Winning label for a file batch, with every file that selected it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabelDecision
{
    pub label: String,
    pub matched_pattern: String,
    pub matched_files: BTreeSet<String>,
    pub priority: i64,
    pub specificity: usize,
}

impl LabelDecision
{
    pub fn rank(&self) -> Rank
    {
        Rank { priority: self.priority, specificity: self.specificity }
    }

    fn from_win(
        path: String,
        win: &FileWin<'_>,
    ) -> Self
    {
        let rank = win
            .hit
            .rank();
        Self {
            label: win
                .label
                .to_string(),
            matched_pattern: win
                .hit
                .pattern
                .to_string(),
            matched_files: BTreeSet::from([path]),
            priority: rank.priority,
            specificity: rank.specificity,
        }
    }

    /// Add a file; the recorded match metadata follows the strongest win.
    fn absorb(
        &mut self,
        path: String,
        win: &FileWin<'_>,
    )
    {
        self.matched_files
            .insert(path);

        let rank = win
            .hit
            .rank();
        if rank > self.rank()
        {
            self.matched_pattern = win
                .hit
                .pattern
                .to_string();
            self.priority = rank.priority;
            self.specificity = rank.specificity;
        }
    }
}

/// A rule with its globs compiled.
#[derive(Debug, Clone)]
pub struct CompiledRule
{
    label: String,
    includes: Vec<CompiledPattern>,
    excludes: Vec<CompiledPattern>,
}

impl CompiledRule
{
    pub fn compile(
        rule: &Rule,
        options: MatchOptions,
    ) -> Result<Self, PatternError>
    {
        Ok(Self {
            label: rule
                .label
                .clone(),
            includes: compile(&rule.include, options, rule.priority)?,
            excludes: compile(&rule.exclude, options, None)?,
        })
    }

    pub fn label(&self) -> &str
    {
        &self.label
    }
}

/// Strongest rule for one file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileWin<'r>
{
    pub rule_index: usize,
    pub label: &'r str,
    pub hit: PatternHit<'r>,
}

/// Compiled rules plus the shared default excludes.
#[derive(Debug, Clone)]
pub struct RuleSet
{
    rules: Vec<CompiledRule>,
    default_excludes: Vec<CompiledPattern>,
}

impl RuleSet
{
    pub fn compile(
        rules: &[Rule],
        default_excludes: &[String],
        options: MatchOptions,
    ) -> Result<Self, PatternError>
    {
        let compiled = rules
            .iter()
            .map(|r| CompiledRule::compile(r, options))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            rules: compiled,
            default_excludes: compile(default_excludes, options, None)?,
        })
    }

    pub fn len(&self) -> usize
    {
        self.rules
            .len()
    }

    pub fn is_empty(&self) -> bool
    {
        self.rules
            .is_empty()
    }

    /// Pick the single strongest rule for an already-normalized path.
    ///
    /// Ties on priority and specificity go to the earlier rule.
    pub fn best_rule(
        &self,
        path: &str,
    ) -> Option<FileWin<'_>>
    {
        let mut best: Option<FileWin<'_>> = None;

        for (rule_index, rule) in self
            .rules
            .iter()
            .enumerate()
        {
            let res = evaluate_normalized(
                path,
                &rule.includes,
                [rule.excludes.as_slice(), self.default_excludes.as_slice()],
            );

            let hit = match res
            {
                MatchResult::Matched(hit) => hit,
                MatchResult::Excluded { pattern } =>
                {
                    trace!(path, label = %rule.label, pattern, "excluded");
                    continue;
                }
                MatchResult::NoMatch => continue,
            };

            let stronger = match &best
            {
                Some(cur) => hit.rank() > cur.hit.rank(),
                None => true,
            };

            if stronger
            {
                best = Some(FileWin { rule_index, label: &rule.label, hit });
            }
        }

        best
    }

    /// Decide labels for `files`.
    #[instrument(skip_all, fields(files = files.len(), rules = self.rules.len()))]
    pub fn decide<S>(
        &self,
        files: &[S],
    ) -> Vec<LabelDecision>
    where
        S: AsRef<str> + Sync,
    {
        if files.is_empty() || self.is_empty()
        {
            return Vec::new();
        }

        // Per-file evaluation is pure; rayon keeps input order on collect
        let wins: Vec<(String, FileWin<'_>)> = files
            .par_iter()
            .filter_map(|f| {
                let path = normalize(f.as_ref()).into_owned();
                self.best_rule(&path)
                    .map(|win| (path, win))
            })
            .collect();

        let folded = wins
            .into_iter()
            .fold(IndexMap::<String, LabelDecision>::new(), |mut acc, (path, win)| {
                debug!(file = %path, label = win.label, pattern = win.hit.pattern, "file matched");
                match acc.get_mut(win.label)
                {
                    Some(decision) => decision.absorb(path, &win),
                    None =>
                    {
                        acc.insert(win.label.to_string(), LabelDecision::from_win(path, &win));
                    }
                }
                acc
            });

        let mut decisions: Vec<LabelDecision> = folded
            .into_values()
            .collect();

        // Stable: equal ranks keep first-seen order
        decisions.sort_by(|a, b| Rank::strongest_first(&a.rank(), &b.rank()));

        debug!(labels = decisions.len(), "label decisions computed");
        decisions
    }
}

/// One-shot form: compile `rules` and decide labels for `files`.
pub fn decide_labels<S>(
    files: &[S],
    rules: &[Rule],
    default_excludes: &[String],
    options: MatchOptions,
) -> Result<Vec<LabelDecision>, PatternError>
where
    S: AsRef<str> + Sync,
{
    if files.is_empty() || rules.is_empty()
    {
        return Ok(Vec::new());
    }

    Ok(RuleSet::compile(rules, default_excludes, options)?.decide(files))
}

/// A decision dropped by the label limit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RejectedDecision
{
    pub decision: LabelDecision,
    pub reason: String,
}

/// Result of [`cap_by_max_labels`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CapOutcome
{
    pub selected: Vec<LabelDecision>,
    pub rejected: Vec<RejectedDecision>,
}

/// Keep at most `max` decisions, strongest first. `max == 0` is unlimited.
///
/// Sets already within the limit come back untouched, so capping twice is
/// the same as capping once.
pub fn cap_by_max_labels(
    decisions: Vec<LabelDecision>,
    max: usize,
) -> CapOutcome
{
    if max == 0 || decisions.len() <= max
    {
        return CapOutcome { selected: decisions, rejected: Vec::new() };
    }

    let mut selected = decisions;
    selected.sort_by(|a, b| Rank::strongest_first(&a.rank(), &b.rank()));

    let rejected = selected
        .split_off(max)
        .into_iter()
        .map(|decision| {
            let reason = format!(
                "exceeds the limit of {max} labels (priority {}, specificity {})",
                decision.priority, decision.specificity
            );
            warn!(label = %decision.label, %reason, "label dropped");
            RejectedDecision { decision, reason }
        })
        .collect();

    CapOutcome { selected, rejected }
}
