//! Filepath: src/core/labeler.rs
//! One-stop entry point: compile a configuration once, then decide, cap and
//! reconcile labels for any number of pull requests.

use serde::Serialize;
use tracing::{info, instrument};

use crate::{
    core::{
        decision::{CapOutcome, LabelDecision, RuleSet, cap_by_max_labels},
        namespace::NamespacePolicy,
        pattern::PatternError,
        reconcile::{ApplyResult, ReconcileError, Reconciler},
        store::{LabelStore, TargetId},
    },
    infra::config::LabelerConfig,
};

/// Compiled labeling rules plus reconciliation settings.
#[derive(Debug, Clone)]
pub struct Labeler
{
    rules: RuleSet,
    namespaces: NamespacePolicy,
    delimiter: char,
    max_labels: usize,
    create_missing: bool,
}

/// Everything one run produced.
#[derive(Debug, Clone, Serialize)]
pub struct LabelRun
{
    pub target: TargetId,
    pub decisions: CapOutcome,
    pub result: ApplyResult,
}

impl Labeler
{
    pub fn new(config: &LabelerConfig) -> Result<Self, PatternError>
    {
        let rules = RuleSet::compile(&config.rules, &config.default_excludes(), config.options)?;

        Ok(Self {
            rules,
            namespaces: config
                .namespaces
                .clone(),
            delimiter: config.namespace_delimiter,
            max_labels: config.max_labels,
            create_missing: config.create_missing_labels,
        })
    }

    pub fn rules(&self) -> &RuleSet
    {
        &self.rules
    }

    /// Uncapped decisions, strongest first.
    pub fn decide<S>(
        &self,
        files: &[S],
    ) -> Vec<LabelDecision>
    where
        S: AsRef<str> + Sync,
    {
        self.rules
            .decide(files)
    }

    /// Decisions after the configured label limit.
    pub fn plan<S>(
        &self,
        files: &[S],
    ) -> CapOutcome
    where
        S: AsRef<str> + Sync,
    {
        cap_by_max_labels(self.decide(files), self.max_labels)
    }

    /// Decide, cap and reconcile against `store`.
    #[instrument(skip(self, store, files), fields(files = files.len()))]
    pub fn apply<S, L>(
        &self,
        store: &mut L,
        target: TargetId,
        files: &[S],
    ) -> Result<LabelRun, ReconcileError>
    where
        S: AsRef<str> + Sync,
        L: LabelStore + ?Sized,
    {
        let decisions = self.plan(files);

        let result = Reconciler::new(&self.namespaces)
            .with_delimiter(self.delimiter)
            .with_create_if_missing(self.create_missing)
            .reconcile(store, target, &decisions.selected)?;

        info!(
            selected = decisions.selected.len(),
            rejected = decisions.rejected.len(),
            "labeling run finished"
        );

        Ok(LabelRun { target, decisions, result })
    }
}

#[cfg(test)]
mod tests
{
    use super::*;
    use crate::{
        core::store::{MemoryLabelStore, StoreOp},
        infra::config::parse_str,
    };

    const CONFIG: &str = r#"
version: 1
maxLabels: 2
namespaces:
  exclusive: [area]
rules:
  - label: "area:docs"
    include: ["docs/**", "**/*.md"]
  - label: "area:core"
    include: ["src/core/**"]
    priority: 10
  - label: "area:src"
    include: ["src/**"]
  - label: "area:ci"
    include: [".github/**"]
"#;

    fn labeler() -> Labeler
    {
        let cfg = parse_str(CONFIG, config::FileFormat::Yaml).unwrap();
        Labeler::new(&cfg).unwrap()
    }

    #[test]
    fn plan_applies_label_limit()
    {
        let out = labeler().plan(&["README.md", "src/core/a.rs", "src/lib.rs", ".github/ci.yml"]);

        assert_eq!(
            out.selected
                .len(),
            2
        );
        assert_eq!(out.selected[0].label, "area:core");
        assert_eq!(
            out.rejected
                .len(),
            2
        );
    }

    #[test]
    fn default_excludes_drop_lockfiles_and_vcs_dirs()
    {
        let ds = labeler().decide(&["docs/package-lock.json", ".git/HEAD", "node_modules/x/README.md"]);
        assert!(ds.is_empty());
    }

    #[test]
    fn apply_reconciles_against_store()
    {
        let mut store = MemoryLabelStore::new().with_labels(7, ["area:ui", "bug"]);

        let run = labeler()
            .apply(&mut store, 7, &["src/core/engine.rs"])
            .unwrap();

        assert_eq!(run.result.applied, vec!["area:core"]);
        assert_eq!(run.result.removed, vec!["area:ui"]);
        assert_eq!(store.labels(7), vec!["bug", "area:core"]);
        assert_eq!(
            store
                .calls_of(StoreOp::Remove)
                .len(),
            1
        );
    }
}
