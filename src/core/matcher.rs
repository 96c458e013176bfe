//! Filepath: src/core/matcher.rs
//! Include/exclude evaluation of one path against one pattern set.
//!
//! Exclusion is unconditional: any matching exclude wins before a single
//! include is looked at. Among matching includes the winner is chosen by
//! priority, then specificity (pattern length), then definition order.

use std::cmp::Ordering;

use serde::Serialize;

use crate::core::{normalize::normalize, pattern::CompiledPattern};

/// Ordering key shared by pattern- and rule-level tie-breaks.
///
/// Unset priority ranks as 0. Larger is stronger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct Rank
{
    pub priority: i64,
    pub specificity: usize,
}

impl Rank
{
    pub fn new(
        priority: Option<i64>,
        specificity: usize,
    ) -> Self
    {
        Self { priority: priority.unwrap_or(0), specificity }
    }

    /// Strongest-first comparison, for `sort_by`.
    pub fn strongest_first(
        a: &Self,
        b: &Self,
    ) -> Ordering
    {
        b.cmp(a)
    }
}

/// The include pattern that won for a path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatternHit<'p>
{
    pub pattern: &'p str,
    pub specificity: usize,
    pub priority: Option<i64>,
}

impl PatternHit<'_>
{
    pub fn rank(&self) -> Rank
    {
        Rank::new(self.priority, self.specificity)
    }
}

/// Outcome of evaluating one path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MatchResult<'p>
{
    /// An exclude pattern matched; includes were never consulted
    Excluded
    {
        pattern: &'p str
    },
    /// No include pattern matched
    NoMatch,
    /// Best matching include
    Matched(PatternHit<'p>),
}

impl<'p> MatchResult<'p>
{
    pub fn is_match(&self) -> bool
    {
        matches!(self, MatchResult::Matched(_))
    }

    pub fn hit(&self) -> Option<&PatternHit<'p>>
    {
        match self
        {
            MatchResult::Matched(hit) => Some(hit),
            _ => None,
        }
    }

    pub fn into_hit(self) -> Option<PatternHit<'p>>
    {
        match self
        {
            MatchResult::Matched(hit) => Some(hit),
            _ => None,
        }
    }
}

/// Evaluate `path` against the include and exclude sets.
pub fn evaluate<'p>(
    path: &str,
    includes: &'p [CompiledPattern],
    excludes: &'p [CompiledPattern],
) -> MatchResult<'p>
{
    let path = normalize(path);
    evaluate_normalized(&path, includes, [excludes])
}

/// Same as [`evaluate`] for an already-normalized path, with excludes split
/// across several slices (rule-local plus shared defaults).
pub fn evaluate_normalized<'p, const N: usize>(
    path: &str,
    includes: &'p [CompiledPattern],
    exclude_sets: [&'p [CompiledPattern]; N],
) -> MatchResult<'p>
{
    // 1) Exclusion short-circuits everything
    if let Some(ex) = exclude_sets
        .iter()
        .flat_map(|set| set.iter())
        .find(|ex| ex.matches(path))
    {
        return MatchResult::Excluded { pattern: ex.source() };
    }

    // 2) Best include; strictly-greater keeps the first-defined on ties
    let mut best: Option<PatternHit<'p>> = None;

    for inc in includes
    {
        if !inc.matches(path)
        {
            continue;
        }

        let hit = PatternHit {
            pattern: inc.source(),
            specificity: inc.specificity(),
            priority: inc.priority(),
        };

        let stronger = match &best
        {
            Some(cur) => hit.rank() > cur.rank(),
            None => true,
        };

        if stronger
        {
            best = Some(hit);
        }
    }

    match best
    {
        Some(hit) => MatchResult::Matched(hit),
        None => MatchResult::NoMatch,
    }
}

#[cfg(test)]
mod tests
{
    use proptest::prelude::*;

    use super::*;
    use crate::core::pattern::{MatchOptions, compile, compile_one};

    fn set(
        globs: &[&str],
        priority: Option<i64>,
    ) -> Vec<CompiledPattern>
    {
        let owned: Vec<String> = globs
            .iter()
            .map(|g| g.to_string())
            .collect();
        compile(&owned, MatchOptions::default(), priority).unwrap()
    }

    #[test]
    fn exclude_short_circuits()
    {
        let inc = set(&["src/**"], Some(100));
        let exc = set(&["**/*.test.ts"], None);

        let res = evaluate("src/a.test.ts", &inc, &exc);
        assert_eq!(res, MatchResult::Excluded { pattern: "**/*.test.ts" });
        assert!(!res.is_match());
    }

    #[test]
    fn no_include_means_no_match()
    {
        let inc = set(&["docs/**"], None);
        assert_eq!(evaluate("src/lib.rs", &inc, &[]), MatchResult::NoMatch);
    }

    #[test]
    fn longer_pattern_wins_at_equal_priority()
    {
        let inc = set(&["src/**", "src/components/**"], None);
        let hit = evaluate("src/components/Button.tsx", &inc, &[])
            .into_hit()
            .unwrap();
        assert_eq!(hit.pattern, "src/components/**");
        assert_eq!(hit.specificity, "src/components/**".len());
    }

    #[test]
    fn priority_beats_specificity()
    {
        let mut inc = vec![compile_one("src/components/**", MatchOptions::default(), Some(1)).unwrap()];
        inc.push(compile_one("src/**", MatchOptions::default(), Some(5)).unwrap());

        let hit = evaluate("src/components/Button.tsx", &inc, &[])
            .into_hit()
            .unwrap();
        assert_eq!(hit.pattern, "src/**");
        assert_eq!(hit.priority, Some(5));
    }

    #[test]
    fn first_defined_wins_exact_ties()
    {
        let inc = set(&["src/*.rs", "*/lib.rs"], None);
        let hit = evaluate("src/lib.rs", &inc, &[])
            .into_hit()
            .unwrap();
        assert_eq!(hit.pattern, "src/*.rs");
    }

    #[test]
    fn path_is_normalized_before_matching()
    {
        let inc = set(&["src/**"], None);
        assert!(evaluate(r".\src\main.rs", &inc, &[]).is_match());
    }

    proptest! {
        #[test]
        fn exclusion_beats_any_priority(priority in any::<i64>(), name in "[a-z]{1,8}")
        {
            let inc = set(&["**", "src/**", "src/*.rs"], Some(priority));
            let exc = set(&["**/*.rs"], None);
            let path = format!("src/{name}.rs");
            prop_assert!(!evaluate(&path, &inc, &exc).is_match());
        }
    }
}
