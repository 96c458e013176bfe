//! Filepath: src/core/pattern.rs
//! Glob compilation for label rules, backed by `globset`.
//!
//! Supported syntax: `*` (one segment), `**` (any depth), `?`, `[...]`
//! classes and `{a,b}` alternation. Three options shape matching:
//! - `dot`: wildcards may match dot-prefixed segments (default true)
//! - `nocase`: case-insensitive matching
//! - `match_base`: a pattern without `/` matches the file's base name anywhere
//!
//! A compiled pattern is immutable and a pure function of a normalized path,
//! so one compilation can serve any number of files and threads.

use globset::{GlobBuilder, GlobMatcher};
use serde::{Deserialize, Serialize};

use crate::core::normalize::{base_name, normalize};

/// Matching switches shared by every pattern of a configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MatchOptions
{
    /// Let wildcards match dot-prefixed segments
    pub dot: bool,

    /// Case-insensitive matching
    pub nocase: bool,

    /// Slash-free patterns match the base name
    #[serde(rename = "matchBase", alias = "matchbase", alias = "match_base")]
    pub match_base: bool,
}

impl Default for MatchOptions
{
    fn default() -> Self
    {
        Self { dot: true, nocase: false, match_base: false }
    }
}

/// Glob compilation failure.
#[derive(Debug, thiserror::Error)]
pub enum PatternError
{
    #[error("invalid glob pattern {pattern:?}: {source}")]
    InvalidGlob
    {
        pattern: String,
        #[source]
        source: globset::Error,
    },
}

/// One reusable glob with its source text and optional rule priority.
#[derive(Debug, Clone)]
pub struct CompiledPattern
{
    source: String,
    matcher: GlobMatcher,
    base_only: bool,
    dot_guard: Option<DotGuard>,
    priority: Option<i64>,
}

impl CompiledPattern
{
    /// Normalized pattern text.
    pub fn source(&self) -> &str
    {
        &self.source
    }

    /// Explicit priority inherited from the owning rule, if any.
    pub fn priority(&self) -> Option<i64>
    {
        self.priority
    }

    /// Tie-break score: length of the pattern text, in characters.
    pub fn specificity(&self) -> usize
    {
        self.source
            .chars()
            .count()
    }

    /// Test a normalized path against this pattern.
    pub fn matches(
        &self,
        path: &str,
    ) -> bool
    {
        let subject = if self.base_only { base_name(path) } else { path };

        if !self
            .matcher
            .is_match(subject)
        {
            return false;
        }

        match &self.dot_guard
        {
            Some(guard) => guard.admits(subject),
            None => true,
        }
    }
}

/// Compile `patterns` with shared `options`, tagging each with `priority`.
pub fn compile(
    patterns: &[String],
    options: MatchOptions,
    priority: Option<i64>,
) -> Result<Vec<CompiledPattern>, PatternError>
{
    patterns
        .iter()
        .map(|p| compile_one(p, options, priority))
        .collect()
}

/// Compile a single glob.
pub fn compile_one(
    pattern: &str,
    options: MatchOptions,
    priority: Option<i64>,
) -> Result<CompiledPattern, PatternError>
{
    let source = normalize(pattern).into_owned();

    let matcher = build_glob(&source, options.nocase)?;
    let base_only = options.match_base && !source.contains('/');
    let dot_guard = if options.dot { None } else { Some(DotGuard::new(&source, options.nocase)?) };

    Ok(CompiledPattern { source, matcher, base_only, dot_guard, priority })
}

fn build_glob(
    source: &str,
    nocase: bool,
) -> Result<GlobMatcher, PatternError>
{
    GlobBuilder::new(source)
        .literal_separator(true)
        .case_insensitive(nocase)
        .empty_alternates(true)
        .build()
        .map(|g| g.compile_matcher())
        .map_err(|source_err| PatternError::InvalidGlob {
            pattern: source.to_string(),
            source: source_err,
        })
}

/// Rejects matches where a wildcard swallowed a dot-prefixed segment.
///
/// Re-walks the path segment by segment against each brace alternative. A
/// hidden segment must line up with a pattern segment that itself starts
/// with a literal `.`; `**` never consumes one.
#[derive(Debug, Clone)]
struct DotGuard
{
    alternatives: Vec<Vec<Segment>>,
}

#[derive(Debug, Clone)]
enum Segment
{
    Globstar,
    Part
    {
        matcher: GlobMatcher,
        explicit_dot: bool,
    },
}

impl DotGuard
{
    fn new(
        source: &str,
        nocase: bool,
    ) -> Result<Self, PatternError>
    {
        let mut alternatives = Vec::new();

        for alt in expand_braces(source)
        {
            let segments = alt
                .split('/')
                .map(|seg| -> Result<Segment, PatternError> {
                    if seg == "**"
                    {
                        return Ok(Segment::Globstar);
                    }
                    Ok(Segment::Part { matcher: build_glob(seg, nocase)?, explicit_dot: seg.starts_with('.') })
                })
                .collect::<Result<Vec<_>, PatternError>>()?;
            alternatives.push(segments);
        }

        Ok(Self { alternatives })
    }

    fn admits(
        &self,
        path: &str,
    ) -> bool
    {
        let parts: Vec<&str> = path
            .split('/')
            .collect();

        if !parts
            .iter()
            .any(|seg| is_hidden(seg))
        {
            return true;
        }

        self.alternatives
            .iter()
            .any(|segments| walk(segments, &parts))
    }
}

fn is_hidden(seg: &str) -> bool
{
    seg.starts_with('.') && seg != "." && seg != ".."
}

/// Dot-aware segment match of `path` against `pattern`.
fn walk(
    pattern: &[Segment],
    path: &[&str],
) -> bool
{
    let Some((head, rest)) = pattern.split_first()
    else
    {
        return path.is_empty();
    };

    match head
    {
        Segment::Globstar =>
        {
            // Consume zero or more visible segments
            for skip in 0..=path.len()
            {
                if walk(rest, &path[skip..])
                {
                    return true;
                }
                if skip < path.len() && is_hidden(path[skip])
                {
                    return false;
                }
            }
            false
        }
        Segment::Part { matcher, explicit_dot } => match path.split_first()
        {
            Some((seg, tail)) =>
            {
                (*explicit_dot || !is_hidden(seg)) && matcher.is_match(seg) && walk(rest, tail)
            }
            None => false,
        },
    }
}

/// Expand `{a,b}` alternation into plain patterns. Braces without a
/// top-level comma, or without a closing brace, stay literal.
fn expand_braces(pattern: &str) -> Vec<String>
{
    let Some(open) = pattern.find('{')
    else
    {
        return vec![pattern.to_string()];
    };

    let mut depth = 0usize;
    let mut close = None;
    let mut commas = Vec::new();

    for (offset, c) in pattern[open..].char_indices()
    {
        let at = open + offset;
        match c
        {
            '{' => depth += 1,
            '}' =>
            {
                depth -= 1;
                if depth == 0
                {
                    close = Some(at);
                    break;
                }
            }
            ',' if depth == 1 => commas.push(at),
            _ =>
            {}
        }
    }

    let Some(close) = close
    else
    {
        return vec![pattern.to_string()];
    };

    // Literal braces: keep the head as-is and expand whatever follows
    if commas.is_empty()
    {
        let head = &pattern[..=close];
        return expand_braces(&pattern[close + 1..])
            .into_iter()
            .map(|tail| format!("{head}{tail}"))
            .collect();
    }

    let prefix = &pattern[..open];
    let suffix = &pattern[close + 1..];

    let mut bounds = Vec::with_capacity(commas.len() + 2);
    bounds.push(open);
    bounds.extend(commas);
    bounds.push(close);

    bounds
        .windows(2)
        .flat_map(|w| expand_braces(&format!("{prefix}{}{suffix}", &pattern[w[0] + 1..w[1]])))
        .collect()
}
