//! Filepath: src/infra/config.rs
//! Labeler configuration: layered loading, typed validation, starter file.
//!
//! Sources, lowest to highest precedence:
//!   1) the config file (`--config`, or the first candidate that exists)
//!   2) `DIRLABEL_*` environment variables (scalar keys only)
//!
//! `RawConfig` mirrors the file; `RawConfig::validate` turns it into a
//! `LabelerConfig` the engine trusts without further shape checks.

use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::{
    cli::{AppContext, InitArgs},
    core::{decision::Rule, namespace::NamespacePolicy, pattern::MatchOptions},
};

/// Only supported schema version.
pub const CONFIG_VERSION: u32 = 1;

/// Searched in order when no path is given.
pub const CONFIG_CANDIDATES: &[&str] = &[
    ".github/dirlabel.yml",
    ".github/dirlabel.yaml",
    "dirlabel.yml",
    "dirlabel.yaml",
    "dirlabel.toml",
    "dirlabel.json",
];

/// Environment prefix for overrides.
pub const ENV_PREFIX: &str = "DIRLABEL";

/// Unioned into every rule's excludes unless `useDefaultExcludes: false`.
pub const DEFAULT_EXCLUDES: &[&str] = &[
    // Version control
    ".git/**",
    ".svn/**",
    ".hg/**",
    // Editors and IDEs
    ".idea/**",
    ".vscode/**",
    // Dependencies
    "node_modules/**",
    "vendor/**",
    // Lockfiles
    "**/package-lock.json",
    "**/yarn.lock",
    "**/pnpm-lock.yaml",
    "**/Cargo.lock",
    "**/Gemfile.lock",
    "**/poetry.lock",
    "**/composer.lock",
    "**/go.sum",
];

/// Configuration failures.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError
{
    #[error("no configuration file found (searched: {})", .searched.join(", "))]
    NotFound
    {
        searched: Vec<String>
    },

    #[error("failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),

    #[error("unsupported configuration version {found} (expected {expected})", expected = CONFIG_VERSION)]
    UnsupportedVersion
    {
        found: u32
    },

    #[error("rule #{index} has an empty label")]
    EmptyLabel
    {
        index: usize
    },

    #[error("rule #{index} ({label:?}) has no include patterns")]
    EmptyInclude
    {
        index: usize, label: String
    },

    #[error("namespace delimiter must be a single character, got {0:?}")]
    InvalidDelimiter(String),
}

fn default_true() -> bool
{
    true
}

fn default_delimiter() -> String
{
    ':'.to_string()
}

/// Configuration as written on disk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawConfig
{
    pub version: u32,

    #[serde(default)]
    pub rules: Vec<Rule>,

    #[serde(default)]
    pub options: MatchOptions,

    #[serde(default)]
    pub namespaces: NamespacePolicy,

    #[serde(
        rename = "useDefaultExcludes",
        alias = "usedefaultexcludes",
        alias = "use_default_excludes",
        default = "default_true"
    )]
    pub use_default_excludes: bool,

    /// 0 = unlimited
    #[serde(rename = "maxLabels", alias = "maxlabels", alias = "max_labels", default)]
    pub max_labels: usize,

    #[serde(
        rename = "createMissingLabels",
        alias = "createmissinglabels",
        alias = "create_missing_labels",
        default = "default_true"
    )]
    pub create_missing_labels: bool,

    #[serde(
        rename = "namespaceDelimiter",
        alias = "namespacedelimiter",
        alias = "namespace_delimiter",
        default = "default_delimiter"
    )]
    pub namespace_delimiter: String,
}

/// Validated configuration.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LabelerConfig
{
    pub rules: Vec<Rule>,
    pub options: MatchOptions,
    pub namespaces: NamespacePolicy,
    pub use_default_excludes: bool,
    pub max_labels: usize,
    pub create_missing_labels: bool,
    pub namespace_delimiter: char,
}

impl RawConfig
{
    /// Check the documented invariants and produce the typed form.
    pub fn validate(self) -> Result<LabelerConfig, ConfigError>
    {
        if self.version != CONFIG_VERSION
        {
            return Err(ConfigError::UnsupportedVersion { found: self.version });
        }

        for (index, rule) in self
            .rules
            .iter()
            .enumerate()
        {
            if rule
                .label
                .trim()
                .is_empty()
            {
                return Err(ConfigError::EmptyLabel { index });
            }
            if rule
                .include
                .is_empty()
            {
                return Err(ConfigError::EmptyInclude { index, label: rule.label.clone() });
            }
        }

        let mut chars = self
            .namespace_delimiter
            .chars();
        let namespace_delimiter = match (chars.next(), chars.next())
        {
            (Some(c), None) => c,
            _ => return Err(ConfigError::InvalidDelimiter(self.namespace_delimiter)),
        };

        let cfg = LabelerConfig {
            rules: self.rules,
            options: self.options,
            namespaces: self.namespaces,
            use_default_excludes: self.use_default_excludes,
            max_labels: self.max_labels,
            create_missing_labels: self.create_missing_labels,
            namespace_delimiter,
        };

        for label in cfg.duplicate_labels()
        {
            warn!(label, "label is defined by more than one rule; earlier rules win ties");
        }

        Ok(cfg)
    }
}

impl LabelerConfig
{
    /// Default excludes in effect for this configuration.
    pub fn default_excludes(&self) -> Vec<String>
    {
        if !self.use_default_excludes
        {
            return Vec::new();
        }

        DEFAULT_EXCLUDES
            .iter()
            .map(|s| s.to_string())
            .collect()
    }

    /// Labels named by more than one rule, in first-seen order.
    pub fn duplicate_labels(&self) -> Vec<&str>
    {
        use itertools::Itertools;

        self.rules
            .iter()
            .map(|r| r.label.as_str())
            .duplicates()
            .collect()
    }
}

fn env_source() -> config::Environment
{
    config::Environment::with_prefix(ENV_PREFIX)
        .prefix_separator("_")
        .separator("__")
        .try_parsing(true)
}

/// First existing candidate under `root`.
pub fn discover(root: &Path) -> Option<PathBuf>
{
    CONFIG_CANDIDATES
        .iter()
        .map(|c| root.join(c))
        .find(|p| p.is_file())
}

/// Load from `path`, or discover a candidate in the working directory.
pub fn load_config(path: Option<&Path>) -> Result<LabelerConfig, ConfigError>
{
    let file = match path
    {
        Some(p) => p.to_path_buf(),
        None => discover(Path::new(".")).ok_or_else(|| ConfigError::NotFound {
            searched: CONFIG_CANDIDATES
                .iter()
                .map(|s| s.to_string())
                .collect(),
        })?,
    };

    debug!(path = %file.display(), "loading configuration");

    let raw: RawConfig = config::Config::builder()
        .add_source(config::File::from(file.as_path()))
        .add_source(env_source())
        .build()?
        .try_deserialize()?;

    raw.validate()
}

/// Parse configuration text directly (no environment layer).
pub fn parse_str(
    text: &str,
    format: config::FileFormat,
) -> Result<LabelerConfig, ConfigError>
{
    let raw: RawConfig = config::Config::builder()
        .add_source(config::File::from_str(text, format))
        .build()?
        .try_deserialize()?;

    raw.validate()
}

/// Configuration written by `dirlabel init`.
pub fn starter_config() -> RawConfig
{
    let rule = |label: &str, include: &[&str], priority: Option<i64>| Rule {
        label: label.to_string(),
        include: include
            .iter()
            .map(|s| s.to_string())
            .collect(),
        exclude: Vec::new(),
        priority,
    };

    RawConfig {
        version: CONFIG_VERSION,
        rules: vec![
            rule("area:docs", &["docs/**", "**/*.md"], None),
            rule("area:ci", &[".github/**"], None),
            rule("area:core", &["src/core/**"], Some(10)),
            rule("area:src", &["src/**"], None),
            rule("area:tests", &["tests/**", "**/*_test.*"], None),
        ],
        options: MatchOptions::default(),
        namespaces: NamespacePolicy::new(["area"], ["meta"]),
        use_default_excludes: true,
        max_labels: 0,
        create_missing_labels: true,
        namespace_delimiter: default_delimiter(),
    }
}

/// Write a starter `dirlabel.yml` into `args.path`.
pub fn init(
    args: InitArgs,
    ctx: &AppContext,
) -> anyhow::Result<()>
{
    let config_path = args
        .path
        .join("dirlabel.yml");

    if config_path.exists() && !args.force
    {
        anyhow::bail!(
            "Config file already exists at {}. Use --force to overwrite.",
            config_path.display()
        );
    }

    let yaml = serde_yaml::to_string(&starter_config()).context("Failed to serialize starter config")?;

    std::fs::write(&config_path, yaml).context("Failed to write config file")?;

    if !ctx.quiet
    {
        println!("Created config file at {}", config_path.display());
    }
    Ok(())
}

#[cfg(test)]
mod tests
{
    use config::FileFormat;
    use tempfile::TempDir;

    use super::*;

    const YAML: &str = r#"
version: 1
options:
  dot: false
  nocase: true
  matchBase: true
namespaces:
  exclusive: [size]
  additive: [meta]
useDefaultExcludes: false
rules:
  - label: "area:src"
    include: ["src/**"]
    exclude: ["**/*.snap"]
    priority: 5
"#;

    #[test]
    fn parses_documented_schema()
    {
        let cfg = parse_str(YAML, FileFormat::Yaml).unwrap();

        assert!(!cfg.options.dot);
        assert!(cfg.options.nocase);
        assert!(cfg.options.match_base);
        assert!(
            cfg.namespaces
                .exclusive
                .contains("size")
        );
        assert!(!cfg.use_default_excludes);
        assert!(
            cfg.default_excludes()
                .is_empty()
        );
        assert_eq!(cfg.rules[0].exclude, vec!["**/*.snap"]);
        assert_eq!(cfg.rules[0].priority, Some(5));
    }

    #[test]
    fn applies_defaults()
    {
        let cfg = parse_str("version: 1\nrules: []\n", FileFormat::Yaml).unwrap();

        assert_eq!(cfg.options, MatchOptions::default());
        assert!(cfg.use_default_excludes);
        assert_eq!(
            cfg.default_excludes()
                .len(),
            DEFAULT_EXCLUDES.len()
        );
        assert_eq!(cfg.max_labels, 0);
        assert!(cfg.create_missing_labels);
        assert_eq!(cfg.namespace_delimiter, ':');
    }

    #[test]
    fn rejects_structural_errors()
    {
        let err = parse_str("version: 2\n", FileFormat::Yaml).unwrap_err();
        assert!(matches!(err, ConfigError::UnsupportedVersion { found: 2 }));

        let err = parse_str(
            "version: 1\nrules:\n  - label: a\n    include: []\n",
            FileFormat::Yaml,
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::EmptyInclude { index: 0, .. }));

        let err = parse_str(
            "version: 1\nrules:\n  - label: ' '\n    include: ['x']\n",
            FileFormat::Yaml,
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::EmptyLabel { index: 0 }));

        let err = parse_str("version: 1\nnamespaceDelimiter: '::'\n", FileFormat::Yaml).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidDelimiter(_)));
    }

    #[test]
    fn duplicate_labels_are_reported_not_rejected()
    {
        let cfg = parse_str(
            "version: 1\nrules:\n  - label: a\n    include: ['x/**']\n  - label: a\n    include: ['y/**']\n",
            FileFormat::Yaml,
        )
        .unwrap();
        assert_eq!(cfg.duplicate_labels(), vec!["a"]);
    }

    #[test]
    fn loads_file_and_discovers_candidates()
    {
        let tmp = TempDir::new().unwrap();
        let github = tmp
            .path()
            .join(".github");
        std::fs::create_dir_all(&github).unwrap();
        let path = github.join("dirlabel.yml");
        std::fs::write(&path, YAML).unwrap();

        assert_eq!(discover(tmp.path()), Some(path.clone()));

        let cfg = load_config(Some(&path)).unwrap();
        assert_eq!(
            cfg.rules
                .len(),
            1
        );
    }

    #[test]
    fn starter_config_round_trips_through_yaml()
    {
        let yaml = serde_yaml::to_string(&starter_config()).unwrap();
        let cfg = parse_str(&yaml, FileFormat::Yaml).unwrap();
        assert_eq!(
            cfg.rules
                .len(),
            5
        );
        assert!(
            cfg.namespaces
                .exclusive
                .contains("area")
        );
    }
}
