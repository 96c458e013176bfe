//! Shared test utilities for integration tests
//!
//! Provides a labeler config fixture and the binary handle
//! used across multiple test files.

#![allow(dead_code)]

use std::process::Command;

use assert_cmd::prelude::*;
use assert_fs::prelude::*;

/// Rules exercising priority, specificity and namespaces.
pub const CONFIG_YAML: &str = r#"version: 1
namespaces:
  exclusive: [area, size]
  additive: [meta]
rules:
  - label: "area:components"
    include: ["src/components/**"]
    priority: 10
  - label: "area:core"
    include: ["src/components/core/**"]
    priority: 50
  - label: "area:docs"
    include: ["docs/**", "**/*.md"]
"#;

/// Temporary project root with `dirlabel.yml` written at its top.
pub fn make_config_fixture(yaml: &str) -> assert_fs::TempDir
{
    // Initialize the temporary project root
    let tmp = assert_fs::TempDir::new().expect("tempdir");

    // Write the config where discovery will find it
    tmp.child("dirlabel.yml")
        .write_str(yaml)
        .expect("write config");

    tmp
}

/// The `dirlabel` binary, running inside `dir`.
pub fn dirlabel(dir: &std::path::Path) -> Command
{
    let mut cmd = Command::cargo_bin("dirlabel").expect("dirlabel binary");
    cmd.current_dir(dir)
        .env_remove("RUST_LOG")
        .arg("--no-color");
    cmd
}
