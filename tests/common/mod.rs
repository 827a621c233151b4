//! Shared test helpers for integration tests
//!
//! This module provides common utilities used across all test files.

#![allow(dead_code)]

use assert_cmd::cargo;
use assert_cmd::Command;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Helper to get an orion command
pub fn orion() -> Command {
    Command::new(cargo::cargo_bin!("orion"))
}

/// Two identical slabs, the second moved and turned
pub const BENCH: &str = r#"
name: Bench
shapes:
  slab: { cuboid: [4, 2, 1] }
children:
  - name: Left
    shape: slab
  - name: Right
    shape: slab
    location: { translation: [10, 5, 0], rotation: [0, 30, 75] }
"#;

/// Three subassemblies; `Finger` is the part tests change
pub const GRIPPER: &str = r#"
name: Gripper
shapes:
  plate: { cuboid: [4, 2, 1] }
  finger: { cuboid: [1, 1.5, 3] }
  pin: { cuboid: [0.5, 0.75, 2] }
children:
  - name: Base
    children:
      - { name: Plate, shape: plate, color: [0.2, 0.2, 0.2] }
      - { name: Pin, shape: pin }
  - name: Arm
    location: { translation: [0, 0, 5], rotation: [0, 0, 90] }
    children:
      - { name: Finger, shape: finger, color: [1, 0, 0] }
  - name: Spare
    location: { translation: [20, 0, 0] }
    children:
      - { name: Pin, shape: pin }
"#;

/// Two different parts that both want the name `Widget`
pub const WIDGETS: &str = r#"
name: Root
shapes:
  small: { cuboid: [1, 2, 3] }
  large: { cuboid: [2, 4, 7] }
children:
  - name: A
    children:
      - { name: Widget, shape: small }
  - name: B
    children:
      - { name: Widget, shape: large }
"#;

/// Write an assembly document into `dir` and return its path
pub fn write_cad(dir: &Path, file_name: &str, content: &str) -> PathBuf {
    let path = dir.join(file_name);
    fs::write(&path, content).unwrap();
    path
}

/// Helper to create a project without git in a temp directory
pub fn setup_test_project(content: &str) -> (TempDir, PathBuf) {
    let tmp = TempDir::new().unwrap();
    let cad = write_cad(tmp.path(), "model.yaml", content);
    let project = tmp.path().join("project");
    orion()
        .args(["create", "--name", "demo", "--no-git", "--cad-path"])
        .arg(&cad)
        .arg("--path")
        .arg(&project)
        .assert()
        .success();
    (tmp, project)
}

/// Whether git can be used to make commits in this environment
pub fn git_ready() -> bool {
    let ok = |args: &[&str]| {
        std::process::Command::new("git")
            .args(args)
            .output()
            .map(|o| o.status.success() && !o.stdout.is_empty())
            .unwrap_or(false)
    };
    ok(&["--version"]) && ok(&["config", "--get", "user.name"]) && ok(&["config", "--get", "user.email"])
}
