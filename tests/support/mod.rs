#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};

use assert_cmd::Command;
use serde_json::Value;
use tempfile::TempDir;

/// An isolated VeraTasks data directory.
pub struct TestHome {
    dir: TempDir,
}

impl TestHome {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().expect("failed to create tempdir");
        Self { dir }
    }

    /// A home with `email` already signed in.
    pub fn signed_in(email: &str) -> Self {
        let home = Self::new();
        home.login(email);
        home
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn cmd(&self) -> Command {
        let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("vt"));
        cmd.env("VERATASKS_HOME", self.dir.path());
        cmd.env_remove("RUST_LOG");
        cmd
    }

    pub fn login(&self, email: &str) -> Value {
        self.json(&["login", email])
    }

    pub fn write_file(&self, name: &str, contents: &str) -> PathBuf {
        let path = self.dir.path().join(name);
        fs::write(&path, contents).expect("write file");
        path
    }

    pub fn write_config(&self, contents: &str) -> PathBuf {
        self.write_file("veratasks.toml", contents)
    }

    /// Run with `--json`, assert success and return the parsed envelope.
    pub fn json(&self, args: &[&str]) -> Value {
        let output = self
            .cmd()
            .args(args)
            .arg("--json")
            .assert()
            .success()
            .get_output()
            .stdout
            .clone();
        serde_json::from_slice(&output).expect("json envelope")
    }

    /// Run with `--json`, assert the exit code and return the error envelope.
    pub fn json_err(&self, args: &[&str], code: i32) -> Value {
        let output = self
            .cmd()
            .args(args)
            .arg("--json")
            .assert()
            .code(code)
            .get_output()
            .stdout
            .clone();
        serde_json::from_slice(&output).expect("json error envelope")
    }

    pub fn new_task(&self, title: &str, extra: &[&str]) -> String {
        let mut args = vec!["task", "new", title];
        args.extend_from_slice(extra);
        let value = self.json(&args);
        value["data"]["id"].as_str().expect("task id").to_string()
    }

    pub fn new_project(&self, name: &str) -> String {
        let value = self.json(&["project", "new", name]);
        value["data"]["id"].as_str().expect("project id").to_string()
    }

    pub fn show_task(&self, id: &str) -> Value {
        self.json(&["task", "show", id])["data"].clone()
    }
}
