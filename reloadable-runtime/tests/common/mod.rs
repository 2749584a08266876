//! Shared fixtures: a tiny line-based provider whose sources look like
//!
//! ```text
//! # comment
//! area = add
//! shape = class
//! ```

#![allow(dead_code)]

use std::fs;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::time::Duration;

use reloadable_core::error::source_invalid;
use reloadable_core::{read_source, ReloadError, UnitImplementation, UnitKind, UnitName};
use tempfile::TempDir;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Op {
    Add,
    Mul,
    Sub,
    Class,
}

impl Op {
    pub fn apply(&self, a: i64, b: i64) -> i64 {
        match self {
            Op::Add => a + b,
            Op::Mul => a * b,
            Op::Sub => a - b,
            Op::Class => 0,
        }
    }
}

impl UnitImplementation for Op {
    fn kind(&self) -> UnitKind {
        match self {
            Op::Class => UnitKind::Class,
            _ => UnitKind::Function,
        }
    }
}

pub fn provide_op(path: &Path, name: &UnitName) -> Result<Op, ReloadError> {
    let text = read_source(path)?;
    for line in text.lines().map(str::trim) {
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let Some((key, value)) = line.split_once('=') else {
            return Err(source_invalid(path, format!("expected `name = op`, got `{line}`")));
        };
        if key.trim() != name.as_str() {
            continue;
        }
        return match value.trim() {
            "add" => Ok(Op::Add),
            "mul" => Ok(Op::Mul),
            "sub" => Ok(Op::Sub),
            "class" => Ok(Op::Class),
            other => Err(source_invalid(path, format!("unknown operation `{other}`"))),
        };
    }
    Err(ReloadError::MemberMissing {
        name: name.clone(),
        path: path.to_path_buf(),
    })
}

pub fn scratch() -> TempDir {
    tempfile::tempdir().expect("tempdir")
}

pub fn write_source(dir: &TempDir, file: &str, contents: &str) -> PathBuf {
    let path = dir.path().join(file);
    fs::write(&path, contents).expect("write source");
    path
}

/// Poll `condition` every 20ms until it holds or `timeout` elapses.
pub async fn wait_until(timeout: Duration, mut condition: impl FnMut() -> bool) -> bool {
    let deadline = tokio::time::Instant::now() + timeout;
    loop {
        if condition() {
            return true;
        }
        if tokio::time::Instant::now() >= deadline {
            return false;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
}

/// Run `future` with a timeout long enough for slow CI file systems.
pub async fn within<F: Future>(future: F) -> F::Output {
    tokio::time::timeout(Duration::from_secs(10), future)
        .await
        .expect("timed out")
}
