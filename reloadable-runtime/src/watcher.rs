//! Source watcher: reloads a unit when its source file is created or modified.

use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Weak};
use std::time::Duration;

use notify::{recommended_watcher, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::runtime::Handle;
use tokio::sync::mpsc;

use reloadable_core::error::source_unavailable;
use reloadable_core::{ReloadTrigger, UnitImplementation};

use crate::error::{invalid_configuration, RuntimeError};
use crate::task::{stopped, trigger_reload, TaskControl};
use crate::unit::Reloadable;

/// Watch the parent directory of `path` and reload `unit` on every change to
/// the file itself.
///
/// The file does not have to exist yet; its directory does.
pub(crate) fn spawn_source_watcher<T: UnitImplementation>(
    runtime: &Handle,
    unit: Weak<Reloadable<T>>,
    path: &Path,
    debounce: Duration,
    control: Arc<TaskControl>,
) -> Result<(), RuntimeError> {
    let file_name = path.file_name().map(OsString::from).ok_or_else(|| {
        invalid_configuration(format!("source path {} does not name a file", path.display()))
    })?;
    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    // Canonicalize so event paths (real paths on macOS) share a prefix with
    // the watched directory.
    let dir = fs::canonicalize(&parent).map_err(|e| {
        invalid_configuration(format!(
            "cannot watch directory {} of source {}: {e}",
            parent.display(),
            path.display()
        ))
    })?;

    if !dir.join(&file_name).exists() {
        let err = source_unavailable(
            path,
            std::io::Error::new(std::io::ErrorKind::NotFound, "file does not exist yet"),
        );
        tracing::warn!(unit = %control.unit(), error = %err, "watching for a source file that does not exist yet");
    }

    // One pending slot: notifications that arrive during a reload collapse.
    let (signal_tx, signal_rx) = mpsc::channel::<()>(1);
    let target = file_name.clone();
    let mut watcher: RecommendedWatcher = recommended_watcher(move |event: notify::Result<Event>| {
        match event {
            Ok(event) if is_relevant_event(&event, &target) => {
                let _ = signal_tx.try_send(());
            }
            Ok(_) => {}
            Err(err) => tracing::warn!(error = %err, "watcher event error"),
        }
    })?;
    watcher.watch(&dir, RecursiveMode::NonRecursive)?;
    tracing::info!(
        unit = %control.unit(),
        path = %dir.join(&file_name).display(),
        "watching source for changes",
    );

    runtime.spawn(watch_loop(watcher, signal_rx, unit, debounce, control));
    Ok(())
}

fn is_relevant_event(event: &Event, file_name: &OsString) -> bool {
    matches!(event.kind, EventKind::Create(_) | EventKind::Modify(_))
        && event
            .paths
            .iter()
            .any(|p| p.file_name() == Some(file_name.as_os_str()))
}

async fn watch_loop<T: UnitImplementation>(
    // Dropping the watcher unregisters it, so the loop owns it.
    _watcher: RecommendedWatcher,
    mut signal_rx: mpsc::Receiver<()>,
    unit: Weak<Reloadable<T>>,
    debounce: Duration,
    control: Arc<TaskControl>,
) {
    let mut stop_rx = control.subscribe();
    loop {
        tokio::select! {
            biased;
            _ = stopped(&mut stop_rx) => break,
            signal = signal_rx.recv() => {
                if signal.is_none() {
                    break;
                }
                if !debounce.is_zero() {
                    tokio::select! {
                        biased;
                        _ = stopped(&mut stop_rx) => break,
                        _ = tokio::time::sleep(debounce) => {}
                    }
                }
                while signal_rx.try_recv().is_ok() {}
                if !trigger_reload(&unit, ReloadTrigger::Watcher, &control).await {
                    break;
                }
            }
        }
    }
    tracing::debug!(unit = %control.unit(), "source watcher exited");
}
