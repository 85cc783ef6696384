// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Filesystem subscription for newly created input units

use crate::error::EngineError;
use notify::event::{AccessKind, AccessMode, ModifyKind, RenameMode};
use notify::{Config as NotifyConfig, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::path::{Path, PathBuf};
use tokio::sync::mpsc;
use tracing::{debug, warn};

/// Whether the platform watcher reports a writer closing a file.
///
/// Where it does, a unit is ready once its writer closes it. Elsewhere the
/// source waits for the unit's size to settle.
pub(crate) const REPORTS_CLOSE: bool = cfg!(any(target_os = "linux", target_os = "android"));

/// A unit observed under the watched location
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum UnitEvent {
    /// The path appeared; its writer may still be writing
    Created(PathBuf),
    /// The writer closed the file, or it was moved in whole
    Ready(PathBuf),
}

/// Live subscription to unit events under one location.
///
/// Dropping the watcher releases the subscription.
pub(crate) struct UnitWatcher {
    _watcher: RecommendedWatcher,
    units: mpsc::UnboundedReceiver<Result<UnitEvent, notify::Error>>,
}

impl UnitWatcher {
    pub(crate) fn subscribe(location: &Path) -> Result<Self, EngineError> {
        let (tx, units) = mpsc::unbounded_channel();
        let mut watcher = RecommendedWatcher::new(
            move |res: Result<Event, notify::Error>| match res {
                Ok(event) => {
                    for unit in unit_events(event) {
                        let _ = tx.send(Ok(unit));
                    }
                }
                Err(e) => {
                    let _ = tx.send(Err(e));
                }
            },
            NotifyConfig::default(),
        )?;
        watcher.watch(location, RecursiveMode::Recursive)?;
        debug!(location = %location.display(), "watching for new units");

        Ok(Self {
            _watcher: watcher,
            units,
        })
    }

    /// Wait for the next unit event; `None` once the subscription closed
    pub(crate) async fn next_unit(&mut self) -> Option<Result<UnitEvent, EngineError>> {
        let unit = self.units.recv().await?;
        Some(unit.map_err(|e| {
            warn!(error = %e, "watch error");
            EngineError::from(e)
        }))
    }
}

/// Units an event creates or completes; directories are not units
fn unit_events(event: Event) -> Vec<UnitEvent> {
    let (paths, ready) = match event.kind {
        EventKind::Create(_) => (event.paths, false),
        EventKind::Access(AccessKind::Close(AccessMode::Write)) => (event.paths, true),
        EventKind::Modify(ModifyKind::Name(RenameMode::To)) => (event.paths, true),
        EventKind::Modify(ModifyKind::Name(RenameMode::Both)) => {
            (event.paths.into_iter().skip(1).collect(), true)
        }
        _ => (Vec::new(), false),
    };
    paths
        .into_iter()
        .filter(|path| !path.is_dir())
        .map(|path| {
            if ready {
                UnitEvent::Ready(path)
            } else {
                UnitEvent::Created(path)
            }
        })
        .collect()
}

#[cfg(test)]
#[path = "watch_tests.rs"]
mod tests;
