// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use notify::event::{AccessKind, AccessMode, CreateKind, RemoveKind};
use std::time::Duration;

fn event(kind: EventKind, paths: Vec<PathBuf>) -> Event {
    let mut event = Event::new(kind);
    event.paths = paths;
    event
}

fn unit() -> PathBuf {
    PathBuf::from("/data/in/a.csv")
}

#[test]
fn create_events_are_not_yet_ready() {
    let units = unit_events(event(EventKind::Create(CreateKind::File), vec![unit()]));
    assert_eq!(units, vec![UnitEvent::Created(unit())]);
}

#[test]
fn closing_after_write_makes_a_unit_ready() {
    let units = unit_events(event(
        EventKind::Access(AccessKind::Close(AccessMode::Write)),
        vec![unit()],
    ));
    assert_eq!(units, vec![UnitEvent::Ready(unit())]);
}

#[test]
fn rename_into_location_yields_destination() {
    let units = unit_events(event(
        EventKind::Modify(ModifyKind::Name(RenameMode::Both)),
        vec![PathBuf::from("/tmp/a.part"), unit()],
    ));
    assert_eq!(units, vec![UnitEvent::Ready(unit())]);

    let units = unit_events(event(
        EventKind::Modify(ModifyKind::Name(RenameMode::To)),
        vec![unit()],
    ));
    assert_eq!(units, vec![UnitEvent::Ready(unit())]);
}

#[test]
fn other_events_are_ignored() {
    for kind in [
        EventKind::Remove(RemoveKind::File),
        EventKind::Access(AccessKind::Any),
        EventKind::Access(AccessKind::Close(AccessMode::Read)),
        EventKind::Modify(ModifyKind::Name(RenameMode::From)),
    ] {
        let units = unit_events(event(kind, vec![unit()]));
        assert!(units.is_empty(), "{kind:?} produced a unit");
    }
}

#[test]
fn directories_are_ignored() {
    let dir = tempfile::tempdir().unwrap();
    let units = unit_events(event(
        EventKind::Create(CreateKind::Folder),
        vec![dir.path().to_path_buf()],
    ));
    assert!(units.is_empty());
}

#[cfg(any(target_os = "linux", target_os = "android"))]
#[tokio::test]
async fn subscription_reports_creation_then_close() {
    let dir = tempfile::tempdir().unwrap();
    let location = dir.path().canonicalize().unwrap();
    let mut watcher = UnitWatcher::subscribe(&location).unwrap();

    let unit = location.join("new.csv");
    std::fs::write(&unit, "id\n1\n").unwrap();

    let mut events = Vec::new();
    while !events.contains(&UnitEvent::Ready(unit.clone())) {
        let next = tokio::time::timeout(Duration::from_secs(10), watcher.next_unit())
            .await
            .unwrap()
            .unwrap()
            .unwrap();
        events.push(next);
    }
    assert_eq!(events.first(), Some(&UnitEvent::Created(unit.clone())));
}
