//! Filesystem behavior of the durable config object: idempotent writes,
//! comment injection, change-hook dispatch and reload.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use buildmark_core::{BuildmarkError, PersistentConfig};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct ServiceConfig {
    listen: String,
    workers: u32,
    log_level: String,
}

fn service_config() -> ServiceConfig {
    ServiceConfig {
        listen: "0.0.0.0:8080".to_string(),
        workers: 4,
        log_level: "info".to_string(),
    }
}

#[test]
fn save_writes_file_and_load_roundtrips() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("service.yaml");

    let mut cfg = PersistentConfig::new();
    cfg.set_save_path(&path).unwrap();
    cfg.set_value(service_config());
    cfg.save().unwrap();
    assert!(path.exists());

    let mut reloaded: PersistentConfig<ServiceConfig> = PersistentConfig::new();
    reloaded.set_save_path(&path).unwrap();
    assert!(reloaded.load().unwrap());
    assert_eq!(reloaded.value(), Some(&service_config()));
}

#[test]
fn load_missing_file_returns_false() {
    let dir = tempfile::tempdir().unwrap();
    let mut cfg: PersistentConfig<ServiceConfig> = PersistentConfig::new();
    cfg.set_save_path(dir.path().join("absent.yaml")).unwrap();
    assert!(!cfg.load().unwrap());
    assert!(cfg.value().is_none());
}

#[test]
fn save_without_value_is_undefined() {
    let dir = tempfile::tempdir().unwrap();
    let mut cfg: PersistentConfig<ServiceConfig> = PersistentConfig::new();
    cfg.set_save_path(dir.path().join("service.yaml")).unwrap();
    assert!(matches!(
        cfg.save(),
        Err(BuildmarkError::Undefined("save value"))
    ));
}

#[test]
fn identical_content_is_written_at_most_once() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("service.yaml");
    let writes = Arc::new(AtomicUsize::new(0));

    let mut cfg = PersistentConfig::new();
    cfg.set_save_path(&path).unwrap();
    cfg.set_value(service_config());
    let counter = Arc::clone(&writes);
    cfg.set_on_change(Box::new(move |_cfg: &ServiceConfig| {
        counter.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }));

    cfg.save().unwrap();
    cfg.save().unwrap();
    assert_eq!(writes.load(Ordering::SeqCst), 1);

    // A distinct value writes (and notifies) again.
    let mut changed = service_config();
    changed.workers = 8;
    cfg.replace(changed).unwrap();
    assert_eq!(writes.load(Ordering::SeqCst), 2);
}

#[test]
fn hook_error_does_not_fail_the_save() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("service.yaml");

    let mut cfg = PersistentConfig::new();
    cfg.set_save_path(&path).unwrap();
    cfg.set_value(service_config());
    cfg.set_on_change(Box::new(|_cfg: &ServiceConfig| {
        Err(anyhow::anyhow!("subscriber rejected the update"))
    }));

    cfg.save().unwrap();
    assert!(path.exists());
}

#[test]
fn comments_appear_above_their_keys() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("service.yaml");

    let mut comments = BTreeMap::new();
    comments.insert("Listen".to_string(), "bind address for the api".to_string());
    comments.insert("workers".to_string(), "worker pool size".to_string());

    let mut cfg = PersistentConfig::new();
    cfg.set_save_path(&path).unwrap();
    cfg.set_value(service_config());
    cfg.set_comments(comments);
    cfg.save().unwrap();

    let content = std::fs::read_to_string(&path).unwrap();
    let lines: Vec<&str> = content.lines().collect();
    let listen = lines.iter().position(|l| l.starts_with("listen:")).unwrap();
    assert_eq!(lines[listen - 1], "# bind address for the api");
    let workers = lines
        .iter()
        .position(|l| l.starts_with("workers:"))
        .unwrap();
    assert_eq!(lines[workers - 1], "# worker pool size");

    // Comments survive a reload of the value itself.
    let mut reloaded: PersistentConfig<ServiceConfig> = PersistentConfig::new();
    reloaded.set_save_path(&path).unwrap();
    assert!(reloaded.load().unwrap());
    assert_eq!(reloaded.value(), Some(&service_config()));
}

#[test]
fn save_creates_missing_parent_directories() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested").join("deep").join("service.yaml");

    let mut cfg = PersistentConfig::new();
    cfg.set_save_path(&path).unwrap();
    cfg.set_value(service_config());
    cfg.save().unwrap();
    assert!(path.exists());
}
