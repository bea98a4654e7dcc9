//! Fingerprinting of the currently running executable.
//!
//! Both lookups are best-effort: any I/O failure yields `None` so callers
//! can degrade to rendering a version without hash or build time.

use std::io;

use chrono::{DateTime, Utc};
use sha1::{Digest, Sha1};

/// SHA-1 content fingerprint of the running executable, truncated to the
/// first 8 lowercase hex characters.
pub fn run_file_hash() -> Option<String> {
    let path = std::env::current_exe().ok()?;
    let mut file = std::fs::File::open(path).ok()?;
    let mut hasher = Sha1::new();
    io::copy(&mut file, &mut hasher).ok()?;
    let mut digest = hex::encode(hasher.finalize());
    digest.truncate(8);
    Some(digest)
}

/// Modification time of the running executable, used as a compile-time
/// surrogate. Non-positive epoch timestamps are treated as missing.
pub fn run_file_mtime() -> Option<DateTime<Utc>> {
    let path = std::env::current_exe().ok()?;
    let modified = std::fs::metadata(path).ok()?.modified().ok()?;
    let stamp: DateTime<Utc> = modified.into();
    (stamp.timestamp() > 0).then_some(stamp)
}
