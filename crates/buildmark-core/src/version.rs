//! Build/version identity reconciled from loosely structured sources.
//!
//! A [`VersionIdentity`] starts empty and is populated by exactly one of
//! three parse paths: a free-form version string ([`parse_str`]), a
//! VCS-describe string ([`parse_commit`]), or a packed integer
//! ([`parse_int`]). Rendering is split into an explicit mutating
//! [`enrich`] step (fallback lookups against the running executable) and a
//! pure [`Display`] formatter, so callers control when the filesystem is
//! touched.
//!
//! [`parse_str`]: VersionIdentity::parse_str
//! [`parse_commit`]: VersionIdentity::parse_commit
//! [`parse_int`]: VersionIdentity::parse_int
//! [`enrich`]: VersionIdentity::enrich

use std::fmt;
use std::sync::LazyLock;

use chrono::{DateTime, TimeZone, Utc};
use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};

use crate::error::{BuildmarkError, Result};
use crate::exe;

// e.g. `agentd-v1.2.3(05011504)-3f2a9c1b`
static VERSION_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(\w+)?-?v(\d+)\.(\d+)\.(\d+)\(?(\w+)?\)?-?(\w{8})?").expect("version pattern")
});

// e.g. `v0.0.1-1-gd4f800c-dirty`
static DESCRIBE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"v?((\d+)\.(\d+)\.(\d+))?(-\d+)?(-?g?([0-9a-f]+))?(-dirty)?")
        .expect("describe pattern")
});

/// Compact month-day-hour-minute encoding used for build stamps. Carries no
/// year.
const STAMP_FORMAT: &str = "%m%d%H%M";

/// Commit or build-time metadata attached to a version record.
///
/// A record carries at most one of the two; the renderer's preference for
/// commit fragments over build times holds by construction.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BuildTag {
    /// No metadata recorded.
    #[default]
    Empty,
    /// Point in time the binary was built, or a surrogate for it.
    Timestamp(DateTime<Utc>),
    /// Opaque VCS commit fragment, possibly `-dirty` suffixed.
    Commit(String),
}

impl BuildTag {
    /// Whether no metadata is recorded.
    pub fn is_empty(&self) -> bool {
        matches!(self, BuildTag::Empty)
    }
}

/// Normalized build/version identity of a binary or module.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VersionIdentity {
    /// Major version; bumped on incompatible changes.
    pub major: u32,
    /// Minor version; bumped on compatible feature additions.
    pub minor: u32,
    /// Patch version; bumped on compatible fixes.
    pub patch: u32,

    /// Short name tag for the binary/module; empty when absent.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub model: String,
    /// 8-char lowercase hex fingerprint of the running executable; empty
    /// when absent.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub hash: String,
    /// Commit or build-time metadata.
    #[serde(default, skip_serializing_if = "BuildTag::is_empty")]
    pub tag: BuildTag,
}

impl VersionIdentity {
    /// Create an identity with the given numeric components and no
    /// metadata.
    pub fn new(major: u32, minor: u32, patch: u32) -> Self {
        Self {
            major,
            minor,
            patch,
            ..Self::default()
        }
    }

    /// Attach a model name (builder pattern).
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Parse a free-form version string shaped like
    /// `[model-]v<major>.<minor>.<patch>[(extra)][-hash8]`.
    ///
    /// The optional `extra` token is ambiguous: an eight-digit token that
    /// forms a valid `MMDDhhmm` instant becomes a build stamp, anything
    /// else a commit fragment. On success `model`, `major`, `minor` and
    /// `patch` are fully overwritten (`model` possibly to empty); the tag
    /// and hash are only touched when their captures are present. The
    /// record is untouched on failure.
    pub fn parse_str(&mut self, input: &str) -> Result<()> {
        let caps = VERSION_RE.captures(input).ok_or_else(|| {
            BuildmarkError::ParamInvalid(format!("unrecognized version string {input:?}"))
        })?;
        let major = numeric_component(&caps, 2, input)?;
        let minor = numeric_component(&caps, 3, input)?;
        let patch = numeric_component(&caps, 4, input)?;

        self.model = group(&caps, 1).to_string();
        self.major = major;
        self.minor = minor;
        self.patch = patch;
        let extra = group(&caps, 5);
        if !extra.is_empty() {
            // A build stamp wins over a commit fragment.
            self.tag = match parse_build_stamp(extra) {
                Some(at) => BuildTag::Timestamp(at),
                None => BuildTag::Commit(extra.to_string()),
            };
        }
        let hash = group(&caps, 6);
        if !hash.is_empty() {
            self.hash = hash.to_string();
        }
        Ok(())
    }

    /// Parse a VCS-describe string such as `v0.0.1-1-gd4f800c-dirty`.
    ///
    /// Empty input is a no-op success, as is input containing neither a
    /// version triplet nor a commit fragment; callers must not assume
    /// mutation on every non-error return. When a version triplet is
    /// present all three components must parse, or the error is propagated
    /// unwrapped and the record stays untouched. A found commit fragment
    /// (with the literal `-dirty` suffix appended when marked) replaces the
    /// tag; a version triplet without a fragment clears a previously stored
    /// commit while leaving a build stamp alone.
    pub fn parse_commit(&mut self, describe: &str) -> Result<()> {
        if describe.is_empty() {
            return Ok(());
        }
        let Some(caps) = DESCRIBE_RE.captures(describe) else {
            return Ok(());
        };
        let commit = group(&caps, 7);
        if caps.get(1).is_none() && commit.is_empty() {
            return Ok(());
        }

        if caps.get(1).is_some() {
            let major: u32 = group(&caps, 2).parse()?;
            let minor: u32 = group(&caps, 3).parse()?;
            let patch: u32 = group(&caps, 4).parse()?;
            self.major = major;
            self.minor = minor;
            self.patch = patch;
        }

        if commit.is_empty() {
            if matches!(self.tag, BuildTag::Commit(_)) {
                self.tag = BuildTag::Empty;
            }
        } else {
            let mut id = commit.to_string();
            if caps.get(8).is_some() {
                id.push_str("-dirty");
            }
            self.tag = BuildTag::Commit(id);
        }
        Ok(())
    }

    /// Decode a packed base-1000 triplet produced by [`as_int32`].
    ///
    /// Only `major`, `minor` and `patch` are touched. Arbitrary integers
    /// not produced by the packing scheme decode to nonsensical components
    /// rather than an error; negative input clamps to zero.
    ///
    /// [`as_int32`]: VersionIdentity::as_int32
    pub fn parse_int(&mut self, packed: i32) {
        let mut rest = i64::from(packed).max(0);
        self.major = (rest / 1_000_000) as u32;
        rest -= i64::from(self.major) * 1_000_000;
        self.minor = (rest / 1_000) as u32;
        rest -= i64::from(self.minor) * 1_000;
        self.patch = rest as u32;
    }

    /// Pack `{major, minor, patch}` into one signed 32-bit integer.
    ///
    /// Lossy: discards `model`, `hash` and the tag, and wraps when the
    /// components overflow the packing. Round-trips through
    /// [`parse_int`] exactly when `minor < 1000 && patch < 1000` and the
    /// sum fits an `i32`.
    ///
    /// [`parse_int`]: VersionIdentity::parse_int
    pub fn as_int32(&self) -> i32 {
        (i64::from(self.major) * 1_000_000
            + i64::from(self.minor) * 1_000
            + i64::from(self.patch)) as i32
    }

    /// Fill missing metadata from the running executable: the SHA-1
    /// fingerprint when `hash` is empty, and the modification time as a
    /// build-stamp surrogate when the tag is empty.
    ///
    /// Lookup failures are silently absorbed; the fields stay unset. This
    /// is the only operation on the record that touches the filesystem.
    pub fn enrich(&mut self) {
        if self.hash.is_empty() {
            if let Some(hash) = exe::run_file_hash() {
                self.hash = hash;
            }
        }
        if self.tag.is_empty() {
            if let Some(at) = exe::run_file_mtime() {
                self.tag = BuildTag::Timestamp(at);
            }
        }
    }
}

impl fmt::Display for VersionIdentity {
    /// Canonical single-line rendering:
    /// `[model-]v<major>.<minor>.<patch>[(commit|MMDDhhmm)][-hash]`.
    /// Pure; call [`VersionIdentity::enrich`] first for the executable
    /// fallbacks.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.model.is_empty() {
            write!(f, "{}-", self.model)?;
        }
        write!(f, "v{}.{}.{}", self.major, self.minor, self.patch)?;
        match &self.tag {
            BuildTag::Commit(id) => write!(f, "({id})")?,
            BuildTag::Timestamp(at) => write!(f, "({})", at.format(STAMP_FORMAT))?,
            BuildTag::Empty => {}
        }
        if !self.hash.is_empty() {
            write!(f, "-{}", self.hash)?;
        }
        Ok(())
    }
}

/// Text of an optional capture group, empty when unmatched.
fn group<'t>(caps: &Captures<'t>, index: usize) -> &'t str {
    caps.get(index).map_or("", |m| m.as_str())
}

/// Parse a required numeric component; a missing capture reads as empty and
/// fails the same way a non-numeric one does.
fn numeric_component(caps: &Captures<'_>, index: usize, input: &str) -> Result<u32> {
    group(caps, index).parse::<u32>().map_err(|_| {
        BuildmarkError::ParamInvalid(format!("numeric version component in {input:?}"))
    })
}

/// Decode the compact `MMDDhhmm` build stamp. The encoding carries no
/// year; instants are anchored at year zero, and month/day/hour/minute
/// ranges are validated against that calendar.
fn parse_build_stamp(s: &str) -> Option<DateTime<Utc>> {
    if s.len() != 8 || !s.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let month: u32 = s[0..2].parse().ok()?;
    let day: u32 = s[2..4].parse().ok()?;
    let hour: u32 = s[4..6].parse().ok()?;
    let minute: u32 = s[6..8].parse().ok()?;
    Utc.with_ymd_and_hms(0, month, day, hour, minute, 0).single()
}
