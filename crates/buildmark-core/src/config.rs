//! Durable config objects persisted as commented YAML.
//!
//! A [`PersistentConfig`] wraps an arbitrary serde-serializable value with a
//! save path, optional per-field comments and an optional change hook. A
//! save is skipped entirely when the rendered content matches what is
//! already on disk, so the change hook observes at most one invocation per
//! distinct content.

use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::Serialize;
use tempfile::NamedTempFile;
use tracing::{debug, warn};

use crate::error::{BuildmarkError, Result};

/// Callback invoked after a successful write with the newly saved value.
pub type ChangeHook<T> = Box<dyn Fn(&T) -> anyhow::Result<()> + Send + Sync>;

/// A structured value bound to a YAML file on disk.
///
/// Exclusive `&mut self` receivers give the single-writer guarantee;
/// callers sharing a config across threads wrap it in their own lock.
pub struct PersistentConfig<T> {
    path: Option<PathBuf>,
    value: Option<T>,
    comments: BTreeMap<String, String>,
    on_change: Option<ChangeHook<T>>,
    silent: bool,
}

impl<T> Default for PersistentConfig<T> {
    fn default() -> Self {
        Self {
            path: None,
            value: None,
            comments: BTreeMap::new(),
            on_change: None,
            silent: false,
        }
    }
}

impl<T> PersistentConfig<T>
where
    T: Serialize + DeserializeOwned,
{
    /// Create an empty config with no path, value, comments or hook.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the YAML save location. An empty path clears the slot and fails.
    pub fn set_save_path(&mut self, path: impl Into<PathBuf>) -> Result<()> {
        let path = path.into();
        if path.as_os_str().is_empty() {
            self.path = None;
            return Err(BuildmarkError::Undefined("save path"));
        }
        self.path = Some(path);
        Ok(())
    }

    /// The configured save location.
    pub fn save_path(&self) -> Result<&Path> {
        self.path
            .as_deref()
            .ok_or(BuildmarkError::Undefined("save path"))
    }

    /// Install the value to persist.
    pub fn set_value(&mut self, value: T) {
        self.value = Some(value);
    }

    /// The wrapped value, if one has been installed.
    pub fn value(&self) -> Option<&T> {
        self.value.as_ref()
    }

    /// Install per-field comments; keys are normalized to lowercase and
    /// matched against top-level YAML keys at save time.
    pub fn set_comments(&mut self, comments: BTreeMap<String, String>) {
        self.comments = comments
            .into_iter()
            .map(|(key, note)| (key.to_lowercase(), note))
            .collect();
    }

    /// Install a hook invoked after every actual write. Hook failures are
    /// logged at warn level and never fail the save.
    pub fn set_on_change(&mut self, hook: ChangeHook<T>) {
        self.on_change = Some(hook);
    }

    /// Suppress save logging.
    pub fn set_silent(&mut self, silent: bool) {
        self.silent = silent;
    }

    /// JSON export of the wrapped value.
    pub fn to_json(&self) -> Result<String> {
        let value = self
            .value
            .as_ref()
            .ok_or(BuildmarkError::Undefined("save value"))?;
        Ok(serde_json::to_string(value)?)
    }

    /// JSON import into the wrapped value; returns the re-exported
    /// canonical JSON.
    pub fn from_json(&mut self, content: &str) -> Result<String> {
        if self.value.is_none() {
            return Err(BuildmarkError::Undefined("save value"));
        }
        self.value = Some(serde_json::from_str(content)?);
        self.to_json()
    }

    /// Read the YAML file into the wrapped value. Returns `Ok(false)` when
    /// the file does not exist yet.
    pub fn load(&mut self) -> Result<bool> {
        let path = self.save_path()?;
        if !path.exists() {
            return Ok(false);
        }
        let content = fs::read_to_string(path)?;
        self.value = Some(serde_yaml::from_str(&content)?);
        Ok(true)
    }

    /// Install a new value, then [`save`](Self::save).
    pub fn replace(&mut self, new_value: T) -> Result<()> {
        self.value = Some(new_value);
        self.save()
    }

    /// Persist the wrapped value to the configured path.
    ///
    /// The value is rendered to YAML with comment lines injected above
    /// matching top-level keys. When the rendered bytes equal the current
    /// file content the write is skipped; otherwise the file is replaced
    /// atomically (temp file + rename in the destination directory) and
    /// the change hook runs with the new value.
    pub fn save(&mut self) -> Result<()> {
        let path = self.save_path()?.to_path_buf();
        let value = self
            .value
            .as_ref()
            .ok_or(BuildmarkError::Undefined("save value"))?;

        // Missing file reads as empty content.
        let previous = fs::read(&path).unwrap_or_default();
        let rendered = render_commented_yaml(value, &self.comments)?;
        if previous == rendered.as_bytes() {
            return Ok(());
        }

        let dir = path.parent().filter(|p| !p.as_os_str().is_empty());
        if let Some(dir) = dir {
            fs::create_dir_all(dir)?;
        }
        // Temp file lives in the destination directory so the rename is atomic.
        let mut tmp = match dir {
            Some(dir) => NamedTempFile::new_in(dir)?,
            None => NamedTempFile::new()?,
        };
        tmp.write_all(rendered.as_bytes())?;
        tmp.persist(&path).map_err(|e| e.error)?;

        if !self.silent {
            debug!(
                event = "config.saved",
                path = %path.display(),
                previous_bytes = previous.len(),
                written_bytes = rendered.len(),
            );
        }

        if let Some(hook) = &self.on_change {
            if let Err(error) = hook(value) {
                warn!(event = "config.hook_error", path = %path.display(), error = %error);
            }
        }
        Ok(())
    }
}

/// Render a value as YAML with `# note` lines injected above top-level keys
/// that have a (lowercased) comment entry.
fn render_commented_yaml<T: Serialize>(
    value: &T,
    comments: &BTreeMap<String, String>,
) -> Result<String> {
    let yaml = serde_yaml::to_string(value)?;
    if comments.is_empty() {
        return Ok(yaml);
    }
    let mut out = String::with_capacity(yaml.len());
    for line in yaml.lines() {
        // Top-level mapping keys start at column zero.
        if !line.starts_with([' ', '#', '-']) {
            if let Some((key, _)) = line.split_once(':') {
                if let Some(note) = comments.get(&key.trim().to_lowercase()) {
                    out.push_str("# ");
                    out.push_str(note);
                    out.push('\n');
                }
            }
        }
        out.push_str(line);
        out.push('\n');
    }
    Ok(out)
}
