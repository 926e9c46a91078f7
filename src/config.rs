use crate::model::{PlayMode, SessionSnapshot};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::process;
use std::sync::atomic::{AtomicU64, Ordering};

const APP_DIR: &str = "tunequeue";
const SETTINGS_FILE: &str = "config.json";
const SONGS_FILE: &str = "songs.json";
const QUEUES_DIR: &str = "queues";
const SESSIONS_FILE: &str = "sessions.json";

static STAGING_SEQ: AtomicU64 = AtomicU64::new(0);

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default = "default_items_per_page")]
    pub items_per_page: usize,
    #[serde(default = "default_grace_seconds")]
    pub auto_advance_grace_seconds: u64,
    #[serde(default)]
    pub default_mode: PlayMode,
}

fn default_items_per_page() -> usize {
    8
}

fn default_grace_seconds() -> u64 {
    1
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            items_per_page: default_items_per_page(),
            auto_advance_grace_seconds: default_grace_seconds(),
            default_mode: PlayMode::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataPaths {
    pub root: PathBuf,
}

impl DataPaths {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn from_env() -> Result<Self> {
        Ok(Self::new(data_root()?))
    }

    pub fn settings(&self) -> PathBuf {
        self.root.join(SETTINGS_FILE)
    }

    pub fn songs(&self) -> PathBuf {
        self.root.join(SONGS_FILE)
    }

    pub fn queues(&self) -> PathBuf {
        self.root.join(QUEUES_DIR)
    }

    pub fn sessions(&self) -> PathBuf {
        self.root.join(SESSIONS_FILE)
    }

    pub fn ensure(&self) -> Result<()> {
        let queues = self.queues();
        fs::create_dir_all(&queues)
            .with_context(|| format!("failed to create {}", queues.display()))?;
        Ok(())
    }
}

pub fn data_root() -> Result<PathBuf> {
    if let Ok(override_dir) = env::var("TUNEQUEUE_DATA_DIR") {
        return Ok(PathBuf::from(override_dir));
    }

    let home = env::var("HOME")
        .or_else(|_| env::var("USERPROFILE"))
        .context("neither HOME nor USERPROFILE is set")?;
    Ok(PathBuf::from(home).join(".config").join(APP_DIR))
}

pub fn load_settings(paths: &DataPaths) -> Result<Settings> {
    let path = paths.settings();
    if !path.exists() {
        let settings = Settings::default();
        write_json(&path, &settings)?;
        return Ok(settings);
    }

    let raw = fs::read_to_string(&path)
        .with_context(|| format!("failed to read settings file {}", path.display()))?;
    let settings: Settings = serde_json::from_str(&raw)
        .with_context(|| format!("failed to parse settings file {}", path.display()))?;
    Ok(settings)
}

pub fn load_sessions(paths: &DataPaths) -> Result<Vec<SessionSnapshot>> {
    let path = paths.sessions();
    if !path.exists() {
        return Ok(Vec::new());
    }

    let raw = fs::read_to_string(&path)
        .with_context(|| format!("failed to read session file {}", path.display()))?;
    let sessions: Vec<SessionSnapshot> = serde_json::from_str(&raw)
        .with_context(|| format!("failed to parse session file {}", path.display()))?;
    Ok(sessions)
}

pub fn save_sessions(paths: &DataPaths, sessions: &[SessionSnapshot]) -> Result<()> {
    write_json(&paths.sessions(), &sessions)
}

pub fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    let json = serde_json::to_string_pretty(value)?;
    let staging = staging_path(path);
    fs::write(&staging, json).with_context(|| format!("failed to write {}", staging.display()))?;
    if let Err(err) = fs::rename(&staging, path) {
        let _ = fs::remove_file(&staging);
        return Err(err).with_context(|| format!("failed to replace {}", path.display()));
    }
    Ok(())
}

fn staging_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|name| name.to_os_string())
        .unwrap_or_default();
    let seq = STAGING_SEQ.fetch_add(1, Ordering::Relaxed);
    name.push(format!(".{}.{seq}.tmp", process::id()));
    path.with_file_name(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn missing_settings_are_created_with_defaults() {
        let dir = tempdir().expect("tempdir");
        let paths = DataPaths::new(dir.path());

        let settings = load_settings(&paths).expect("load");
        assert_eq!(settings, Settings::default());
        assert!(paths.settings().exists());
    }

    #[test]
    fn partial_settings_fill_defaults() {
        let dir = tempdir().expect("tempdir");
        let paths = DataPaths::new(dir.path());
        fs::write(paths.settings(), r#"{"items_per_page": 3}"#).expect("write");

        let settings = load_settings(&paths).expect("load");
        assert_eq!(settings.items_per_page, 3);
        assert_eq!(settings.auto_advance_grace_seconds, 1);
        assert_eq!(settings.default_mode, PlayMode::Sequential);
    }

    #[test]
    fn sessions_save_and_load_round_trip() {
        let dir = tempdir().expect("tempdir");
        let paths = DataPaths::new(dir.path());
        let sessions = vec![SessionSnapshot {
            user: String::from("steve"),
            current: Some(String::from("tetris")),
            mode: PlayMode::Loop,
            list_page: 2,
            queue_page: 1,
        }];

        save_sessions(&paths, &sessions).expect("save");
        assert_eq!(load_sessions(&paths).expect("load"), sessions);
        assert_eq!(leftover_staging_files(&paths), 0);
    }

    fn leftover_staging_files(paths: &DataPaths) -> usize {
        fs::read_dir(&paths.root)
            .expect("read dir")
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.file_name().to_string_lossy().ends_with(".tmp"))
            .count()
    }

    #[test]
    fn staging_names_never_repeat() {
        let path = Path::new("/data/songs.json");
        let first = staging_path(path);
        let second = staging_path(path);
        assert_ne!(first, second);
        assert_eq!(first.parent(), path.parent());
    }

    #[test]
    fn concurrent_writes_to_one_file_all_succeed() {
        let dir = tempdir().expect("tempdir");
        let paths = DataPaths::new(dir.path());
        let target = paths.root.join("songs.json");

        std::thread::scope(|scope| {
            for writer in 0..8 {
                let target = &target;
                scope.spawn(move || {
                    for round in 0..25 {
                        write_json(target, &vec![writer, round]).expect("concurrent write");
                    }
                });
            }
        });

        let raw = fs::read_to_string(&target).expect("read");
        let saved: Vec<u32> = serde_json::from_str(&raw).expect("complete json");
        assert_eq!(saved.len(), 2);
        assert_eq!(leftover_staging_files(&paths), 0);
    }

    #[test]
    fn missing_session_file_is_empty() {
        let dir = tempdir().expect("tempdir");
        let paths = DataPaths::new(dir.path());
        assert!(load_sessions(&paths).expect("load").is_empty());
    }
}
