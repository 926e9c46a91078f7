use crate::config::{self, DataPaths};
use crate::model::Song;
use anyhow::{Context, Result, bail};
use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, PoisonError};

pub trait CatalogStore: Send + Sync {
    fn load(&self) -> Result<Vec<Song>>;
    fn save(&self, songs: &[Song]) -> Result<()>;
}

pub trait QueueStore: Send + Sync {
    fn load(&self, user: &str) -> Result<Vec<String>>;
    fn save(&self, user: &str, queue: &[String]) -> Result<()>;
    fn exists(&self, user: &str) -> bool;
}

#[derive(Debug, Clone)]
pub struct JsonFileStore {
    paths: DataPaths,
}

impl JsonFileStore {
    pub fn open(paths: DataPaths) -> Result<Self> {
        paths.ensure()?;
        let store = Self { paths };
        store.ensure_songs_file()?;
        Ok(store)
    }

    fn ensure_songs_file(&self) -> Result<()> {
        let path = self.paths.songs();
        if !path.exists() {
            config::write_json(&path, &Vec::<Song>::new())?;
        }
        Ok(())
    }

    fn queue_path(&self, user: &str) -> PathBuf {
        self.paths
            .queues()
            .join(format!("{}.json", sanitize_user(user)))
    }
}

impl CatalogStore for JsonFileStore {
    fn load(&self) -> Result<Vec<Song>> {
        self.ensure_songs_file()?;
        let path = self.paths.songs();
        let raw = fs::read_to_string(&path)
            .with_context(|| format!("failed to read catalog {}", path.display()))?;
        let songs: Vec<Song> = serde_json::from_str(&raw)
            .with_context(|| format!("failed to parse catalog {}", path.display()))?;
        Ok(songs)
    }

    fn save(&self, songs: &[Song]) -> Result<()> {
        config::write_json(&self.paths.songs(), songs)
    }
}

impl QueueStore for JsonFileStore {
    fn load(&self, user: &str) -> Result<Vec<String>> {
        let path = self.queue_path(user);
        if !path.exists() {
            return Ok(Vec::new());
        }

        let raw = fs::read_to_string(&path)
            .with_context(|| format!("failed to read queue {}", path.display()))?;
        let queue: Vec<String> = serde_json::from_str(&raw)
            .with_context(|| format!("failed to parse queue {}", path.display()))?;
        Ok(queue)
    }

    fn save(&self, user: &str, queue: &[String]) -> Result<()> {
        config::write_json(&self.queue_path(user), queue)
    }

    fn exists(&self, user: &str) -> bool {
        self.queue_path(user).exists()
    }
}

fn sanitize_user(user: &str) -> String {
    let cleaned: String = user
        .chars()
        .map(|ch| {
            if ch.is_ascii_alphanumeric() || ch == '_' || ch == '-' {
                ch
            } else {
                '_'
            }
        })
        .collect();
    if cleaned.is_empty() {
        String::from("_")
    } else {
        cleaned
    }
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    songs: Mutex<Vec<Song>>,
    queues: Mutex<HashMap<String, Vec<String>>>,
    read_only: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_songs(songs: Vec<Song>) -> Self {
        Self {
            songs: Mutex::new(songs),
            ..Self::default()
        }
    }

    pub fn with_queue(self, user: &str, links: &[&str]) -> Self {
        self.queues
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(
                user.to_string(),
                links.iter().map(|link| link.to_string()).collect(),
            );
        self
    }

    pub fn set_read_only(&self, read_only: bool) {
        self.read_only.store(read_only, Ordering::SeqCst);
    }

    fn check_writable(&self) -> Result<()> {
        if self.read_only.load(Ordering::SeqCst) {
            bail!("store is read-only");
        }
        Ok(())
    }
}

impl CatalogStore for MemoryStore {
    fn load(&self) -> Result<Vec<Song>> {
        Ok(self
            .songs
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone())
    }

    fn save(&self, songs: &[Song]) -> Result<()> {
        self.check_writable()?;
        *self.songs.lock().unwrap_or_else(PoisonError::into_inner) = songs.to_vec();
        Ok(())
    }
}

impl QueueStore for MemoryStore {
    fn load(&self, user: &str) -> Result<Vec<String>> {
        Ok(self
            .queues
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(user)
            .cloned()
            .unwrap_or_default())
    }

    fn save(&self, user: &str, queue: &[String]) -> Result<()> {
        self.check_writable()?;
        self.queues
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(user.to_string(), queue.to_vec());
        Ok(())
    }

    fn exists(&self, user: &str) -> bool {
        self.queues
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(user)
    }
}
