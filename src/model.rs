use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlayMode {
    Single,
    Random,
    #[default]
    Sequential,
    Loop,
}

impl PlayMode {
    pub const ALL: [PlayMode; 4] = [Self::Single, Self::Random, Self::Sequential, Self::Loop];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Single => "single",
            Self::Random => "random",
            Self::Sequential => "sequential",
            Self::Loop => "loop",
        }
    }
}

impl fmt::Display for PlayMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownMode(pub String);

impl fmt::Display for UnknownMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown play mode `{}`", self.0)
    }
}

impl std::error::Error for UnknownMode {}

impl FromStr for PlayMode {
    type Err = UnknownMode;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let lowered = value.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|mode| mode.as_str() == lowered)
            .ok_or_else(|| UnknownMode(value.trim().to_string()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    Forward,
    Backward,
}

impl Direction {
    pub fn label(self) -> &'static str {
        match self {
            Self::Forward => "next",
            Self::Backward => "prev",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Song {
    pub name: String,
    pub link: String,
    #[serde(default)]
    pub artist: Vec<String>,
    #[serde(default, deserialize_with = "deserialize_duration")]
    pub duration: u32,
}

impl Song {
    pub fn new(name: impl Into<String>, link: impl Into<String>, artist: Vec<String>) -> Self {
        Self {
            name: name.into(),
            link: link.into().to_lowercase(),
            artist,
            duration: 0,
        }
    }

    pub fn with_duration(mut self, seconds: u32) -> Self {
        self.duration = seconds;
        self
    }

    pub fn artists_label(&self) -> String {
        self.artist.join(", ")
    }

    pub fn has_known_duration(&self) -> bool {
        self.duration > 0
    }
}

// Older catalogs stored the estimator output verbatim, e.g. `40.25`.
fn deserialize_duration<'de, D>(deserializer: D) -> Result<u32, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<f64>::deserialize(deserializer)?;
    Ok(match value {
        Some(seconds) if seconds.is_finite() && seconds > 0.0 => {
            seconds.ceil().min(f64::from(u32::MAX)) as u32
        }
        _ => 0,
    })
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionSnapshot {
    pub user: String,
    #[serde(default)]
    pub current: Option<String>,
    #[serde(default)]
    pub mode: PlayMode,
    #[serde(default = "default_page")]
    pub list_page: usize,
    #[serde(default = "default_page")]
    pub queue_page: usize,
}

fn default_page() -> usize {
    1
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mode_parses_case_insensitively() {
        assert_eq!("LOOP".parse::<PlayMode>(), Ok(PlayMode::Loop));
        assert_eq!(" single ".parse::<PlayMode>(), Ok(PlayMode::Single));
        assert!("bogus".parse::<PlayMode>().is_err());
    }

    #[test]
    fn song_accepts_fractional_and_missing_durations() {
        let raw = r#"[
            {"name": "A", "link": "a", "artist": ["x"], "duration": 40.25},
            {"name": "B", "link": "b", "artist": ["y"]},
            {"name": "C", "link": "c", "artist": [], "duration": 12},
            {"name": "D", "link": "d", "artist": [], "duration": null}
        ]"#;
        let songs: Vec<Song> = serde_json::from_str(raw).expect("parse");
        assert_eq!(songs[0].duration, 41);
        assert_eq!(songs[1].duration, 0);
        assert_eq!(songs[2].duration, 12);
        assert_eq!(songs[3].duration, 0);
    }

    #[test]
    fn song_link_is_lowercased() {
        let song = Song::new("Song", "My_Pack", vec![String::from("Someone")]);
        assert_eq!(song.link, "my_pack");
        assert!(!song.has_known_duration());
    }
}
