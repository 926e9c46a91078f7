use anyhow::{Context, Result};
use std::collections::HashMap;
use std::ffi::OsStr;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use tracing::debug;
use walkdir::WalkDir;
use zip::ZipArchive;

const UNITS_PER_STEP: f64 = 80.0;
const TICKS_PER_SECOND: f64 = 20.0;
const LOAD_FUNCTION: &str = "load.mcfunction";
const NOTES_DIR: &str = "/notes/";
const FUNCTION_EXT: &str = ".mcfunction";

pub fn estimate_zip(path: &Path) -> Option<f64> {
    match read_sequence(path) {
        Ok(Some((speed, max_index))) => seconds_for(speed, max_index),
        Ok(None) => None,
        Err(err) => {
            debug!(path = %path.display(), "duration estimate unavailable: {err:#}");
            None
        }
    }
}

// 20 ticks per second, 80 counter units per note step.
pub fn seconds_for(speed: u64, max_index: u64) -> Option<f64> {
    if speed == 0 || max_index == 0 {
        return None;
    }
    let seconds = max_index as f64 * UNITS_PER_STEP / (speed as f64 * TICKS_PER_SECOND);
    Some((seconds * 100.0).round() / 100.0)
}

pub fn whole_seconds(estimate: Option<f64>) -> u32 {
    match estimate {
        Some(seconds) if seconds > 0.0 => seconds.ceil().min(f64::from(u32::MAX)) as u32,
        _ => 0,
    }
}

fn read_sequence(path: &Path) -> Result<Option<(u64, u64)>> {
    let file = File::open(path).with_context(|| format!("failed to open {}", path.display()))?;
    let mut archive = ZipArchive::new(file)
        .with_context(|| format!("failed to read archive {}", path.display()))?;

    let mut speed = None;
    let mut max_index = 0_u64;
    for index in 0..archive.len() {
        let mut entry = archive.by_index(index)?;
        let name = entry.name().to_string();

        if name.ends_with(LOAD_FUNCTION) && speed.is_none() {
            let mut content = String::new();
            entry
                .read_to_string(&mut content)
                .with_context(|| format!("failed to read {name}"))?;
            speed = parse_speed(&content);
        } else if let Some(step) = note_index(&name) {
            max_index = max_index.max(step);
        }
    }

    Ok(speed.map(|speed| (speed, max_index)))
}

pub fn parse_speed(content: &str) -> Option<u64> {
    content.lines().find_map(|line| {
        let tokens: Vec<&str> = line.split_whitespace().collect();
        tokens.windows(6).find_map(|window| match window {
            ["scoreboard", "players", "set", "speed", _, value] => value.parse().ok(),
            _ => None,
        })
    })
}

pub fn note_index(entry_name: &str) -> Option<u64> {
    if !entry_name.contains(NOTES_DIR) || !entry_name.ends_with(FUNCTION_EXT) {
        return None;
    }
    let file_name = entry_name.rsplit('/').next()?;
    let stem = file_name.strip_suffix(FUNCTION_EXT)?;
    if stem.is_empty() || !stem.bytes().all(|byte| byte.is_ascii_digit()) {
        return None;
    }
    stem.parse().ok()
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct DatapackScan {
    pub links: Vec<String>,
    pub durations: HashMap<String, f64>,
}

pub fn scan_datapacks(dir: &Path) -> DatapackScan {
    let mut scan = DatapackScan::default();
    let mut entries: Vec<_> = WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|entry| entry.file_type().is_file())
        .collect();
    entries.sort_by_cached_key(|entry| entry.file_name().to_string_lossy().to_lowercase());

    for entry in entries {
        let path = entry.path();
        let Some(stem) = path.file_stem().and_then(OsStr::to_str) else {
            continue;
        };
        let link = stem.replace(' ', "_").to_lowercase();
        let is_zip = path
            .extension()
            .and_then(OsStr::to_str)
            .is_some_and(|ext| ext.eq_ignore_ascii_case("zip"));
        if is_zip && let Some(seconds) = estimate_zip(path) {
            scan.durations.insert(link.clone(), seconds);
        }
        scan.links.push(link);
    }

    scan
}

pub fn format_duration(seconds: u32) -> String {
    if seconds == 0 {
        return String::new();
    }
    format!("{}:{:02}", seconds / 60, seconds % 60)
}
