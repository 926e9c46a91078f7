use crate::error::InvalidInput;
use crate::model::Song;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Lookup {
    One { index: usize, song: Song },
    Many(Vec<(usize, Song)>),
    None,
}

pub fn find_song(songs: &[Song], input: &str) -> Lookup {
    let raw = input.trim();
    if !raw.is_empty() && raw.bytes().all(|byte| byte.is_ascii_digit()) {
        return match raw.parse::<usize>().ok().and_then(|n| n.checked_sub(1)) {
            Some(index) if index < songs.len() => Lookup::One {
                index,
                song: songs[index].clone(),
            },
            _ => Lookup::None,
        };
    }

    let mut hits = search(songs, raw);
    match hits.len() {
        0 => Lookup::None,
        1 => {
            let (index, song) = hits.remove(0);
            Lookup::One { index, song }
        }
        _ => Lookup::Many(hits),
    }
}

pub fn search(songs: &[Song], raw: &str) -> Vec<(usize, Song)> {
    songs
        .iter()
        .enumerate()
        .filter(|(_, song)| matches_keyword(song, raw))
        .map(|(index, song)| (index, song.clone()))
        .collect()
}

pub fn matches_keyword(song: &Song, raw: &str) -> bool {
    let raw = raw.trim().to_lowercase();
    if raw.is_empty() {
        return false;
    }
    let spaced = raw.replace('_', " ");
    let name = song.name.to_lowercase();
    name.contains(&spaced)
        || name.contains(&raw)
        || song.link.to_lowercase().contains(&raw)
        || song
            .artist
            .iter()
            .any(|artist| artist.to_lowercase().contains(&spaced))
}

pub fn index_of(songs: &[Song], link: &str) -> Option<usize> {
    songs.iter().position(|song| song.link == link)
}

pub fn song_for<'a>(songs: &'a [Song], link: &str) -> Option<&'a Song> {
    songs.iter().find(|song| song.link == link)
}

pub fn looks_like_multi_index(input: &str) -> bool {
    if input.contains(',') {
        return true;
    }
    if !input.contains('-') {
        return false;
    }
    let letters: String = input
        .chars()
        .filter(|ch| !matches!(ch, '-' | ',' | ' '))
        .collect();
    !letters.chars().all(char::is_alphabetic) || letters.is_empty()
}

pub fn parse_multi_index(input: &str, len: usize) -> Result<Vec<usize>, InvalidInput> {
    let mut indexes = Vec::new();
    if input.contains(',') {
        for part in input.split(',') {
            if let Ok(n) = part.trim().parse::<usize>() {
                indexes.push(n);
            }
        }
    } else if let Some((start, end)) = input.split_once('-')
        && let (Ok(start), Ok(end)) = (start.trim().parse::<usize>(), end.trim().parse::<usize>())
    {
        if start > end {
            return Err(InvalidInput::Range(input.to_string()));
        }
        indexes.extend(start..=end.min(len));
    }

    let indexes: Vec<usize> = indexes
        .into_iter()
        .filter_map(|n| n.checked_sub(1))
        .filter(|index| *index < len)
        .collect();
    if indexes.is_empty() {
        return Err(InvalidInput::Range(input.to_string()));
    }
    Ok(indexes)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    pub page: usize,
    pub total_pages: usize,
    pub start: usize,
    pub end: usize,
}

impl Page {
    pub fn total_pages(total: usize, per_page: usize) -> usize {
        let per_page = per_page.max(1);
        total.div_ceil(per_page).max(1)
    }

    pub fn of(total: usize, requested: usize, per_page: usize) -> Self {
        let per_page = per_page.max(1);
        let total_pages = Self::total_pages(total, per_page);
        let page = requested.clamp(1, total_pages);
        let start = (page - 1) * per_page;
        let end = (page * per_page).min(total);
        Self {
            page,
            total_pages,
            start,
            end,
        }
    }

    pub fn validate(requested: usize, total: usize, per_page: usize) -> Result<usize, InvalidInput> {
        if requested == 0 || requested > Self::total_pages(total, per_page) {
            return Err(InvalidInput::Page(requested));
        }
        Ok(requested)
    }
}
