use super::Player;
use crate::catalog::{self, Lookup, Page};
use crate::duration::format_duration;
use crate::error::{NotFound, Result};
use crate::message::{Message, MessageKey, Reply};
use crate::model::Song;
use crate::session;
use rand::seq::SliceRandom;
use std::sync::PoisonError;
use tracing::info;

const CURRENT_MARKER: &str = " ◄";

pub(super) fn song_line(index: usize, song: &Song, current: bool) -> Message {
    let duration = match format_duration(song.duration) {
        text if text.is_empty() => text,
        text => format!(" [{text}]"),
    };
    let marker = if current { CURRENT_MARKER } else { "" };
    Message::with(
        MessageKey::SongLine,
        [
            (index + 1).to_string(),
            song.name.clone(),
            song.artists_label(),
            duration,
            marker.to_string(),
        ],
    )
}

pub(super) fn page_info(page: &Page) -> Message {
    Message::with(
        MessageKey::PageInfo,
        [page.page.to_string(), page.total_pages.to_string()],
    )
}

impl Player {
    pub(super) fn hit_list(&self, hits: &[(usize, Song)], current: Option<&str>) -> Reply {
        let mut reply = vec![Message::with(MessageKey::FoundSongs, [hits.len().to_string()])];
        reply.extend(
            hits.iter()
                .map(|(index, song)| song_line(*index, song, current == Some(song.link.as_str()))),
        );
        reply
    }

    pub fn list(&self, user: &str, page: Option<usize>) -> Result<Reply> {
        let (page, songs, current) = self.catalog_page(user, page)?;
        let mut reply = vec![page_info(&page)];
        reply.extend(songs[page.start..page.end].iter().enumerate().map(|(offset, song)| {
            song_line(
                page.start + offset,
                song,
                current.as_deref() == Some(song.link.as_str()),
            )
        }));
        Ok(reply)
    }

    pub fn links(&self, user: &str, page: Option<usize>) -> Result<Reply> {
        let (page, songs, _) = self.catalog_page(user, page)?;
        let mut reply = vec![page_info(&page)];
        reply.extend(songs[page.start..page.end].iter().enumerate().map(|(offset, song)| {
            Message::with(
                MessageKey::LinkLine,
                [
                    (page.start + offset + 1).to_string(),
                    song.name.clone(),
                    song.link.clone(),
                ],
            )
        }));
        Ok(reply)
    }

    fn catalog_page(
        &self,
        user: &str,
        page: Option<usize>,
    ) -> Result<(Page, Vec<Song>, Option<String>)> {
        let handle = self.session(user);
        let mut session = session::lock(&handle);
        let songs = self.load_songs()?;
        if songs.is_empty() {
            return Err(NotFound::Songs.into());
        }

        let per_page = self.shared.settings.items_per_page;
        let requested = match page {
            Some(page) => Page::validate(page, songs.len(), per_page)?,
            None => session.list_page,
        };
        let page = Page::of(songs.len(), requested, per_page);
        session.list_page = page.page;
        Ok((page, songs, session.current.clone()))
    }

    pub fn search(&self, user: &str, keyword: &str) -> Result<Reply> {
        let current = self.session_view(user).current;
        let songs = self.load_songs()?;
        let hits = catalog::search(&songs, keyword);
        if hits.is_empty() {
            return Err(NotFound::Song.into());
        }
        Ok(self.hit_list(&hits, current.as_deref()))
    }

    pub fn now(&self, user: &str) -> Result<Reply> {
        let view = self.session_view(user);
        let mode = Message::with(MessageKey::CurrentMode, [view.mode.as_str()]);
        let Some(link) = view.current else {
            return Ok(vec![Message::new(MessageKey::NoCurrentSong), mode]);
        };

        let songs = self.load_songs()?;
        let mut reply = match catalog::index_of(&songs, &link) {
            Some(index) => vec![song_line(index, &songs[index], true)],
            None => vec![Message::with(MessageKey::Playing, [link.clone()])],
        };
        reply.push(mode);
        if view.paused {
            let name = catalog::song_for(&songs, &link).map_or(link.as_str(), |song| song.name.as_str());
            reply.push(Message::with(MessageKey::Paused, [name]));
        }
        Ok(reply)
    }

    pub fn add(&self, user: &str, input: &str) -> Result<Reply> {
        let handle = self.session(user);
        let session = session::lock(&handle);
        let songs = self.load_songs()?;
        let indexes = match self.resolve_indexes(&songs, input, session.current.as_deref())? {
            Ok(indexes) => indexes,
            Err(hits) => return Ok(hits),
        };

        let mut queue = self.load_queue(user)?;
        let mut reply = Vec::new();
        let mut changed = false;
        for index in indexes {
            let song = &songs[index];
            if queue.contains(&song.link) {
                reply.push(Message::with(MessageKey::AlreadyInQueue, [song.name.clone()]));
            } else {
                queue.push(song.link.clone());
                reply.push(Message::with(MessageKey::AddedToQueue, [song.name.clone()]));
                changed = true;
            }
        }
        if changed {
            self.save_queue(user, &queue)?;
            info!(user, size = queue.len(), "queue extended");
        }
        Ok(reply)
    }

    pub fn remove(&self, user: &str, input: &str) -> Result<Reply> {
        let handle = self.session(user);
        let session = session::lock(&handle);
        let mut queue = self.load_queue(user)?;
        if queue.is_empty() {
            return Err(NotFound::EmptyQueue.into());
        }

        let songs = self.load_songs()?;
        let multi = catalog::looks_like_multi_index(input);
        let indexes = match self.resolve_indexes(&songs, input, session.current.as_deref())? {
            Ok(indexes) => indexes,
            Err(hits) => return Ok(hits),
        };

        let mut reply = Vec::new();
        let mut changed = false;
        for index in indexes {
            let song = &songs[index];
            let before = queue.len();
            queue.retain(|link| link != &song.link);
            if queue.len() == before {
                if !multi {
                    return Err(NotFound::InQueue.into());
                }
                reply.push(Message::new(MessageKey::NotInQueue));
            } else {
                reply.push(Message::with(MessageKey::RemovedFromQueue, [song.name.clone()]));
                changed = true;
            }
        }
        if changed {
            self.save_queue(user, &queue)?;
            info!(user, size = queue.len(), "queue trimmed");
        }
        Ok(reply)
    }

    // Ok(indexes) to act on, or Err(reply) listing an ambiguous match.
    fn resolve_indexes(
        &self,
        songs: &[Song],
        input: &str,
        current: Option<&str>,
    ) -> Result<std::result::Result<Vec<usize>, Reply>> {
        if catalog::looks_like_multi_index(input) {
            return Ok(Ok(catalog::parse_multi_index(input, songs.len())?));
        }
        match catalog::find_song(songs, input) {
            Lookup::One { index, .. } => Ok(Ok(vec![index])),
            Lookup::Many(hits) => Ok(Err(self.hit_list(&hits, current))),
            Lookup::None => Err(NotFound::Song.into()),
        }
    }

    pub fn shuffle(&self, user: &str) -> Result<Reply> {
        let handle = self.session(user);
        let _session = session::lock(&handle);
        if !self.shared.queues.exists(user) {
            return Err(NotFound::Queue.into());
        }

        let mut queue = self.load_queue(user)?;
        {
            let mut rng = self.shared.rng.lock().unwrap_or_else(PoisonError::into_inner);
            queue.shuffle(&mut *rng);
        }
        self.save_queue(user, &queue)?;
        Ok(vec![Message::new(MessageKey::QueueShuffled)])
    }

    pub fn queue(&self, user: &str, page: Option<usize>) -> Result<Reply> {
        let handle = self.session(user);
        let mut session = session::lock(&handle);
        let queue = self.load_queue(user)?;
        if queue.is_empty() {
            return Err(NotFound::EmptyQueue.into());
        }

        let per_page = self.shared.settings.items_per_page;
        let requested = match page {
            Some(page) => Page::validate(page, queue.len(), per_page)?,
            None => session.queue_page,
        };
        let page = Page::of(queue.len(), requested, per_page);
        session.queue_page = page.page;

        let songs = self.load_songs()?;
        let current = session.current.as_deref();
        let mut reply = vec![page_info(&page)];
        reply.extend(queue[page.start..page.end].iter().filter_map(|link| {
            let index = catalog::index_of(&songs, link)?;
            Some(song_line(index, &songs[index], current == Some(link.as_str())))
        }));
        Ok(reply)
    }

    pub fn queue_search(&self, user: &str, keyword: &str) -> Result<Reply> {
        let current = self.session_view(user).current;
        let queue = self.load_queue(user)?;
        if queue.is_empty() {
            return Err(NotFound::EmptyQueue.into());
        }

        let songs = self.load_songs()?;
        let hits: Vec<(usize, Song)> = catalog::search(&songs, keyword)
            .into_iter()
            .filter(|(_, song)| queue.contains(&song.link))
            .collect();
        if hits.is_empty() {
            return Err(NotFound::Song.into());
        }
        Ok(self.hit_list(&hits, current.as_deref()))
    }
}
