use super::Player;
use super::browse::page_info;
use crate::catalog::{self, Page};
use crate::duration::{format_duration, whole_seconds};
use crate::error::{InvalidInput, NotFound, Result};
use crate::message::{Message, MessageKey, Reply};
use crate::model::Song;
use crate::scheduler;
use crate::session;
use std::time::Duration;
use tracing::info;

fn split_artists(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|artist| artist.trim().replace('_', " "))
        .filter(|artist| !artist.is_empty())
        .collect()
}

fn catalog_index(songs: &[Song], raw: &str) -> std::result::Result<usize, InvalidInput> {
    let number: usize = raw.trim().parse().unwrap_or(0);
    match number.checked_sub(1) {
        Some(index) if index < songs.len() => Ok(index),
        _ => Err(InvalidInput::Index(number)),
    }
}

fn unused_link(songs: &[Song], base: &str) -> String {
    let mut candidate = format!("{base}_copy");
    let mut suffix = 2;
    while catalog::index_of(songs, &candidate).is_some() {
        candidate = format!("{base}_copy{suffix}");
        suffix += 1;
    }
    candidate
}

fn seconds_label(duration: Duration) -> String {
    format!("{:.1}", duration.as_secs_f64())
}

fn parse_flag(raw: &str) -> std::result::Result<bool, InvalidInput> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "on" => Ok(true),
        "false" | "0" | "off" => Ok(false),
        other => Err(InvalidInput::TimerFlag(other.to_string())),
    }
}

impl Player {
    pub fn admin_add(&self, name: &str, artists: &str, link: &str) -> Result<Reply> {
        let name = name.trim().replace('_', " ");
        let link = link.trim().to_lowercase();
        let mut songs = self.load_songs()?;
        if catalog::index_of(&songs, &link).is_some() {
            return Err(InvalidInput::LinkTaken(link).into());
        }
        songs.push(Song::new(name.clone(), link, split_artists(artists)));
        self.save_songs(&songs)?;
        info!(song = %name, "catalog record added");
        Ok(vec![Message::with(MessageKey::SongAdded, [name])])
    }

    pub fn admin_delete(&self, index: &str) -> Result<Reply> {
        self.edit_song(index, |songs, index| {
            let removed = songs.remove(index);
            info!(link = %removed.link, "catalog record deleted");
            Ok(Message::new(MessageKey::SongDeleted))
        })
    }

    // The copy gets `<link>_copy` (or `_copy2`, ...) so links stay unique.
    pub fn admin_copy(&self, index: &str) -> Result<Reply> {
        self.edit_song(index, |songs, index| {
            let mut copy = songs[index].clone();
            copy.link = unused_link(songs, &copy.link);
            songs.push(copy);
            Ok(Message::new(MessageKey::SongCopied))
        })
    }

    pub fn admin_set_name(&self, index: &str, name: &str) -> Result<Reply> {
        let name = name.trim().replace('_', " ");
        self.edit_song(index, move |songs, index| {
            songs[index].name = name;
            Ok(Message::new(MessageKey::NameEdited))
        })
    }

    pub fn admin_set_artist(&self, index: &str, artists: &str) -> Result<Reply> {
        let artists = split_artists(artists);
        self.edit_song(index, move |songs, index| {
            songs[index].artist = artists;
            Ok(Message::new(MessageKey::ArtistEdited))
        })
    }

    pub fn admin_set_link(&self, index: &str, link: &str) -> Result<Reply> {
        let link = link.trim().to_lowercase();
        self.edit_song(index, move |songs, index| {
            let taken = songs
                .iter()
                .enumerate()
                .any(|(other, song)| other != index && song.link == link);
            if taken {
                return Err(InvalidInput::LinkTaken(link).into());
            }
            songs[index].link = link;
            Ok(Message::new(MessageKey::LinkEdited))
        })
    }

    pub fn admin_set_duration(&self, index: &str, value: &str) -> Result<Reply> {
        let seconds: f64 = value
            .trim()
            .parse()
            .ok()
            .filter(|seconds: &f64| seconds.is_finite() && *seconds >= 0.0)
            .ok_or_else(|| InvalidInput::Duration(value.trim().to_string()))?;
        let seconds = whole_seconds(Some(seconds));
        self.edit_song(index, move |songs, index| {
            songs[index].duration = seconds;
            let label = match format_duration(seconds) {
                text if text.is_empty() => String::from("0:00"),
                text => text,
            };
            Ok(Message::with(MessageKey::DurationEdited, [label]))
        })
    }

    fn edit_song<F>(&self, index: &str, edit: F) -> Result<Reply>
    where
        F: FnOnce(&mut Vec<Song>, usize) -> Result<Message>,
    {
        let mut songs = self.load_songs()?;
        let index = catalog_index(&songs, index)?;
        let message = edit(&mut songs, index)?;
        self.save_songs(&songs)?;
        Ok(vec![message])
    }

    pub fn admin_info(&self, page: Option<usize>) -> Result<Reply> {
        let songs = self.load_songs()?;
        if songs.is_empty() {
            return Err(NotFound::Songs.into());
        }
        let per_page = self.shared.settings.items_per_page;
        let requested = match page {
            Some(page) => Page::validate(page, songs.len(), per_page)?,
            None => 1,
        };
        let page = Page::of(songs.len(), requested, per_page);

        let mut reply = vec![page_info(&page)];
        reply.extend(songs[page.start..page.end].iter().enumerate().map(|(offset, song)| {
            let duration = match format_duration(song.duration) {
                text if text.is_empty() => String::from("?"),
                text => text,
            };
            Message::with(
                MessageKey::InfoLine,
                [
                    (page.start + offset + 1).to_string(),
                    song.name.clone(),
                    song.artists_label(),
                    duration,
                    song.link.clone(),
                ],
            )
        }));
        Ok(reply)
    }

    pub fn debug(&self, user: &str) -> Result<Reply> {
        let view = self.session_view(user);
        let mut reply = vec![
            Message::with(MessageKey::DebugHeader, [user]),
            Message::with(
                MessageKey::DebugCurrentSong,
                [view.current.clone().unwrap_or_else(|| String::from("-"))],
            ),
            Message::with(MessageKey::DebugPlayMode, [view.mode.as_str()]),
            Message::with(MessageKey::DebugPaused, [view.paused.to_string()]),
        ];
        reply.push(match view.timer {
            Some(timer) => Message::with(
                MessageKey::DebugTimerActive,
                [
                    timer.alive.to_string(),
                    seconds_label(timer.interval),
                    seconds_label(timer.remaining),
                ],
            ),
            None => Message::new(MessageKey::DebugTimerNone),
        });

        let queue = self.load_queue(user)?;
        let songs = self.load_songs()?;
        reply.push(Message::with(MessageKey::DebugQueue, [queue.len().to_string()]));
        reply.extend(queue.iter().enumerate().map(|(position, link)| {
            let name = catalog::song_for(&songs, link)
                .map_or_else(|| String::from("?"), |song| song.name.clone());
            let marker = if view.current.as_deref() == Some(link.as_str()) {
                " ◄"
            } else {
                ""
            };
            Message::with(
                MessageKey::DebugQueueLine,
                [(position + 1).to_string(), name, link.clone(), marker.to_string()],
            )
        }));
        Ok(reply)
    }

    pub fn timer_reset(&self, user: &str) -> Result<Reply> {
        let not_found = || NotFound::Timer(user.to_string());
        let handle = self.existing_session(user).ok_or_else(not_found)?;
        let mut session = session::lock(&handle);
        if !scheduler::cancel(&mut session.timer) {
            return Err(not_found().into());
        }
        info!(user, "timer reset by admin");
        Ok(vec![Message::with(MessageKey::TimerReset, [user])])
    }

    pub fn timer_interval(&self, user: &str, value: &str) -> Result<Reply> {
        let not_found = || NotFound::Timer(user.to_string());
        let handle = self.existing_session(user).ok_or_else(not_found)?;
        let mut session = session::lock(&handle);
        let timer = session.timer.as_mut().ok_or_else(not_found)?;

        let interval = value
            .trim()
            .parse::<f64>()
            .ok()
            .and_then(|seconds| Duration::try_from_secs_f64(seconds).ok())
            .ok_or_else(|| InvalidInput::TimerInterval(value.trim().to_string()))?;
        self.shared.scheduler.reschedule(timer, interval);
        info!(user, secs = interval.as_secs_f64(), "timer interval changed by admin");
        Ok(vec![Message::with(
            MessageKey::TimerIntervalSet,
            [user.to_string(), seconds_label(interval)],
        )])
    }

    pub fn timer_active(&self, user: &str, flag: &str) -> Result<Reply> {
        let not_found = || NotFound::Timer(user.to_string());
        let handle = self.existing_session(user).ok_or_else(not_found)?;
        let mut session = session::lock(&handle);
        let timer = session.timer.as_mut().ok_or_else(not_found)?;
        let activate = parse_flag(flag)?;
        let interval = seconds_label(timer.interval());

        let key = match (activate, timer.is_alive()) {
            (true, true) => MessageKey::TimerAlreadyActive,
            (false, false) => MessageKey::TimerAlreadyInactive,
            (true, false) => {
                self.shared.scheduler.reactivate(timer);
                MessageKey::TimerReactivated
            }
            (false, true) => {
                timer.deactivate();
                MessageKey::TimerDeactivated
            }
        };
        info!(user, activate, "timer toggled by admin");
        Ok(vec![Message::with(key, [user.to_string(), interval])])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PlayerError;
    use crate::store::{CatalogStore, MemoryStore};
    use std::sync::Arc;

    fn player(songs: Vec<Song>) -> (Player, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::with_songs(songs));
        let player = Player::builder(store.clone()).build().expect("player");
        (player, store)
    }

    fn catalog_of(store: &MemoryStore) -> Vec<Song> {
        CatalogStore::load(store).expect("catalog")
    }

    #[tokio::test]
    async fn add_reads_underscores_and_splits_artists() {
        let (player, store) = player(Vec::new());
        player
            .admin_add("Still_Alive", "Jonathan_Coulton, GLaDOS", "Still_Alive")
            .expect("add");

        let songs = catalog_of(&store);
        assert_eq!(songs[0].name, "Still Alive");
        assert_eq!(songs[0].artist, vec!["Jonathan Coulton", "GLaDOS"]);
        assert_eq!(songs[0].link, "still_alive");
    }

    #[tokio::test]
    async fn edits_validate_the_index() {
        let (player, store) = player(vec![Song::new("A", "a", Vec::new())]);
        assert!(matches!(
            player.admin_delete("2"),
            Err(PlayerError::InvalidInput(InvalidInput::Index(2)))
        ));
        assert!(matches!(
            player.admin_set_name("x", "B"),
            Err(PlayerError::InvalidInput(InvalidInput::Index(0)))
        ));

        player.admin_copy("1").expect("copy");
        player.admin_set_link("2", "B_Link").expect("relink");
        player.admin_set_name("2", "Song_B").expect("rename");
        let songs = catalog_of(&store);
        assert_eq!(songs.len(), 2);
        assert_eq!(songs[1].link, "b_link");
        assert_eq!(songs[1].name, "Song B");

        player.admin_delete("1").expect("delete");
        assert_eq!(catalog_of(&store)[0].link, "b_link");
    }

    #[tokio::test]
    async fn links_stay_unique_across_add_copy_and_relink() {
        let (player, store) = player(vec![
            Song::new("A", "a", Vec::new()),
            Song::new("B", "b", Vec::new()),
        ]);

        let err = player.admin_add("Again", "X", "A").expect_err("taken");
        assert!(matches!(
            err,
            PlayerError::InvalidInput(InvalidInput::LinkTaken(ref link)) if link == "a"
        ));
        assert_eq!(err.message(), Message::with(MessageKey::LinkTaken, ["a"]));

        player.admin_copy("1").expect("copy");
        player.admin_copy("1").expect("copy again");
        let links: Vec<String> = catalog_of(&store).into_iter().map(|song| song.link).collect();
        assert_eq!(links, vec!["a", "b", "a_copy", "a_copy2"]);

        assert!(matches!(
            player.admin_set_link("3", "B"),
            Err(PlayerError::InvalidInput(InvalidInput::LinkTaken(_)))
        ));
        player.admin_set_link("2", "b").expect("own link is fine");
        assert_eq!(catalog_of(&store)[2].link, "a_copy");
        assert_eq!(catalog_of(&store).len(), 4);
    }

    #[tokio::test]
    async fn duration_override_rounds_up_and_rejects_garbage() {
        let (player, store) = player(vec![Song::new("A", "a", Vec::new())]);
        let reply = player.admin_set_duration("1", "90.2").expect("set");
        assert_eq!(reply, vec![Message::with(MessageKey::DurationEdited, ["1:31"])]);
        assert_eq!(catalog_of(&store)[0].duration, 91);

        for bad in ["-3", "soon", "NaN"] {
            assert!(matches!(
                player.admin_set_duration("1", bad),
                Err(PlayerError::InvalidInput(InvalidInput::Duration(_)))
            ));
        }
        assert_eq!(catalog_of(&store)[0].duration, 91);
    }

    #[tokio::test]
    async fn info_shows_unknown_lengths() {
        let (player, _) = player(vec![
            Song::new("A", "a", vec![String::from("X")]).with_duration(61),
            Song::new("B", "b", Vec::new()),
        ]);
        let reply = player.admin_info(None).expect("info");
        assert_eq!(reply[1].args, vec!["1", "A", "X", "1:01", "a"]);
        assert_eq!(reply[2].args[3], "?");
    }

    #[tokio::test]
    async fn timer_admin_without_timer_is_not_found() {
        let (player, _) = player(Vec::new());
        for result in [
            player.timer_reset("alex"),
            player.timer_interval("alex", "5"),
            player.timer_active("alex", "on"),
        ] {
            assert!(matches!(
                result,
                Err(PlayerError::NotFound(NotFound::Timer(user))) if user == "alex"
            ));
        }
    }

    #[tokio::test(start_paused = true)]
    async fn timer_admin_controls_a_live_timer() {
        let (player, _) = player(vec![Song::new("A", "a", Vec::new()).with_duration(30)]);
        player.play("alex", Some("a")).expect("play");

        assert!(matches!(
            player.timer_interval("alex", "-1"),
            Err(PlayerError::InvalidInput(InvalidInput::TimerInterval(_)))
        ));
        player.timer_interval("alex", "5").expect("retune");
        let timer = player.session_view("alex").timer.expect("timer");
        assert_eq!(timer.interval, Duration::from_secs(5));

        let reply = player.timer_active("alex", "off").expect("off");
        assert_eq!(reply[0].key, MessageKey::TimerDeactivated);
        let reply = player.timer_active("alex", "0").expect("off again");
        assert_eq!(reply[0].key, MessageKey::TimerAlreadyInactive);
        assert!(matches!(
            player.timer_active("alex", "maybe"),
            Err(PlayerError::InvalidInput(InvalidInput::TimerFlag(_)))
        ));
        let reply = player.timer_active("alex", "TRUE").expect("on");
        assert_eq!(reply[0], Message::with(MessageKey::TimerReactivated, ["alex", "5.0"]));

        player.timer_reset("alex").expect("reset");
        assert!(player.session_view("alex").timer.is_none());
    }

    #[tokio::test]
    async fn debug_lists_queue_with_names() {
        let (player, _) = player(vec![Song::new("A", "a", Vec::new())]);
        player.add("alex", "1").expect("add");
        let reply = player.debug("alex").expect("debug");

        assert_eq!(reply[1], Message::with(MessageKey::DebugCurrentSong, ["-"]));
        assert_eq!(reply[4], Message::new(MessageKey::DebugTimerNone));
        assert_eq!(reply[5], Message::with(MessageKey::DebugQueue, ["1"]));
        assert_eq!(reply[6].args, vec!["1", "A", "a", ""]);
    }
}
