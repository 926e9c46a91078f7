mod admin;
mod browse;

use crate::catalog::{self, Lookup};
use crate::config::Settings;
use crate::error::{InvalidInput, NotFound, PlayerError, Result};
use crate::message::{
    AutoAdvanceTemplates, EnglishLocalizer, Localizer, Message, MessageKey, Notifier, Reply,
    SilentNotifier,
};
use crate::model::{Direction, PlayMode, SessionSnapshot, Song, UnknownMode};
use crate::scheduler::{self, AutoAdvanceJob, FireCallback, Scheduler, TimerId, TimerStatus};
use crate::selection::{self, Selection};
use crate::session::{self, Session, SessionHandle, SessionStore};
use crate::store::{CatalogStore, QueueStore};
use crate::target::{Action, NullTarget, PlaybackTarget};
use anyhow::Context;
use rand::SeedableRng;
use rand::rngs::SmallRng;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::runtime::Handle;
use tracing::{debug, info, warn};

struct Shared {
    catalog: Arc<dyn CatalogStore>,
    queues: Arc<dyn QueueStore>,
    target: Arc<dyn PlaybackTarget>,
    notifier: Arc<dyn Notifier>,
    localizer: Arc<dyn Localizer>,
    settings: Settings,
    sessions: SessionStore,
    scheduler: Scheduler,
    rng: Mutex<SmallRng>,
}

#[derive(Clone)]
pub struct Player {
    shared: Arc<Shared>,
}

pub struct PlayerBuilder {
    catalog: Arc<dyn CatalogStore>,
    queues: Arc<dyn QueueStore>,
    target: Arc<dyn PlaybackTarget>,
    notifier: Arc<dyn Notifier>,
    localizer: Arc<dyn Localizer>,
    settings: Settings,
    runtime: Option<Handle>,
    seed: Option<u64>,
}

impl PlayerBuilder {
    pub fn new(catalog: Arc<dyn CatalogStore>, queues: Arc<dyn QueueStore>) -> Self {
        Self {
            catalog,
            queues,
            target: Arc::new(NullTarget),
            notifier: Arc::new(SilentNotifier),
            localizer: Arc::new(EnglishLocalizer),
            settings: Settings::default(),
            runtime: None,
            seed: None,
        }
    }

    pub fn target(mut self, target: Arc<dyn PlaybackTarget>) -> Self {
        self.target = target;
        self
    }

    pub fn notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = notifier;
        self
    }

    pub fn localizer(mut self, localizer: Arc<dyn Localizer>) -> Self {
        self.localizer = localizer;
        self
    }

    pub fn settings(mut self, settings: Settings) -> Self {
        self.settings = settings;
        self
    }

    pub fn runtime(mut self, runtime: Handle) -> Self {
        self.runtime = Some(runtime);
        self
    }

    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn build(self) -> anyhow::Result<Player> {
        let runtime = match self.runtime {
            Some(runtime) => runtime,
            None => Handle::try_current().context("auto-advance timers need a tokio runtime")?,
        };
        let rng = match self.seed {
            Some(seed) => SmallRng::seed_from_u64(seed),
            None => rand::make_rng(),
        };
        Ok(Player {
            shared: Arc::new(Shared {
                catalog: self.catalog,
                queues: self.queues,
                target: self.target,
                notifier: self.notifier,
                localizer: self.localizer,
                sessions: SessionStore::new(self.settings.default_mode),
                settings: self.settings,
                scheduler: Scheduler::new(runtime),
                rng: Mutex::new(rng),
            }),
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SessionView {
    pub current: Option<String>,
    pub paused: bool,
    pub mode: PlayMode,
    pub list_page: usize,
    pub queue_page: usize,
    pub timer: Option<TimerStatus>,
}

impl Player {
    pub fn builder<S>(store: Arc<S>) -> PlayerBuilder
    where
        S: CatalogStore + QueueStore + 'static,
    {
        let catalog: Arc<dyn CatalogStore> = store.clone();
        let queues: Arc<dyn QueueStore> = store;
        PlayerBuilder::new(catalog, queues)
    }

    pub fn render(&self, reply: &[Message]) -> Vec<String> {
        reply
            .iter()
            .map(|message| self.shared.localizer.render(message))
            .collect()
    }

    pub fn session_view(&self, user: &str) -> SessionView {
        let handle = self.session(user);
        let session = session::lock(&handle);
        SessionView {
            current: session.current.clone(),
            paused: session.paused,
            mode: session.mode,
            list_page: session.list_page,
            queue_page: session.queue_page,
            timer: session.timer.as_ref().map(|timer| timer.status()),
        }
    }

    pub fn play(&self, user: &str, query: Option<&str>) -> Result<Reply> {
        match query.map(str::trim).filter(|query| !query.is_empty()) {
            Some(query) => self.play_query(user, query),
            None => self.play_current(user),
        }
    }

    fn play_query(&self, user: &str, query: &str) -> Result<Reply> {
        let handle = self.session(user);
        let mut session = session::lock(&handle);

        let songs = self.load_songs()?;
        let song = match catalog::find_song(&songs, query) {
            Lookup::One { song, .. } => song,
            Lookup::Many(hits) => return Ok(self.hit_list(&hits, session.current.as_deref())),
            Lookup::None => return Err(NotFound::Song.into()),
        };

        let mut queue = self.load_queue(user)?;
        if !queue.contains(&song.link) {
            queue.push(song.link.clone());
            self.save_queue(user, &queue)?;
        }

        scheduler::cancel(&mut session.timer);
        if let Some(previous) = session.current.as_deref() {
            self.shared.target.signal(user, previous, Action::Stop);
        }
        self.start(user, &mut session, &song.link, Some(&song), self.templates());

        Ok(vec![
            Message::with(MessageKey::FoundSong, [song.name.clone(), song.artists_label()]),
            Message::with(MessageKey::Playing, [song.name]),
        ])
    }

    fn play_current(&self, user: &str) -> Result<Reply> {
        let handle = self.session(user);
        let mut session = session::lock(&handle);
        let songs = self.load_songs()?;

        if let Some(current) = session.current.clone() {
            let song = catalog::song_for(&songs, &current);
            self.start(user, &mut session, &current, song, self.templates());
            let label = song.map_or(current.as_str(), |song| song.name.as_str());
            return Ok(vec![Message::with(MessageKey::Resumed, [label])]);
        }

        let queue = self.load_queue(user)?;
        let Some(head) = queue.first() else {
            return Err(NotFound::EmptyQueue.into());
        };
        let song = catalog::song_for(&songs, head);
        self.start(user, &mut session, head, song, self.templates());
        Ok(song
            .map(|song| Message::with(MessageKey::Playing, [song.name.clone()]))
            .into_iter()
            .collect())
    }

    pub fn pause(&self, user: &str) -> Result<Reply> {
        let handle = self.session(user);
        let mut session = session::lock(&handle);
        scheduler::cancel(&mut session.timer);

        if !self.shared.queues.exists(user) {
            return Err(NotFound::Queue.into());
        }
        let Some(current) = session.current.clone() else {
            return Ok(vec![Message::new(MessageKey::NoCurrentSong)]);
        };

        let name = self.display_name(&current)?;
        self.shared.target.signal(user, &current, Action::Pause);
        session.paused = true;
        info!(user, link = %current, "paused");
        Ok(vec![Message::with(MessageKey::Paused, [name])])
    }

    pub fn resume(&self, user: &str) -> Result<Reply> {
        let handle = self.session(user);
        let mut session = session::lock(&handle);

        if !self.shared.queues.exists(user) {
            return Err(NotFound::Queue.into());
        }
        let Some(current) = session.current.clone() else {
            return Ok(vec![Message::new(MessageKey::NoCurrentSong)]);
        };

        let name = self.display_name(&current)?;
        self.shared.target.signal(user, &current, Action::Play);
        session.paused = false;
        info!(user, link = %current, "resumed");
        Ok(vec![Message::with(MessageKey::Resumed, [name])])
    }

    pub fn next(&self, user: &str) -> Result<Reply> {
        self.step(user, Direction::Forward)
    }

    pub fn prev(&self, user: &str) -> Result<Reply> {
        self.step(user, Direction::Backward)
    }

    fn step(&self, user: &str, direction: Direction) -> Result<Reply> {
        let handle = self.session(user);
        let mut session = session::lock(&handle);
        scheduler::cancel(&mut session.timer);

        let queue = self.load_queue(user)?;
        match queue.len() {
            0 => return Err(NotFound::EmptyQueue.into()),
            1 => return Err(PlayerError::CannotAdvance(direction)),
            _ => {}
        }

        let picked = self.pick(&queue, session.current.as_deref(), session.mode, direction);
        let link = match picked {
            Selection::SequenceEnded => {
                info!(user, "manual next ran off the end of the queue");
                return Ok(vec![Message::new(MessageKey::SequentialEnd)]);
            }
            Selection::Idle => return Err(NotFound::CurrentSong.into()),
            Selection::Repeat(link) | Selection::Advance { link, .. } => link,
        };
        if let Some(previous) = session.current.as_deref() {
            self.shared.target.signal(user, previous, Action::Stop);
        }

        let songs = self.load_songs()?;
        let song = catalog::song_for(&songs, &link);
        self.start(user, &mut session, &link, song, self.templates());

        let key = match direction {
            Direction::Forward => MessageKey::NextPlaying,
            Direction::Backward => MessageKey::PrevPlaying,
        };
        Ok(song
            .map(|song| Message::with(key, [song.name.clone()]))
            .into_iter()
            .collect())
    }

    pub fn mode(&self, user: &str) -> Reply {
        let handle = self.session(user);
        let mode = session::lock(&handle).mode;
        let options: Vec<&str> = PlayMode::ALL.iter().map(|mode| mode.as_str()).collect();
        vec![
            Message::with(MessageKey::CurrentMode, [mode.as_str()]),
            Message::with(MessageKey::ModeOptions, [options.join(", ")]),
        ]
    }

    pub fn set_mode(&self, user: &str, value: &str) -> Result<Reply> {
        let mode: PlayMode = value
            .parse()
            .map_err(|err: UnknownMode| InvalidInput::Mode(err.0))?;
        let handle = self.session(user);
        session::lock(&handle).mode = mode;
        info!(user, %mode, "mode changed");
        Ok(vec![Message::with(MessageKey::ModeSet, [mode.as_str()])])
    }

    pub fn clear(&self, user: &str) -> Result<Reply> {
        let handle = self.session(user);
        let mut session = session::lock(&handle);

        self.save_queue(user, &[])?;
        scheduler::cancel(&mut session.timer);
        if let Some(current) = session.current.take() {
            self.shared.target.signal(user, &current, Action::Stop);
        }
        session.paused = false;
        Ok(vec![Message::new(MessageKey::QueueCleared)])
    }

    pub fn adopt_sessions(&self, previous: &Player) -> usize {
        let cancelled = previous.shared.sessions.cancel_all_timers();
        if cancelled > 0 {
            warn!(cancelled, "cancelled auto-advance timers of the replaced player");
        }
        let snapshots = previous.snapshot_sessions();
        self.restore_sessions(&snapshots);
        snapshots.len()
    }

    pub fn snapshot_sessions(&self) -> Vec<SessionSnapshot> {
        self.shared.sessions.snapshot()
    }

    pub fn restore_sessions(&self, snapshots: &[SessionSnapshot]) {
        self.shared.sessions.restore(snapshots);
        debug!(count = snapshots.len(), "restored sessions");
    }

    pub fn cancel_all_timers(&self) -> usize {
        self.shared.sessions.cancel_all_timers()
    }

    fn session(&self, user: &str) -> SessionHandle {
        self.shared.sessions.entry(user)
    }

    fn existing_session(&self, user: &str) -> Option<SessionHandle> {
        self.shared.sessions.get(user)
    }

    fn load_songs(&self) -> Result<Vec<Song>> {
        Ok(self.shared.catalog.load()?)
    }

    fn save_songs(&self, songs: &[Song]) -> Result<()> {
        Ok(self.shared.catalog.save(songs)?)
    }

    fn load_queue(&self, user: &str) -> Result<Vec<String>> {
        Ok(self.shared.queues.load(user)?)
    }

    fn save_queue(&self, user: &str, queue: &[String]) -> Result<()> {
        Ok(self.shared.queues.save(user, queue)?)
    }

    fn display_name(&self, link: &str) -> Result<String> {
        let songs = self.load_songs()?;
        Ok(catalog::song_for(&songs, link).map_or_else(|| link.to_string(), |song| song.name.clone()))
    }

    fn templates(&self) -> AutoAdvanceTemplates {
        AutoAdvanceTemplates::render(self.shared.localizer.as_ref())
    }

    fn pick(
        &self,
        queue: &[String],
        current: Option<&str>,
        mode: PlayMode,
        direction: Direction,
    ) -> Selection {
        let mut rng = self.shared.rng.lock().unwrap_or_else(PoisonError::into_inner);
        selection::select(queue, current, mode, direction, &mut rng)
    }

    fn start(
        &self,
        user: &str,
        session: &mut Session,
        link: &str,
        song: Option<&Song>,
        templates: AutoAdvanceTemplates,
    ) {
        scheduler::cancel(&mut session.timer);
        self.shared.target.signal(user, link, Action::Play);
        session.current = Some(link.to_string());
        session.paused = false;
        info!(user, link, "playing");

        match song {
            Some(song) if song.has_known_duration() => {
                self.arm(user, session, song.duration, templates);
            }
            Some(_) => debug!(user, link, "duration unknown, no auto-advance"),
            None => warn!(user, link, "queued link has no catalog record"),
        }
    }

    fn arm(&self, user: &str, session: &mut Session, seconds: u32, templates: AutoAdvanceTemplates) {
        let grace = self.shared.settings.auto_advance_grace_seconds;
        let interval = Duration::from_secs(u64::from(seconds).saturating_add(grace));
        let job = AutoAdvanceJob {
            user: user.to_string(),
            templates,
        };
        let weak = Arc::downgrade(&self.shared);
        let on_fire: FireCallback = Arc::new(move |id, job| {
            if let Some(shared) = weak.upgrade() {
                Player { shared }.on_timer(id, job);
            }
        });
        self.shared
            .scheduler
            .arm(&mut session.timer, interval, job, on_fire);
    }

    fn on_timer(&self, id: TimerId, job: AutoAdvanceJob) {
        let handle = self.session(&job.user);
        let mut session = session::lock(&handle);
        if scheduler::claim(&mut session.timer, id).is_none() {
            debug!(user = %job.user, id, "ignored stale auto-advance");
            return;
        }
        debug!(user = %job.user, id, "auto-advance fired");
        if let Err(err) = self.auto_advance(&mut session, &job) {
            warn!(user = %job.user, "auto-advance failed: {err}");
        }
    }

    // Queue and mode are read now, not when the timer was armed.
    fn auto_advance(&self, session: &mut Session, job: &AutoAdvanceJob) -> Result<()> {
        let user = job.user.as_str();
        let queue = self.load_queue(user)?;
        if queue.is_empty() {
            debug!(user, "queue emptied while waiting, auto-advance dropped");
            return Ok(());
        }

        let picked = self.pick(&queue, session.current.as_deref(), session.mode, Direction::Forward);
        let link = match picked {
            Selection::SequenceEnded => {
                info!(user, "reached the end of the queue");
                self.shared
                    .notifier
                    .tell(user, job.templates.sequence_ended());
                return Ok(());
            }
            Selection::Idle => return Ok(()),
            Selection::Repeat(link) => link,
            Selection::Advance { link, .. } => {
                if let Some(previous) = session.current.as_deref() {
                    self.shared.target.signal(user, previous, Action::Stop);
                }
                link
            }
        };

        let songs = self.load_songs()?;
        let song = catalog::song_for(&songs, &link);
        self.start(user, session, &link, song, job.templates.clone());
        if let Some(song) = song {
            self.shared
                .notifier
                .tell(user, &job.templates.auto_next(&song.name));
        }
        Ok(())
    }
}
