use std::sync::Mutex;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageKey {
    Playing,
    Resumed,
    Paused,
    FoundSong,
    NextPlaying,
    PrevPlaying,
    AutoNext,
    SequentialEnd,
    QueueEmpty,
    QueueOneSongNoNext,
    QueueOneSongNoPrev,
    QueueShuffled,
    QueueCleared,
    AddedToQueue,
    AlreadyInQueue,
    RemovedFromQueue,
    NotInQueue,
    NoCurrentSong,
    CurrentMode,
    ModeSet,
    ModeOptions,
    InvalidMode,
    NoSongs,
    NoMatch,
    FoundSongs,
    PageInfo,
    SongLine,
    LinkLine,
    InvalidPage,
    InvalidIndex,
    InvalidRange,
    SongAdded,
    SongDeleted,
    SongCopied,
    NameEdited,
    ArtistEdited,
    LinkEdited,
    LinkTaken,
    DurationEdited,
    DurationInvalid,
    InfoLine,
    DebugHeader,
    DebugCurrentSong,
    DebugPlayMode,
    DebugPaused,
    DebugTimerActive,
    DebugTimerNone,
    DebugQueue,
    DebugQueueLine,
    TimerNotFound,
    TimerReset,
    TimerIntervalSet,
    TimerIntervalInvalid,
    TimerAlreadyActive,
    TimerReactivated,
    TimerAlreadyInactive,
    TimerDeactivated,
    TimerValueInvalid,
    SessionsReloaded,
    StorageFailed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub key: MessageKey,
    pub args: Vec<String>,
}

impl Message {
    pub fn new(key: MessageKey) -> Self {
        Self {
            key,
            args: Vec::new(),
        }
    }

    pub fn with<I, S>(key: MessageKey, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            key,
            args: args.into_iter().map(Into::into).collect(),
        }
    }
}

pub type Reply = Vec<Message>;

pub trait Localizer: Send + Sync {
    fn template(&self, key: MessageKey) -> String;

    fn render(&self, message: &Message) -> String {
        fill_template(&self.template(message.key), &message.args)
    }
}

pub fn fill_template(template: &str, args: &[String]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let after = &rest[open + 1..];
        let substituted = after.find('}').and_then(|close| {
            let index: usize = after[..close].parse().ok()?;
            let arg = args.get(index)?;
            Some((arg, close))
        });
        match substituted {
            Some((arg, close)) => {
                out.push_str(arg);
                rest = &after[close + 1..];
            }
            None => {
                out.push('{');
                rest = after;
            }
        }
    }
    out.push_str(rest);
    out
}

#[derive(Debug, Default, Clone, Copy)]
pub struct EnglishLocalizer;

impl Localizer for EnglishLocalizer {
    fn template(&self, key: MessageKey) -> String {
        let text = match key {
            MessageKey::Playing => "Now playing: {0}",
            MessageKey::Resumed => "Resumed: {0}",
            MessageKey::Paused => "Paused: {0}",
            MessageKey::FoundSong => "Found {0} by {1}",
            MessageKey::NextPlaying => "Next: {0}",
            MessageKey::PrevPlaying => "Previous: {0}",
            MessageKey::AutoNext => "Auto next: {0}",
            MessageKey::SequentialEnd => "Reached the end of the queue",
            MessageKey::QueueEmpty => "Your queue is empty",
            MessageKey::QueueOneSongNoNext => "Only one song in the queue, nothing to skip to",
            MessageKey::QueueOneSongNoPrev => "Only one song in the queue, nothing to go back to",
            MessageKey::QueueShuffled => "Queue shuffled",
            MessageKey::QueueCleared => "Queue cleared",
            MessageKey::AddedToQueue => "Added to queue: {0}",
            MessageKey::AlreadyInQueue => "Already in queue: {0}",
            MessageKey::RemovedFromQueue => "Removed from queue: {0}",
            MessageKey::NotInQueue => "That song is not in your queue",
            MessageKey::NoCurrentSong => "Nothing is playing",
            MessageKey::CurrentMode => "Play mode: {0}",
            MessageKey::ModeSet => "Play mode set to {0}",
            MessageKey::ModeOptions => "Available modes: {0}",
            MessageKey::InvalidMode => "Unknown play mode, use single, random, sequential or loop",
            MessageKey::NoSongs => "The catalog is empty",
            MessageKey::NoMatch => "No matching song",
            MessageKey::FoundSongs => "Found {0} songs:",
            MessageKey::PageInfo => "Page {0}/{1}",
            MessageKey::SongLine => "{0}. {1} - {2}{3}{4}",
            MessageKey::LinkLine => "{0}. {1} : {2}",
            MessageKey::InvalidPage => "Invalid page",
            MessageKey::InvalidIndex => "Invalid index",
            MessageKey::InvalidRange => "Invalid range",
            MessageKey::SongAdded => "Song added: {0}",
            MessageKey::SongDeleted => "Song deleted",
            MessageKey::SongCopied => "Song copied",
            MessageKey::NameEdited => "Name updated",
            MessageKey::ArtistEdited => "Artist updated",
            MessageKey::LinkEdited => "Link updated",
            MessageKey::LinkTaken => "Link {0} is already in the catalog",
            MessageKey::DurationEdited => "Duration set to {0}",
            MessageKey::DurationInvalid => "Invalid duration",
            MessageKey::InfoLine => "{0}. {1} - {2} [{3}] {4}",
            MessageKey::DebugHeader => "== state of {0} ==",
            MessageKey::DebugCurrentSong => "current: {0}",
            MessageKey::DebugPlayMode => "mode: {0}",
            MessageKey::DebugPaused => "paused: {0}",
            MessageKey::DebugTimerActive => "timer: alive={0} interval={1}s remaining={2}s",
            MessageKey::DebugTimerNone => "timer: none",
            MessageKey::DebugQueue => "queue ({0}):",
            MessageKey::DebugQueueLine => "  {0}. {1} ({2}){3}",
            MessageKey::TimerNotFound => "No timer for {0}",
            MessageKey::TimerReset => "Timer of {0} removed",
            MessageKey::TimerIntervalSet => "Timer of {0} rescheduled to {1}s",
            MessageKey::TimerIntervalInvalid => "Invalid timer interval",
            MessageKey::TimerAlreadyActive => "Timer of {0} is already active",
            MessageKey::TimerReactivated => "Timer of {0} reactivated ({1}s)",
            MessageKey::TimerAlreadyInactive => "Timer of {0} is already inactive",
            MessageKey::TimerDeactivated => "Timer of {0} deactivated ({1}s)",
            MessageKey::TimerValueInvalid => "Use true/false, 1/0 or on/off",
            MessageKey::SessionsReloaded => "Carried over {0} sessions",
            MessageKey::StorageFailed => "Could not save, nothing was changed",
        };
        text.to_string()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AutoAdvanceTemplates {
    auto_next: String,
    sequence_ended: String,
}

impl AutoAdvanceTemplates {
    pub fn render(localizer: &dyn Localizer) -> Self {
        Self {
            auto_next: localizer.template(MessageKey::AutoNext),
            sequence_ended: localizer.template(MessageKey::SequentialEnd),
        }
    }

    pub fn auto_next(&self, song_name: &str) -> String {
        fill_template(&self.auto_next, &[song_name.to_string()])
    }

    pub fn sequence_ended(&self) -> &str {
        &self.sequence_ended
    }
}

pub trait Notifier: Send + Sync {
    fn tell(&self, user: &str, text: &str);
}

#[derive(Debug, Default)]
pub struct SilentNotifier;

impl Notifier for SilentNotifier {
    fn tell(&self, _user: &str, _text: &str) {}
}

#[derive(Debug, Default)]
pub struct RecordingNotifier {
    told: Mutex<Vec<(String, String)>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn messages(&self) -> Vec<(String, String)> {
        self.told
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .clone()
    }
}

impl Notifier for RecordingNotifier {
    fn tell(&self, user: &str, text: &str) {
        self.told
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .push((user.to_string(), text.to_string()));
    }
}
