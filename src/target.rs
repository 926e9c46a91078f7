use std::fmt;
use std::sync::{Mutex, PoisonError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    Play,
    Pause,
    Stop,
}

impl Action {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Play => "play",
            Self::Pause => "pause",
            Self::Stop => "stop",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

pub trait PlaybackTarget: Send + Sync {
    fn signal(&self, user: &str, link: &str, action: Action);
}

pub fn function_command(user: &str, link: &str, action: Action) -> String {
    format!("execute as {user} run function {link}:{action}")
}

pub struct CommandTarget<F> {
    sink: F,
}

impl<F> CommandTarget<F>
where
    F: Fn(&str) + Send + Sync,
{
    pub fn new(sink: F) -> Self {
        Self { sink }
    }
}

impl<F> PlaybackTarget for CommandTarget<F>
where
    F: Fn(&str) + Send + Sync,
{
    fn signal(&self, user: &str, link: &str, action: Action) {
        (self.sink)(&function_command(user, link, action));
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct NullTarget;

impl PlaybackTarget for NullTarget {
    fn signal(&self, _user: &str, _link: &str, _action: Action) {}
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Signal {
    pub user: String,
    pub link: String,
    pub action: Action,
}

impl Signal {
    pub fn new(user: &str, link: &str, action: Action) -> Self {
        Self {
            user: user.to_string(),
            link: link.to_string(),
            action,
        }
    }
}

#[derive(Debug, Default)]
pub struct RecordingTarget {
    signals: Mutex<Vec<Signal>>,
}

impl RecordingTarget {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn signals(&self) -> Vec<Signal> {
        self.signals
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn signals_for(&self, user: &str) -> Vec<Signal> {
        self.signals()
            .into_iter()
            .filter(|signal| signal.user == user)
            .collect()
    }

    pub fn last(&self) -> Option<Signal> {
        self.signals
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .last()
            .cloned()
    }

    pub fn clear(&self) {
        self.signals
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }
}

impl PlaybackTarget for RecordingTarget {
    fn signal(&self, user: &str, link: &str, action: Action) {
        self.signals
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(Signal::new(user, link, action));
    }
}
