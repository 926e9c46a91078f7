use crate::message::{Message, MessageKey};
use crate::model::Direction;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, PlayerError>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotFound {
    Queue,
    EmptyQueue,
    CurrentSong,
    Song,
    Songs,
    InQueue,
    Timer(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InvalidInput {
    Mode(String),
    Page(usize),
    Index(usize),
    LinkTaken(String),
    Range(String),
    Duration(String),
    TimerInterval(String),
    TimerFlag(String),
}

#[derive(Debug, Error)]
pub enum PlayerError {
    #[error("not found: {0:?}")]
    NotFound(NotFound),

    #[error("invalid input: {0:?}")]
    InvalidInput(InvalidInput),

    #[error("queue has a single song, cannot go {}", .0.label())]
    CannotAdvance(Direction),

    #[error("storage error: {0:#}")]
    Storage(#[from] anyhow::Error),
}

impl PlayerError {
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Storage(_))
    }

    pub fn message(&self) -> Message {
        match self {
            Self::NotFound(what) => match what {
                NotFound::Queue | NotFound::EmptyQueue => Message::new(MessageKey::QueueEmpty),
                NotFound::CurrentSong => Message::new(MessageKey::NoCurrentSong),
                NotFound::Song => Message::new(MessageKey::NoMatch),
                NotFound::Songs => Message::new(MessageKey::NoSongs),
                NotFound::InQueue => Message::new(MessageKey::NotInQueue),
                NotFound::Timer(user) => Message::with(MessageKey::TimerNotFound, [user.clone()]),
            },
            Self::InvalidInput(what) => match what {
                InvalidInput::Mode(_) => Message::new(MessageKey::InvalidMode),
                InvalidInput::Page(_) => Message::new(MessageKey::InvalidPage),
                InvalidInput::Index(_) => Message::new(MessageKey::InvalidIndex),
                InvalidInput::LinkTaken(link) => Message::with(MessageKey::LinkTaken, [link.clone()]),
                InvalidInput::Range(_) => Message::new(MessageKey::InvalidRange),
                InvalidInput::Duration(_) => Message::new(MessageKey::DurationInvalid),
                InvalidInput::TimerInterval(_) => Message::new(MessageKey::TimerIntervalInvalid),
                InvalidInput::TimerFlag(_) => Message::new(MessageKey::TimerValueInvalid),
            },
            Self::CannotAdvance(direction) => match direction {
                Direction::Forward => Message::new(MessageKey::QueueOneSongNoNext),
                Direction::Backward => Message::new(MessageKey::QueueOneSongNoPrev),
            },
            Self::Storage(_) => Message::new(MessageKey::StorageFailed),
        }
    }
}

impl From<NotFound> for PlayerError {
    fn from(value: NotFound) -> Self {
        Self::NotFound(value)
    }
}

impl From<InvalidInput> for PlayerError {
    fn from(value: InvalidInput) -> Self {
        Self::InvalidInput(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_and_empty_queue_share_reply_but_stay_distinct() {
        let missing = PlayerError::from(NotFound::Queue);
        let empty = PlayerError::from(NotFound::EmptyQueue);
        assert_eq!(missing.message(), empty.message());
        assert!(matches!(missing, PlayerError::NotFound(NotFound::Queue)));
        assert!(matches!(empty, PlayerError::NotFound(NotFound::EmptyQueue)));
    }

    #[test]
    fn only_storage_errors_are_fatal() {
        assert!(PlayerError::Storage(anyhow::anyhow!("disk full")).is_fatal());
        assert!(!PlayerError::CannotAdvance(Direction::Forward).is_fatal());
        assert!(!PlayerError::from(InvalidInput::Mode(String::from("x"))).is_fatal());
    }
}
