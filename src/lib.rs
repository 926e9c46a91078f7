pub mod catalog;
pub mod config;
pub mod console;
pub mod duration;
pub mod error;
pub mod message;
pub mod model;
pub mod player;
pub mod scheduler;
pub mod selection;
pub mod session;
pub mod store;
pub mod target;

pub use error::{PlayerError, Result};
pub use player::{Player, PlayerBuilder, SessionView};
