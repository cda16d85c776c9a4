pub mod api;
pub mod marker;
pub mod mentions;
pub mod models;

pub use mentions::{Mentions, parse_mentions};
pub use models::{Message, Presence};
