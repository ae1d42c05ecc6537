//! Link shortener clients.

mod bitly;

pub use bitly::{BitlyConfig, BitlyShortener};
