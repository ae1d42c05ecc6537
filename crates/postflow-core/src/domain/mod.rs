//! Domain entities - the core business objects.

mod post;
mod tweet;

pub use post::Post;
pub use tweet::SendTweet;
