pub mod category;
pub mod error;
pub mod playlist;
pub mod plays;
pub mod policy;
pub mod store;

pub use error::FeedError;
pub use store::{FeedConfig, FeedStore};
