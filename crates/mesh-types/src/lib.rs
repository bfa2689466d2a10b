pub mod events;
pub mod models;
