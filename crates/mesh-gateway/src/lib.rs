pub mod connection;
pub mod dispatcher;
pub mod hub;
pub mod persist;
pub mod plays;
pub mod registry;
pub mod tasks;
