pub mod config;
pub mod dispatcher;
pub mod error;
pub mod item;
pub mod mail;
pub mod normalizer;
pub mod premium;
pub mod profile;
pub mod registry;
pub mod resolver;
pub mod scheduler;
pub mod types;
