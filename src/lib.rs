/// Kudos admin service
///
/// Scope-based admin authorization for an organizational kudos feed: the
/// authorization evaluator, the feed visibility filter, scope resolution
/// and the moderation actions built on them.

pub mod admin;
pub mod api;
pub mod auth;
pub mod config;
pub mod context;
pub mod db;
pub mod error;
pub mod kudos;
pub mod media;
pub mod server;

pub use context::AppContext;
pub use error::{KudosError, KudosResult};
