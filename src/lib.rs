pub mod config;
pub mod error;
pub mod fetch;
pub mod history;
pub mod items;
pub mod market;
pub mod paging;
pub mod reporter;
pub mod resolver;
pub mod rows;
pub mod sidecar;
pub mod types;

#[cfg(test)]
mod fixtures;

/// Steam Community base URL. History pages, market endpoints and profile
/// lookups all live under it.
pub const COMMUNITY_BASE: &str = "https://steamcommunity.com";
