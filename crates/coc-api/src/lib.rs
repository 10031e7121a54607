//! Clash of Clans REST API boundary
//!
//! Everything the polling engine needs from the outside world, kept behind
//! small, inspectable contracts:
//! - `Fetcher` / `HttpFetcher`: the single GET primitive. It never returns an
//!   error; failures collapse into a `FetchResult` with `ok = false`.
//! - `tag`: normalization and validation of player/clan tags.
//! - `paths`: the fixed category paths polled by the engine.

pub mod fetch;
pub mod paths;
pub mod tag;

pub use fetch::{FetchResult, Fetcher, HttpFetcher, parse_max_age};
pub use paths::{
    DEFAULT_BASE_URL, clan_path, current_war_path, maintenance_probe_path, player_path,
};
pub use tag::{encode_tag, normalize_tag};
