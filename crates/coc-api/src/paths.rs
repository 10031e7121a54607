//! Fixed API paths for each polled category

use crate::tag::encode_tag;

/// Production API root.
pub const DEFAULT_BASE_URL: &str = "https://api.clashofclans.com/v1";

pub fn clan_path(tag: &str) -> String {
    format!("/clans/{}", encode_tag(tag))
}

pub fn player_path(tag: &str) -> String {
    format!("/players/{}", encode_tag(tag))
}

pub fn current_war_path(tag: &str) -> String {
    format!("/clans/{}/currentwar", encode_tag(tag))
}

/// Lightweight clan search used to detect maintenance windows.
///
/// `min_members` only varies the query string so upstream caches never serve
/// a stale status.
pub fn maintenance_probe_path(min_members: u32) -> String {
    format!("/clans?limit=1&minMembers={min_members}")
}
