//! Per-category snapshot diffing
//!
//! A handler receives every fetch result for its category, compares it with
//! the stored snapshot, emits change events and stores the new snapshot.
//!
//! Shared rules for the default handlers:
//! - a non-`ok` result means "no change": nothing is stored or emitted
//! - the first successful fetch of a tag only seeds the snapshot
//! - a tag removed while its fetch was in flight is ignored

use std::collections::BTreeSet;
use std::sync::Arc;

use coc_api::FetchResult;
use serde_json::Value;
use tracing::trace;

use crate::events::{Emitter, Event};
use crate::watch_set::WatchSet;

/// Turns a fresh fetch result into events and an updated snapshot.
pub trait UpdateHandler: Send + Sync {
    fn handle(&self, emitter: &Emitter, watch_set: &WatchSet, tag: &str, fresh: FetchResult);
}

/// Handler set used by the three sweep loops.
#[derive(Clone)]
pub struct Handlers {
    pub clan: Arc<dyn UpdateHandler>,
    pub player: Arc<dyn UpdateHandler>,
    pub war: Arc<dyn UpdateHandler>,
}

impl Default for Handlers {
    fn default() -> Self {
        Self {
            clan: Arc::new(ClanHandler),
            player: Arc::new(PlayerHandler),
            war: Arc::new(WarHandler),
        }
    }
}

/// Store the body of an ok result, returning the previous snapshot only when
/// there is something to diff against.
fn swap_snapshot(watch_set: &WatchSet, tag: &str, fresh: &FetchResult) -> Option<Value> {
    if !fresh.ok {
        trace!(tag, status = fresh.status, "non-ok result, treating as no change");
        return None;
    }
    let previous = watch_set.replace_snapshot(tag, fresh.body.clone())?;
    (previous != fresh.body).then_some(previous)
}

fn member_tags(clan: &Value) -> BTreeSet<String> {
    clan["memberList"]
        .as_array()
        .map(|members| {
            members
                .iter()
                .filter_map(|m| m["tag"].as_str().map(str::to_owned))
                .collect()
        })
        .unwrap_or_default()
}

/// Emits member joins/leaves, then `ClanUpdated`.
#[derive(Debug, Default)]
pub struct ClanHandler;

impl UpdateHandler for ClanHandler {
    fn handle(&self, emitter: &Emitter, watch_set: &WatchSet, tag: &str, fresh: FetchResult) {
        let Some(previous) = swap_snapshot(watch_set, tag, &fresh) else {
            return;
        };

        let before = member_tags(&previous);
        let after = member_tags(&fresh.body);
        for member in after.difference(&before) {
            emitter.emit(Event::ClanMemberJoined {
                clan_tag: tag.to_string(),
                member_tag: member.clone(),
            });
        }
        for member in before.difference(&after) {
            emitter.emit(Event::ClanMemberLeft {
                clan_tag: tag.to_string(),
                member_tag: member.clone(),
            });
        }

        emitter.emit(Event::ClanUpdated {
            tag: tag.to_string(),
            previous,
            current: fresh.body,
        });
    }
}

#[derive(Debug, Default)]
pub struct PlayerHandler;

impl UpdateHandler for PlayerHandler {
    fn handle(&self, emitter: &Emitter, watch_set: &WatchSet, tag: &str, fresh: FetchResult) {
        if let Some(previous) = swap_snapshot(watch_set, tag, &fresh) {
            emitter.emit(Event::PlayerUpdated {
                tag: tag.to_string(),
                previous,
                current: fresh.body,
            });
        }
    }
}

/// Keyed by the clan tag whose current war is polled.
#[derive(Debug, Default)]
pub struct WarHandler;

impl UpdateHandler for WarHandler {
    fn handle(&self, emitter: &Emitter, watch_set: &WatchSet, tag: &str, fresh: FetchResult) {
        let Some(previous) = swap_snapshot(watch_set, tag, &fresh) else {
            return;
        };

        let previous_state = previous["state"].as_str().unwrap_or_default();
        let state = fresh.body["state"].as_str().unwrap_or_default();
        if previous_state != state {
            emitter.emit(Event::WarStateChanged {
                clan_tag: tag.to_string(),
                previous_state: previous_state.to_string(),
                state: state.to_string(),
            });
        }

        emitter.emit(Event::WarUpdated {
            clan_tag: tag.to_string(),
            previous,
            current: fresh.body,
        });
    }
}
