//! Stable participant ordering for the user table.
//!
//! DESIGN
//! ======
//! Order: first-comment time ascending, then channel id, then display name
//! (both compared case-insensitively). Participants without a usable
//! first-comment time are grouped at the tail. Arrival order is not part of
//! the key because re-fetched snapshots do not preserve it; channel id is the
//! only field guaranteed unique and stable, so it anchors the order when
//! timestamps tie or are missing.
//!
//! An empty channel id is an ordinary value: it differs from any non-empty
//! id and sorts before it, so the display name is never consulted for that
//! pair. The browser dashboard instead skipped the channel comparison when
//! either id was empty and ordered by display name. This matters for legacy
//! label entries, which always arrive without a channel id.
//!
//! Keys are computed once per element and the sort is stable, so genuinely
//! equal records keep their input order on every call.

use crate::participant::Participant;

/// Precomputed ordering key. Field order matches comparison priority.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
struct SortKey {
    /// `false` sorts first, so commenters precede non-commenters.
    missing_first_comment: bool,
    first_comment_millis: i128,
    channel_id: String,
    display_name: String,
}

impl SortKey {
    fn of(participant: &Participant) -> Self {
        let first = participant.first_comment_millis();
        Self {
            missing_first_comment: first.is_none(),
            first_comment_millis: first.unwrap_or_default(),
            channel_id: participant.channel_id.to_lowercase(),
            display_name: participant.display_name.to_lowercase(),
        }
    }
}

/// Return a new, deterministically ordered copy of `input`.
#[must_use]
pub fn sort_users_stable(input: &[Participant]) -> Vec<Participant> {
    let mut users = input.to_vec();
    users.sort_by_cached_key(SortKey::of);
    users
}

#[cfg(test)]
#[path = "sort_test.rs"]
mod tests;
