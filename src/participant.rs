//! Participant and status wire types.
//!
//! DESIGN
//! ======
//! The backend owns these records; the dashboard only decodes and orders
//! them. Timestamps are kept as the raw strings the backend sent so that a
//! malformed value never fails decoding of the whole list. Parsing happens
//! lazily, and anything unparseable reads as "no timestamp".
//!
//! Legacy backends send bare display-name strings in `users.json` and use a
//! capitalised `Status` key. Both shapes are normalized here so the rest of
//! the crate only ever sees a canonical [`Participant`] and [`StatusSnapshot`].

use serde::{Deserialize, Serialize};
use time::format_description::well_known::Rfc3339;
use time::macros::format_description;
use time::{Date, OffsetDateTime};

const UNKNOWN_USER_LABEL: &str = "Unknown User";

// =============================================================================
// PARTICIPANT
// =============================================================================

/// One chat participant observed during a monitoring session.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Participant {
    #[serde(default)]
    pub channel_id: String,
    #[serde(default)]
    pub display_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub joined_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_commented_at: Option<String>,
    #[serde(default)]
    pub comment_count: u64,
}

impl Participant {
    /// Parsed first-comment instant, or `None` when absent, empty or invalid.
    #[must_use]
    pub fn first_comment_instant(&self) -> Option<OffsetDateTime> {
        self.first_commented_at.as_deref().and_then(parse_instant)
    }

    /// First-comment instant truncated to whole milliseconds.
    #[must_use]
    pub fn first_comment_millis(&self) -> Option<i128> {
        self.first_comment_instant()
            .map(|at| at.unix_timestamp_nanos() / 1_000_000)
    }

    /// Human-readable label: display name, then channel id, then a placeholder.
    #[must_use]
    pub fn label(&self) -> &str {
        if !self.display_name.is_empty() {
            &self.display_name
        } else if !self.channel_id.is_empty() {
            &self.channel_id
        } else {
            UNKNOWN_USER_LABEL
        }
    }
}

/// Parse an RFC 3339 date-time or a bare `YYYY-MM-DD` date (UTC midnight).
#[must_use]
pub fn parse_instant(raw: &str) -> Option<OffsetDateTime> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if let Ok(at) = OffsetDateTime::parse(raw, &Rfc3339) {
        return Some(at);
    }
    Date::parse(raw, format_description!("[year]-[month]-[day]"))
        .ok()
        .map(|date| date.midnight().assume_utc())
}

// =============================================================================
// USER ENTRY (WIRE)
// =============================================================================

/// One element of the `users.json` array as it appears on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum UserEntry {
    /// Legacy backends list bare display names.
    Label(String),
    Record(Participant),
}

impl UserEntry {
    #[must_use]
    pub fn into_participant(self) -> Participant {
        match self {
            Self::Label(name) => Participant { display_name: name, ..Participant::default() },
            Self::Record(participant) => participant,
        }
    }
}

impl From<Participant> for UserEntry {
    fn from(participant: Participant) -> Self {
        Self::Record(participant)
    }
}

/// Normalize a fetched `users.json` payload into canonical participants.
#[must_use]
pub fn normalize_users(entries: Vec<UserEntry>) -> Vec<Participant> {
    entries.into_iter().map(UserEntry::into_participant).collect()
}

// =============================================================================
// STATUS
// =============================================================================

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LiveStatus {
    Active,
    #[default]
    Waiting,
}

impl LiveStatus {
    /// Anything other than `ACTIVE` is treated as waiting.
    #[must_use]
    pub fn from_wire(raw: &str) -> Self {
        if raw == "ACTIVE" { Self::Active } else { Self::Waiting }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Active => "ACTIVE",
            Self::Waiting => "WAITING",
        }
    }
}

/// Raw `/status` body. Accepts the legacy `Status` key alongside `status`.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusResponse {
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default, rename = "Status")]
    pub legacy_status: Option<String>,
    #[serde(default)]
    pub count: Option<u64>,
    #[serde(default)]
    pub video_id: Option<String>,
    #[serde(default)]
    pub started_at: Option<String>,
    #[serde(default)]
    pub ended_at: Option<String>,
    #[serde(default)]
    pub last_pulled_at: Option<String>,
}

/// Normalized view of the backend's live-session status.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StatusSnapshot {
    pub status: LiveStatus,
    pub count: Option<u64>,
    pub video_id: Option<String>,
    pub started_at: Option<String>,
    pub ended_at: Option<String>,
    pub last_pulled_at: Option<String>,
}

impl StatusSnapshot {
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.status == LiveStatus::Active
    }
}

impl From<StatusResponse> for StatusSnapshot {
    fn from(raw: StatusResponse) -> Self {
        let status = raw
            .status
            .or(raw.legacy_status)
            .map(|s| LiveStatus::from_wire(&s))
            .unwrap_or_default();
        Self {
            status,
            count: raw.count,
            video_id: raw.video_id.filter(|id| !id.is_empty()),
            started_at: raw.started_at,
            ended_at: raw.ended_at,
            last_pulled_at: raw.last_pulled_at,
        }
    }
}

#[cfg(test)]
#[path = "participant_test.rs"]
mod tests;
