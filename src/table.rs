//! Plain-text rendering of the dashboard for the terminal.
//!
//! Column widths are measured in terminal cells: hiragana, katakana, CJK
//! ideographs and full-width forms take two cells, everything else one.

use std::cmp::Ordering;
use std::fmt::Write as _;

use time::UtcOffset;

use crate::clock::format_hm;
use crate::dashboard::DashboardView;
use crate::participant::Participant;

/// Cells given to the user label column.
pub const LABEL_WIDTH: usize = 20;
const NO_COMMENT: &str = "--:--";

// =============================================================================
// COLUMN SORT
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortField {
    CommentCount,
    FirstCommentedAt,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    Asc,
    Desc,
}

impl SortOrder {
    #[must_use]
    pub fn flipped(self) -> Self {
        match self {
            Self::Asc => Self::Desc,
            Self::Desc => Self::Asc,
        }
    }
}

/// Operator-chosen column ordering layered over the default order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnSort {
    pub field: SortField,
    pub order: SortOrder,
}

impl ColumnSort {
    /// Selecting the active column flips its order. A new column starts
    /// descending for comment count and ascending for first comment.
    #[must_use]
    pub fn toggle(current: Option<Self>, field: SortField) -> Self {
        match current {
            Some(sort) if sort.field == field => Self { field, order: sort.order.flipped() },
            _ => {
                let order = match field {
                    SortField::CommentCount => SortOrder::Desc,
                    SortField::FirstCommentedAt => SortOrder::Asc,
                };
                Self { field, order }
            }
        }
    }
}

/// Reorder `users` by `sort`; `None` keeps the incoming order. Stable.
#[must_use]
pub fn apply_column_sort(users: &[Participant], sort: Option<ColumnSort>) -> Vec<Participant> {
    let mut sorted = users.to_vec();
    let Some(sort) = sort else {
        return sorted;
    };

    match sort.field {
        SortField::CommentCount => sorted.sort_by(|a, b| {
            let ord = a.comment_count.cmp(&b.comment_count);
            directed(ord, sort.order)
        }),
        // Non-commenters stay last whichever way the column points.
        SortField::FirstCommentedAt => sorted.sort_by_cached_key(|user| match user.first_comment_millis() {
            Some(ms) if sort.order == SortOrder::Asc => (false, ms),
            Some(ms) => (false, -ms),
            None => (true, 0),
        }),
    }
    sorted
}

fn directed(ord: Ordering, order: SortOrder) -> Ordering {
    match order {
        SortOrder::Asc => ord,
        SortOrder::Desc => ord.reverse(),
    }
}

// =============================================================================
// TEXT WIDTH
// =============================================================================

fn char_width(c: char) -> usize {
    match c {
        '\u{3040}'..='\u{309F}' | '\u{30A0}'..='\u{30FF}' | '\u{4E00}'..='\u{9FAF}' | '\u{FF00}'..='\u{FFEF}' => 2,
        _ => 1,
    }
}

#[must_use]
pub fn display_width(text: &str) -> usize {
    text.chars().map(char_width).sum()
}

/// Shorten `text` to fit `max` cells, marking the cut with `...`.
#[must_use]
pub fn truncate_text(text: &str, max: usize) -> String {
    if display_width(text) <= max {
        return text.to_owned();
    }

    let budget = max.saturating_sub(3);
    let mut used = 0;
    let mut kept = String::new();
    for c in text.chars() {
        let w = char_width(c);
        if used + w > budget {
            break;
        }
        kept.push(c);
        used += w;
    }
    kept.push_str("...");
    kept
}

fn pad_to(text: &str, width: usize) -> String {
    let fill = width.saturating_sub(display_width(text));
    format!("{text}{}", " ".repeat(fill))
}

// =============================================================================
// RENDERING
// =============================================================================

/// Header lines: status, counts, timestamps and messages.
#[must_use]
pub fn render_header(view: &DashboardView) -> String {
    let mut out = String::new();
    let status = if view.active { "ACTIVE" } else { "WAITING" };
    let video = if view.video_id.is_empty() { "-" } else { view.video_id.as_str() };
    let _ = writeln!(out, "[{status}]  participants: {}  video: {video}", view.users.len());

    let interval = match view.interval_secs {
        0 => "off".to_owned(),
        secs => format!("{secs}s"),
    };
    let _ = write!(out, "updated {}  auto-refresh {interval}", view.last_updated);
    if let Some(pulled) = &view.last_fetch_time {
        let _ = write!(out, "  {pulled}");
    }
    if view.loading.any() {
        out.push_str("  (working...)");
    }
    out.push('\n');

    if let Some(error) = &view.error_message {
        let _ = writeln!(out, "! {error}");
    }
    if let Some(info) = &view.info_message {
        let _ = writeln!(out, "* {info}");
    }
    out
}

/// One row per participant under a column header.
#[must_use]
pub fn render_table(users: &[Participant], sort: Option<ColumnSort>, offset: UtcOffset) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{:>2}  {}  {:>8}  {}", "#", pad_to("User", LABEL_WIDTH), "Comments", "First");

    if users.is_empty() {
        out.push_str("(no participants yet)\n");
        return out;
    }

    for (i, user) in apply_column_sort(users, sort).iter().enumerate() {
        let label = pad_to(&truncate_text(user.label(), LABEL_WIDTH), LABEL_WIDTH);
        let first = user
            .first_comment_instant()
            .map_or_else(|| NO_COMMENT.to_owned(), |at| format_hm(at, offset));
        let _ = writeln!(out, "{:02}  {label}  {:>8}  {first}", i + 1, user.comment_count);
    }
    out
}

#[cfg(test)]
#[path = "table_test.rs"]
mod tests;
