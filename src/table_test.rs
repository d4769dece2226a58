use super::*;
use crate::dashboard::Loading;
use time::macros::offset;

fn user(channel_id: &str, name: &str, first: Option<&str>, comments: u64) -> Participant {
    Participant {
        channel_id: channel_id.into(),
        display_name: name.into(),
        joined_at: None,
        first_commented_at: first.map(Into::into),
        comment_count: comments,
    }
}

fn ids(users: &[Participant]) -> Vec<&str> {
    users.iter().map(|u| u.channel_id.as_str()).collect()
}

fn roster() -> Vec<Participant> {
    vec![
        user("UC1", "A", Some("2024-01-01T00:00:02Z"), 1),
        user("UC2", "B", None, 0),
        user("UC3", "C", Some("2024-01-01T00:00:01Z"), 5),
        user("UC4", "D", Some("2024-01-01T00:00:03Z"), 1),
    ]
}

fn view() -> DashboardView {
    DashboardView {
        active: true,
        users: roster(),
        video_id: "abc".into(),
        interval_secs: 30,
        last_updated: "09:01:00".into(),
        last_fetch_time: None,
        error_message: None,
        info_message: None,
        loading: Loading::default(),
    }
}

// =============================================================================
// toggle
// =============================================================================

#[test]
fn toggle_new_field_picks_natural_direction() {
    let comments = ColumnSort::toggle(None, SortField::CommentCount);
    assert_eq!(comments.order, SortOrder::Desc);

    let first = ColumnSort::toggle(Some(comments), SortField::FirstCommentedAt);
    assert_eq!(first, ColumnSort { field: SortField::FirstCommentedAt, order: SortOrder::Asc });
}

#[test]
fn toggle_same_field_flips_order() {
    let once = ColumnSort::toggle(None, SortField::CommentCount);
    let twice = ColumnSort::toggle(Some(once), SortField::CommentCount);
    assert_eq!(twice.order, SortOrder::Asc);
    let thrice = ColumnSort::toggle(Some(twice), SortField::CommentCount);
    assert_eq!(thrice.order, SortOrder::Desc);
}

// =============================================================================
// apply_column_sort
// =============================================================================

#[test]
fn no_column_sort_keeps_order() {
    assert_eq!(ids(&apply_column_sort(&roster(), None)), ["UC1", "UC2", "UC3", "UC4"]);
}

#[test]
fn comment_count_sort_is_stable_for_ties() {
    let desc = ColumnSort { field: SortField::CommentCount, order: SortOrder::Desc };
    assert_eq!(ids(&apply_column_sort(&roster(), Some(desc))), ["UC3", "UC1", "UC4", "UC2"]);

    let asc = ColumnSort { field: SortField::CommentCount, order: SortOrder::Asc };
    assert_eq!(ids(&apply_column_sort(&roster(), Some(asc))), ["UC2", "UC1", "UC4", "UC3"]);
}

#[test]
fn first_comment_sort_keeps_non_commenters_last() {
    let asc = ColumnSort { field: SortField::FirstCommentedAt, order: SortOrder::Asc };
    assert_eq!(ids(&apply_column_sort(&roster(), Some(asc))), ["UC3", "UC1", "UC4", "UC2"]);

    let desc = ColumnSort { field: SortField::FirstCommentedAt, order: SortOrder::Desc };
    assert_eq!(ids(&apply_column_sort(&roster(), Some(desc))), ["UC4", "UC1", "UC3", "UC2"]);
}

// =============================================================================
// width and truncation
// =============================================================================

#[test]
fn display_width_counts_wide_characters_twice() {
    assert_eq!(display_width("abc"), 3);
    assert_eq!(display_width("あア漢"), 6);
    assert_eq!(display_width("Ａb"), 3);
    assert_eq!(display_width(""), 0);
}

#[test]
fn truncate_leaves_fitting_text_alone() {
    assert_eq!(truncate_text("short", 20), "short");
    assert_eq!(truncate_text("あいうえおかきくけこ", 20), "あいうえおかきくけこ");
}

#[test]
fn truncate_cuts_to_fit_with_ellipsis() {
    assert_eq!(truncate_text("abcdefghijklmnopqrstuvwxyz", 20), "abcdefghijklmnopq...");
    assert_eq!(truncate_text("あいうえおかきくけこさ", 20), "あいうえおかきく...");
}

#[test]
fn truncate_never_splits_a_wide_character() {
    // 17-cell budget: "a" plus eight wide characters.
    let out = truncate_text("aあいうえおかきくけこ", 20);
    assert_eq!(out, "aあいうえおかきく...");
    assert!(display_width(&out) <= 20);
}

// =============================================================================
// rendering
// =============================================================================

#[test]
fn table_rows_show_index_label_count_and_local_time() {
    let users = vec![
        user("UC1", "Alice", Some("2024-01-01T00:00:05Z"), 2),
        user("UC2", "", None, 0),
    ];
    let text = render_table(&users, None, offset!(+9));
    let lines: Vec<_> = text.lines().collect();

    assert_eq!(lines.len(), 3);
    assert!(lines[0].contains("Comments"));
    assert!(lines[1].starts_with("01  Alice "));
    assert!(lines[1].ends_with("       2  09:00"));
    assert!(lines[2].starts_with("02  UC2 "));
    assert!(lines[2].ends_with("--:--"));
}

#[test]
fn empty_table_says_so() {
    let text = render_table(&[], None, UtcOffset::UTC);
    assert!(text.contains("no participants"));
}

#[test]
fn header_shows_status_and_messages() {
    let mut view = view();
    view.error_message = Some("Pull failed.".into());
    view.last_fetch_time = Some("Last pull: 09:00:59".into());

    let text = render_header(&view);
    assert!(text.contains("[ACTIVE]"));
    assert!(text.contains("participants: 4"));
    assert!(text.contains("updated 09:01:00"));
    assert!(text.contains("auto-refresh 30s"));
    assert!(text.contains("Last pull: 09:00:59"));
    assert!(text.contains("! Pull failed."));
}

#[test]
fn header_marks_disabled_polling_and_work_in_progress() {
    let mut view = view();
    view.active = false;
    view.interval_secs = 0;
    view.loading.pulling = true;

    let text = render_header(&view);
    assert!(text.contains("[WAITING]"));
    assert!(text.contains("auto-refresh off"));
    assert!(text.contains("(working...)"));
}
