use super::*;
use chrono::{TimeZone, Utc};

fn msg(id: &str, minute: u32) -> Message {
    Message {
        id: id.to_string(),
        sender_user_id: Some("user_1".into()),
        kind: MessageKind::User,
        content: format!("message {}", id),
        attachments: vec![],
        created_at: Utc.with_ymd_and_hms(2026, 6, 1, 12, minute, 0).unwrap(),
    }
}

fn ids(timeline: &MessageTimeline) -> Vec<&str> {
    timeline.ids().collect()
}

#[test]
fn test_from_page_reverses_server_order() {
    let timeline = MessageTimeline::from_page(vec![msg("m2", 2), msg("m1", 1)]);
    assert_eq!(ids(&timeline), ["m1", "m2"]);
    assert_eq!(timeline.first().unwrap().id, "m1");
    assert_eq!(timeline.last().unwrap().id, "m2");
}

#[test]
fn test_append_page_skips_held_ids() {
    let mut timeline = MessageTimeline::from_page(vec![msg("m2", 2), msg("m1", 1)]);
    let added = timeline.append_page(vec![msg("m3", 3), msg("m2", 2)]);
    assert_eq!(added, ["m3"]);
    assert_eq!(ids(&timeline), ["m1", "m2", "m3"]);
}

#[test]
fn test_append_same_page_twice_is_idempotent() {
    let mut timeline = MessageTimeline::from_page(vec![msg("m1", 1)]);
    let page = vec![msg("m3", 3), msg("m2", 2)];
    timeline.append_page(page.clone());
    let before: Vec<String> = timeline.ids().map(str::to_string).collect();

    let added = timeline.append_page(page);
    assert!(added.is_empty());
    let after: Vec<String> = timeline.ids().map(str::to_string).collect();
    assert_eq!(before, after);
}

#[test]
fn test_dedup_checks_whole_list_not_just_tail() {
    let mut timeline =
        MessageTimeline::from_page(vec![msg("m4", 4), msg("m3", 3), msg("m2", 2), msg("m1", 1)]);
    // m1 is at the head; a late overlapping window must still be filtered
    let added = timeline.append_page(vec![msg("m5", 5), msg("m1", 1)]);
    assert_eq!(added, ["m5"]);
    assert_eq!(ids(&timeline), ["m1", "m2", "m3", "m4", "m5"]);
}

#[test]
fn test_prepend_page_inserts_older_messages_first() {
    let mut timeline = MessageTimeline::from_page(vec![msg("m4", 4), msg("m3", 3)]);
    let inserted = timeline.prepend_page(vec![msg("m2", 2), msg("m1", 1)]);
    assert_eq!(inserted, 2);
    assert_eq!(ids(&timeline), ["m1", "m2", "m3", "m4"]);
}

#[test]
fn test_prepend_page_drops_duplicates() {
    let mut timeline = MessageTimeline::from_page(vec![msg("m3", 3), msg("m2", 2)]);
    let inserted = timeline.prepend_page(vec![msg("m2", 2), msg("m1", 1)]);
    assert_eq!(inserted, 1);
    assert_eq!(ids(&timeline), ["m1", "m2", "m3"]);
}

#[test]
fn test_prepend_empty_page_is_noop() {
    let mut timeline = MessageTimeline::from_page(vec![msg("m1", 1)]);
    assert_eq!(timeline.prepend_page(vec![]), 0);
    assert_eq!(ids(&timeline), ["m1"]);
}

#[test]
fn test_push_rejects_duplicate() {
    let mut timeline = MessageTimeline::new();
    assert!(timeline.push(msg("m1", 1)));
    assert!(!timeline.push(msg("m1", 1)));
    assert_eq!(timeline.len(), 1);
    assert!(timeline.contains("m1"));
}

#[test]
fn test_replace_discards_previous_state() {
    let mut timeline = MessageTimeline::from_page(vec![msg("m2", 2), msg("m1", 1)]);
    timeline.replace(vec![msg("m9", 9)]);
    assert_eq!(ids(&timeline), ["m9"]);
    assert!(!timeline.contains("m1"));
    // A previously held id can come back after a replace
    assert!(timeline.push(msg("m1", 1)));
}

#[test]
fn test_of_kind_filters() {
    let mut timeline = MessageTimeline::new();
    timeline.push(msg("m1", 1));
    let mut ai = msg("m2", 2);
    ai.kind = MessageKind::AiSuggestion;
    ai.sender_user_id = None;
    timeline.push(ai);

    let suggestions: Vec<&str> = timeline
        .of_kind(MessageKind::AiSuggestion)
        .map(|m| m.id.as_str())
        .collect();
    assert_eq!(suggestions, ["m2"]);
    assert!(timeline.of_kind(MessageKind::Admin).next().is_none());
}
