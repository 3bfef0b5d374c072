//! Database tests

use super::*;
use crate::models::*;
use chrono::NaiveDate;
use rusqlite::params;

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn entry(title: &str, content: &str, day: NaiveDate) -> NewDiary {
    NewDiary {
        title: title.to_string(),
        content: content.to_string(),
        date: day,
        shared: false,
    }
}

fn setup() -> (Database, User) {
    let db = Database::in_memory().unwrap();
    let user = db.create_user("writer@example.com", "writer").unwrap();
    (db, user)
}

/// Tag a diary under its current run token
fn tag_diary(db: &Database, diary_id: i64, names: &[&str]) {
    let token = db.get_status(diary_id).unwrap().unwrap().run_token;
    let ids: Vec<i64> = names
        .iter()
        .map(|n| db.find_or_create_tag(n, None).unwrap())
        .collect();
    assert!(db.link_tags_for_run(diary_id, token, &ids).unwrap());
}

#[test]
fn test_schema_tables_exist() {
    let db = Database::in_memory().unwrap();
    let conn = db.conn().unwrap();

    let count: i64 = conn
        .query_row(
            "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table'
             AND name IN ('users', 'diaries', 'diary_status', 'tags', 'diary_tags')",
            [],
            |row| row.get(0),
        )
        .unwrap();
    assert_eq!(count, 5);

    let fk: i64 = conn
        .query_row("PRAGMA foreign_keys", [], |row| row.get(0))
        .unwrap();
    assert_eq!(fk, 1, "foreign keys must be enabled on pooled connections");
}

#[test]
fn test_user_email_is_unique() {
    let (db, user) = setup();
    assert!(db.create_user("writer@example.com", "again").is_err());
    assert_eq!(
        db.get_user_by_email("writer@example.com").unwrap().unwrap().id,
        user.id
    );
    assert_eq!(db.list_users().unwrap().len(), 1);
}

#[test]
fn test_new_diary_is_queued_with_unset_fields() {
    let (db, user) = setup();
    let (diary, status) = db
        .create_diary(user.id, &entry("산책", "공원을 걸었다", date(2024, 5, 1)))
        .unwrap();

    assert_eq!(status.status, ProcessingStatus::Queued);
    assert_eq!(status.run_token, 1);
    assert!(diary.emotion.is_none());
    assert!(diary.image_url.is_none());
    assert!(diary.comment.is_none());

    let stored = db.get_status(diary.id).unwrap().unwrap();
    assert_eq!(stored.status, ProcessingStatus::Queued);
}

#[test]
fn test_create_diary_rejects_empty_content() {
    let (db, user) = setup();
    let err = db
        .create_diary(user.id, &entry("제목", "   ", date(2024, 5, 1)))
        .unwrap_err();
    assert!(matches!(err, crate::Error::InvalidData(_)));
    assert!(db.list_diaries(user.id).unwrap().is_empty());
}

#[test]
fn test_diaries_are_scoped_to_owner() {
    let (db, user) = setup();
    let other = db.create_user("other@example.com", "other").unwrap();
    let (diary, _) = db
        .create_diary(user.id, &entry("a", "b", date(2024, 5, 1)))
        .unwrap();

    assert!(db.get_owned_diary(diary.id, other.id).unwrap().is_none());
    assert!(db
        .update_diary(diary.id, other.id, &entry("x", "y", date(2024, 5, 2)))
        .unwrap()
        .is_none());
    assert!(!db.delete_diary(diary.id, other.id).unwrap());
    assert!(!db.set_diary_comment(diary.id, other.id, "hi").unwrap());
    assert!(db.get_owned_diary(diary.id, user.id).unwrap().is_some());
}

#[test]
fn test_list_diaries_newest_date_first() {
    let (db, user) = setup();
    db.create_diary(user.id, &entry("old", "c", date(2024, 1, 1)))
        .unwrap();
    db.create_diary(user.id, &entry("new", "c", date(2024, 3, 1)))
        .unwrap();

    let titles: Vec<String> = db
        .list_diaries(user.id)
        .unwrap()
        .into_iter()
        .map(|d| d.title)
        .collect();
    assert_eq!(titles, vec!["new", "old"]);
}

#[test]
fn test_analysis_result_sets_fields_only_on_completed() {
    let (db, user) = setup();
    let (diary, status) = db
        .create_diary(user.id, &entry("a", "b", date(2024, 5, 1)))
        .unwrap();
    let token = status.run_token;

    assert!(db.mark_analyzing(diary.id, token).unwrap());
    assert!(db
        .record_analysis(
            diary.id,
            token,
            ProcessingStatus::Generating,
            Some("기쁨"),
            Some("http://img/1.png")
        )
        .unwrap());
    let stored = db.get_diary(diary.id).unwrap().unwrap();
    assert!(stored.emotion.is_none());
    assert_eq!(
        db.get_status(diary.id).unwrap().unwrap().status,
        ProcessingStatus::Generating
    );

    assert!(db
        .record_analysis(
            diary.id,
            token,
            ProcessingStatus::Completed,
            Some("기쁨"),
            Some("http://img/1.png")
        )
        .unwrap());
    let stored = db.get_diary(diary.id).unwrap().unwrap();
    assert_eq!(stored.emotion.as_deref(), Some("기쁨"));
    assert_eq!(stored.image_url.as_deref(), Some("http://img/1.png"));
}

#[test]
fn test_failed_run_leaves_fields_unset() {
    let (db, user) = setup();
    let (diary, status) = db
        .create_diary(user.id, &entry("a", "b", date(2024, 5, 1)))
        .unwrap();

    assert!(db.mark_analyzing(diary.id, status.run_token).unwrap());
    assert!(db.fail_run(diary.id, status.run_token).unwrap());

    let record = db.get_status(diary.id).unwrap().unwrap();
    assert_eq!(record.status, ProcessingStatus::Failed);
    let stored = db.get_diary(diary.id).unwrap().unwrap();
    assert!(stored.emotion.is_none());
    assert!(stored.image_url.is_none());

    // An older token never reclaims the diary
    assert!(!db.mark_analyzing(diary.id, status.run_token - 1).unwrap());
}

#[test]
fn test_queued_run_survives_reconciliation() {
    let (db, user) = setup();
    let (diary, status) = db
        .create_diary(user.id, &entry("a", "b", date(2024, 5, 1)))
        .unwrap();
    assert!(db
        .record_analysis(
            diary.id,
            status.run_token,
            ProcessingStatus::Completed,
            Some("기쁨"),
            None
        )
        .unwrap());

    let edited = db.requeue_diary(diary.id).unwrap().unwrap();
    db.reconcile_status(diary.id, ProcessingStatus::Completed, Some("기쁨"), None)
        .unwrap();

    assert!(db.mark_analyzing(diary.id, edited.run_token).unwrap());
    assert_eq!(
        db.get_status(diary.id).unwrap().unwrap().status,
        ProcessingStatus::Analyzing
    );
}

#[test]
fn test_edit_resets_status_and_clears_tags() {
    let (db, user) = setup();
    let (diary, status) = db
        .create_diary(user.id, &entry("a", "등산을 갔다", date(2024, 5, 1)))
        .unwrap();
    tag_diary(&db, diary.id, &["등산"]);
    assert!(db
        .complete_tag_run(diary.id, status.run_token, "중립적")
        .unwrap());
    assert_eq!(
        db.get_status(diary.id).unwrap().unwrap().status,
        ProcessingStatus::Completed
    );

    let (edited, new_status) = db
        .update_diary(diary.id, user.id, &entry("b", "집에 있었다", date(2024, 5, 1)))
        .unwrap()
        .unwrap();
    assert_eq!(edited.title, "b");
    assert_eq!(new_status.status, ProcessingStatus::Queued);
    assert_eq!(new_status.run_token, status.run_token + 1);
    assert!(db.get_diary_tags(diary.id).unwrap().is_empty());
    // The tag itself survives; only the link is removed
    assert!(db.get_tag_by_name("등산").unwrap().is_some());
}

#[test]
fn test_requeue_starts_a_new_run() {
    let (db, user) = setup();
    let (diary, status) = db
        .create_diary(user.id, &entry("a", "등산을 갔다", date(2024, 5, 1)))
        .unwrap();
    tag_diary(&db, diary.id, &["등산"]);
    assert!(db.fail_run(diary.id, status.run_token).unwrap());

    let requeued = db.requeue_diary(diary.id).unwrap().unwrap();
    assert_eq!(requeued.status, ProcessingStatus::Queued);
    assert_eq!(requeued.run_token, status.run_token + 1);
    assert!(db.get_diary_tags(diary.id).unwrap().is_empty());
    assert_eq!(db.get_diary(diary.id).unwrap().unwrap().title, "a");

    assert!(db.requeue_diary(diary.id + 1).unwrap().is_none());
}

#[test]
fn test_stale_run_writes_are_discarded() {
    let (db, user) = setup();
    let (diary, first) = db
        .create_diary(user.id, &entry("a", "b", date(2024, 5, 1)))
        .unwrap();
    assert!(db.mark_analyzing(diary.id, first.run_token).unwrap());

    // Edit while the first run is in flight
    db.update_diary(diary.id, user.id, &entry("a", "c", date(2024, 5, 1)))
        .unwrap()
        .unwrap();

    let tag = db.find_or_create_tag("등산", None).unwrap();
    assert!(!db
        .link_tags_for_run(diary.id, first.run_token, &[tag])
        .unwrap());
    assert!(!db
        .record_analysis(
            diary.id,
            first.run_token,
            ProcessingStatus::Completed,
            Some("슬픔"),
            None
        )
        .unwrap());
    assert!(!db.complete_tag_run(diary.id, first.run_token, "부정적").unwrap());
    assert!(!db.fail_run(diary.id, first.run_token).unwrap());

    let record = db.get_status(diary.id).unwrap().unwrap();
    assert_eq!(record.status, ProcessingStatus::Queued);
    assert!(db.get_diary(diary.id).unwrap().unwrap().emotion.is_none());
    assert!(db.get_diary_tags(diary.id).unwrap().is_empty());
}

#[test]
fn test_delete_cascades_status_and_links() {
    let (db, user) = setup();
    let (diary, _) = db
        .create_diary(user.id, &entry("a", "b", date(2024, 5, 1)))
        .unwrap();
    tag_diary(&db, diary.id, &["등산"]);

    assert!(db.delete_diary(diary.id, user.id).unwrap());
    assert!(db.get_status(diary.id).unwrap().is_none());

    let conn = db.conn().unwrap();
    let links: i64 = conn
        .query_row(
            "SELECT COUNT(*) FROM diary_tags WHERE diary_id = ?",
            params![diary.id],
            |row| row.get(0),
        )
        .unwrap();
    assert_eq!(links, 0);
}

#[test]
fn test_tag_find_or_create_is_idempotent_across_diaries() {
    let (db, user) = setup();
    let (first, _) = db
        .create_diary(user.id, &entry("a", "등산", date(2024, 5, 1)))
        .unwrap();
    let (second, _) = db
        .create_diary(user.id, &entry("b", "또 등산", date(2024, 5, 2)))
        .unwrap();

    let id1 = db
        .find_or_create_tag("등산", Some(TagCategory::Hobby))
        .unwrap();
    let id2 = db
        .find_or_create_tag("등산", Some(TagCategory::Hobby))
        .unwrap();
    assert_eq!(id1, id2);

    assert!(db.link_tags_for_run(first.id, 1, &[id1]).unwrap());
    assert!(db.link_tags_for_run(second.id, 1, &[id2]).unwrap());
    // Linking twice is harmless
    assert!(db.link_tags_for_run(second.id, 1, &[id2]).unwrap());

    let conn = db.conn().unwrap();
    let rows: i64 = conn
        .query_row(
            "SELECT COUNT(*) FROM tags WHERE name = '등산'",
            [],
            |row| row.get(0),
        )
        .unwrap();
    assert_eq!(rows, 1);

    let tags = db.get_diary_tags(second.id).unwrap();
    assert_eq!(tags.len(), 1);
    assert_eq!(tags[0].category, Some(TagCategory::Hobby));
    assert_eq!(db.get_diary_tags(first.id).unwrap()[0].id, tags[0].id);
}

#[test]
fn test_find_similar_diaries_owner_and_threshold() {
    let (db, owner) = setup();
    let stranger = db.create_user("c@example.com", "c").unwrap();

    let (current, _) = db
        .create_diary(owner.id, &entry("now", "현재", date(2024, 6, 1)))
        .unwrap();
    let (a, _) = db
        .create_diary(owner.id, &entry("A", "A 내용", date(2024, 5, 1)))
        .unwrap();
    let (b, _) = db
        .create_diary(owner.id, &entry("B", "B 내용", date(2024, 5, 2)))
        .unwrap();
    let (c, _) = db
        .create_diary(stranger.id, &entry("C", "C 내용", date(2024, 5, 3)))
        .unwrap();

    tag_diary(&db, current.id, &["등산", "두통"]);
    tag_diary(&db, a.id, &["등산", "두통"]);
    tag_diary(&db, b.id, &["등산"]);
    tag_diary(&db, c.id, &["등산", "두통"]);

    let similar = db
        .find_similar_diaries(current.id, owner.id, &["등산", "두통"], 2, 3)
        .unwrap();
    assert_eq!(similar.len(), 1);
    assert_eq!(similar[0].diary_id, a.id);
    assert_eq!(similar[0].content, "A 내용");
    assert_eq!(similar[0].matching_tags, 2);
}

#[test]
fn test_find_similar_diaries_ordering_and_limits() {
    let (db, user) = setup();
    let (current, _) = db
        .create_diary(user.id, &entry("now", "현재", date(2024, 6, 1)))
        .unwrap();
    let (older, _) = db
        .create_diary(user.id, &entry("older", "x", date(2024, 1, 1)))
        .unwrap();
    let (newer, _) = db
        .create_diary(user.id, &entry("newer", "y", date(2024, 4, 1)))
        .unwrap();
    let (best, _) = db
        .create_diary(user.id, &entry("best", "z", date(2023, 1, 1)))
        .unwrap();

    tag_diary(&db, older.id, &["등산"]);
    tag_diary(&db, newer.id, &["등산"]);
    tag_diary(&db, best.id, &["등산", "친구"]);

    let tags = ["등산", "친구"];
    let ids: Vec<i64> = db
        .find_similar_diaries(current.id, user.id, &tags, 1, 10)
        .unwrap()
        .into_iter()
        .map(|s| s.diary_id)
        .collect();
    // More matching tags first, then newer business date
    assert_eq!(ids, vec![best.id, newer.id, older.id]);

    // Limit is clamped to at least one result
    let clamped = db
        .find_similar_diaries(current.id, user.id, &tags, 1, 0)
        .unwrap();
    assert_eq!(clamped.len(), 1);

    let empty: [&str; 0] = [];
    assert!(db
        .find_similar_diaries(current.id, user.id, &empty, 1, 3)
        .unwrap()
        .is_empty());
}

#[test]
fn test_similarity_binds_tag_names_as_parameters() {
    let (db, user) = setup();
    let (current, _) = db
        .create_diary(user.id, &entry("now", "c", date(2024, 6, 1)))
        .unwrap();
    let hostile = "x') OR 1=1 --";
    let result = db
        .find_similar_diaries(current.id, user.id, &[hostile], 1, 3)
        .unwrap();
    assert!(result.is_empty());
}

#[test]
fn test_reconcile_adopts_remote_emotion_only_when_unset() {
    let (db, user) = setup();
    let (diary, _) = db
        .create_diary(user.id, &entry("a", "b", date(2024, 5, 1)))
        .unwrap();

    let updated = db
        .reconcile_status(
            diary.id,
            ProcessingStatus::Completed,
            Some("기쁨"),
            Some("http://img/joy.png"),
        )
        .unwrap()
        .unwrap();
    assert_eq!(updated.emotion.as_deref(), Some("기쁨"));
    assert_eq!(updated.image_url.as_deref(), Some("http://img/joy.png"));
    assert_eq!(
        db.get_status(diary.id).unwrap().unwrap().status,
        ProcessingStatus::Completed
    );

    // Already set: a later report does not overwrite
    let again = db
        .reconcile_status(
            diary.id,
            ProcessingStatus::Completed,
            Some("슬픔"),
            Some("http://img/sad.png"),
        )
        .unwrap()
        .unwrap();
    assert_eq!(again.emotion.as_deref(), Some("기쁨"));
}

#[test]
fn test_reconcile_non_completed_status_keeps_fields() {
    let (db, user) = setup();
    let (diary, _) = db
        .create_diary(user.id, &entry("a", "b", date(2024, 5, 1)))
        .unwrap();

    let updated = db
        .reconcile_status(diary.id, ProcessingStatus::Generating, Some("기쁨"), None)
        .unwrap()
        .unwrap();
    assert!(updated.emotion.is_none());
    assert_eq!(
        db.get_status(diary.id).unwrap().unwrap().status,
        ProcessingStatus::Generating
    );
    assert!(db
        .reconcile_status(9999, ProcessingStatus::Completed, None, None)
        .unwrap()
        .is_none());
}

#[test]
fn test_unfinished_runs_and_summary() {
    let (db, user) = setup();
    let (queued, _) = db
        .create_diary(user.id, &entry("q", "c", date(2024, 5, 1)))
        .unwrap();
    let (analyzing, _) = db
        .create_diary(user.id, &entry("a", "c", date(2024, 5, 2)))
        .unwrap();
    let (done, _) = db
        .create_diary(user.id, &entry("d", "c", date(2024, 5, 3)))
        .unwrap();

    db.mark_analyzing(analyzing.id, 1).unwrap();
    db.complete_tag_run(done.id, 1, "긍정적").unwrap();

    let runs = db.list_unfinished_runs().unwrap();
    assert_eq!(runs, vec![(queued.id, 1), (analyzing.id, 1)]);

    let summary = db.status_summary().unwrap();
    assert_eq!(summary.queued, 1);
    assert_eq!(summary.analyzing, 1);
    assert_eq!(summary.completed, 1);
    assert_eq!(summary.total(), 3);
}

#[test]
fn test_emotion_stats_percentages() {
    let (db, user) = setup();
    for (i, emotion) in ["기쁨", "기쁨", "슬픔"].iter().enumerate() {
        let (diary, _) = db
            .create_diary(user.id, &entry("t", "c", date(2024, 5, i as u32 + 1)))
            .unwrap();
        db.complete_tag_run(diary.id, 1, emotion).unwrap();
    }
    // Not yet processed: not counted
    db.create_diary(user.id, &entry("t", "c", date(2024, 5, 9)))
        .unwrap();

    let stats = db.emotion_stats(user.id).unwrap();
    assert_eq!(stats.len(), 2);
    assert_eq!(stats[0].emotion, "기쁨");
    assert_eq!(stats[0].count, 2);
    assert_eq!(stats[0].percentage, 66.7);
    assert_eq!(stats[1].percentage, 33.3);
}

#[test]
fn test_gallery_lists_completed_images() {
    let (db, user) = setup();
    let (joy, _) = db
        .create_diary(user.id, &entry("joy", "c", date(2024, 5, 1)))
        .unwrap();
    let (sad, _) = db
        .create_diary(user.id, &entry("sad", "c", date(2024, 5, 2)))
        .unwrap();
    let (pending, _) = db
        .create_diary(user.id, &entry("pending", "c", date(2024, 5, 3)))
        .unwrap();

    db.record_analysis(joy.id, 1, ProcessingStatus::Completed, Some("기쁨"), Some("u1"))
        .unwrap();
    db.record_analysis(sad.id, 1, ProcessingStatus::Completed, Some("슬픔"), Some("u2"))
        .unwrap();
    db.record_analysis(pending.id, 1, ProcessingStatus::Generating, None, None)
        .unwrap();

    let all = db.gallery_images(user.id, None).unwrap();
    assert_eq!(
        all.iter().map(|i| i.url.as_str()).collect::<Vec<_>>(),
        vec!["u2", "u1"]
    );

    let joyful = db.gallery_images(user.id, Some("기쁨")).unwrap();
    assert_eq!(joyful.len(), 1);
    assert_eq!(joyful[0].title, "joy");
}

#[test]
fn test_gallery_image_detail() {
    let (db, user) = setup();
    let (diary, _) = db
        .create_diary(user.id, &entry("joy", "c", date(2024, 5, 1)))
        .unwrap();
    assert!(db.gallery_image(user.id, diary.id).unwrap().is_none());

    db.record_analysis(diary.id, 1, ProcessingStatus::Completed, Some("기쁨"), Some("u1"))
        .unwrap();
    let image = db.gallery_image(user.id, diary.id).unwrap().unwrap();
    assert_eq!(image.url, "u1");

    let other = db.create_user("x@example.com", "x").unwrap();
    assert!(db.gallery_image(other.id, diary.id).unwrap().is_none());
}

#[test]
fn test_writing_stats() {
    let (db, user) = setup();
    assert_eq!(db.writing_stats(user.id, date(2024, 5, 10)).unwrap().total_entries, 0);

    for (day, content) in [(10, "가나다라"), (9, "가나"), (8, "가나다"), (6, "가"), (3, "가나")] {
        db.create_diary(user.id, &entry("t", content, date(2024, 5, day)))
            .unwrap();
    }
    db.create_diary(user.id, &entry("t", "가나다", date(2024, 4, 30)))
        .unwrap();

    let stats = db.writing_stats(user.id, date(2024, 5, 10)).unwrap();
    assert_eq!(stats.total_entries, 6);
    assert_eq!(stats.monthly_entries, 5);
    assert_eq!(stats.consecutive_days, 3);
    // 15 characters over 6 entries
    assert_eq!(stats.average_length, 2);

    // No diary today: the streak is zero
    let tomorrow = db.writing_stats(user.id, date(2024, 5, 12)).unwrap();
    assert_eq!(tomorrow.consecutive_days, 0);
}
