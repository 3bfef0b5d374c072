//! CLI command tests
//!
//! This module contains all tests for the CLI commands.

use chrono::NaiveDate;
use momento_core::db::Database;
use momento_core::models::{NewDiary, ProcessingStatus, User};
use momento_core::{AppConfig, AuthConfig, PipelineMode};

use crate::commands;

fn setup_test_db() -> (Database, User) {
    let db = Database::in_memory().unwrap();
    let user = db.create_user("writer@example.com", "writer").unwrap();
    (db, user)
}

fn create_test_diary(db: &Database, user: &User, content: &str) -> i64 {
    let (diary, _) = db
        .create_diary(
            user.id,
            &NewDiary {
                title: "일기".into(),
                content: content.into(),
                date: NaiveDate::from_ymd_opt(2024, 5, 1).unwrap(),
                shared: false,
            },
        )
        .unwrap();
    diary.id
}

fn test_auth() -> AuthConfig {
    AuthConfig::new("cli-test-secret")
}

// ========== Init & Status Tests ==========

#[test]
fn test_cmd_init_creates_database() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("momento.db");

    commands::cmd_init(&path, true).unwrap();

    assert!(path.exists());
    let db = commands::open_db(&path, true).unwrap();
    assert!(db.list_users().unwrap().is_empty());
}

#[test]
fn test_cmd_status_before_init() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("missing.db");

    assert!(commands::cmd_status(&path, true).is_ok());
    assert!(!path.exists(), "status must not create the database");
}

#[test]
fn test_cmd_status_with_diaries() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("momento.db");
    let db = commands::open_db(&path, true).unwrap();
    let user = db.create_user("writer@example.com", "writer").unwrap();
    let id = create_test_diary(&db, &user, "오늘은 등산을 했다");
    assert!(db.fail_run(id, 1).unwrap());

    assert!(commands::cmd_status(&path, true).is_ok());
    assert_eq!(db.status_summary().unwrap().failed, 1);
}

// ========== Users Command Tests ==========

#[test]
fn test_cmd_users_add_defaults_nickname() {
    let (db, _) = setup_test_db();

    commands::cmd_users_add(&db, &test_auth(), "newcomer@example.com", None).unwrap();

    let user = db.get_user_by_email("newcomer@example.com").unwrap().unwrap();
    assert_eq!(user.nickname, "newcomer");
}

#[test]
fn test_cmd_users_add_with_nickname() {
    let (db, _) = setup_test_db();

    commands::cmd_users_add(&db, &test_auth(), "jiwoo@example.com", Some("지우")).unwrap();

    let user = db.get_user_by_email("jiwoo@example.com").unwrap().unwrap();
    assert_eq!(user.nickname, "지우");
}

#[test]
fn test_cmd_users_add_rejects_duplicate_and_invalid_email() {
    let (db, _) = setup_test_db();

    assert!(commands::cmd_users_add(&db, &test_auth(), "writer@example.com", None).is_err());
    assert!(commands::cmd_users_add(&db, &test_auth(), "not-an-email", None).is_err());
    assert_eq!(db.list_users().unwrap().len(), 1);
}

#[test]
fn test_cmd_users_token() {
    let (db, _) = setup_test_db();

    assert!(commands::cmd_users_token(&db, &test_auth(), "writer@example.com").is_ok());
    assert!(commands::cmd_users_token(&db, &test_auth(), "nobody@example.com").is_err());
}

#[test]
fn test_cmd_users_list() {
    let (db, _) = setup_test_db();
    assert!(commands::cmd_users_list(&db).is_ok());

    let empty = Database::in_memory().unwrap();
    assert!(commands::cmd_users_list(&empty).is_ok());
}

// ========== Process Command Tests ==========

#[tokio::test]
async fn test_cmd_process_runs_tag_pipeline() {
    let (db, user) = setup_test_db();
    let id = create_test_diary(&db, &user, "공원을 산책해서 행복했다");
    let config = AppConfig {
        use_mock_ai: true,
        pipeline: PipelineMode::Tags,
        ..Default::default()
    };

    commands::cmd_process(&db, &config, id).await.unwrap();

    let record = db.get_status(id).unwrap().unwrap();
    assert_eq!(record.status, ProcessingStatus::Completed);
    assert_eq!(record.run_token, 2);
    assert_eq!(db.get_diary_tags(id).unwrap().len(), 2);
    assert_eq!(db.get_diary(id).unwrap().unwrap().emotion.as_deref(), Some("긍정적"));
}

#[tokio::test]
async fn test_cmd_process_runs_analysis_pipeline() {
    let (db, user) = setup_test_db();
    let id = create_test_diary(&db, &user, "친구들과 소풍");
    let config = AppConfig {
        use_mock_ai: true,
        pipeline: PipelineMode::Analysis,
        ..Default::default()
    };

    commands::cmd_process(&db, &config, id).await.unwrap();

    let diary = db.get_diary(id).unwrap().unwrap();
    assert_eq!(diary.emotion.as_deref(), Some("기쁨"));
    assert!(diary.image_url.is_some());
}

#[tokio::test]
async fn test_cmd_process_without_backend_fails_the_run() {
    let (db, user) = setup_test_db();
    let id = create_test_diary(&db, &user, "내용");

    let result = commands::cmd_process(&db, &AppConfig::default(), id).await;

    assert!(result.is_err());
    assert_eq!(
        db.get_status(id).unwrap().unwrap().status,
        ProcessingStatus::Failed
    );
}

#[tokio::test]
async fn test_cmd_process_missing_diary() {
    let (db, _) = setup_test_db();

    let result = commands::cmd_process(&db, &AppConfig::default(), 999).await;

    assert!(result.is_err());
}
