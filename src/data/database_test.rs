//! Database tests

use super::*;
use chrono::Utc;
use tempfile::TempDir;

/// Helper to create a test database
async fn create_test_db() -> (Database, TempDir) {
    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir.path().join("test.db");
    let db = Database::connect(&db_path).await.unwrap();
    (db, temp_dir)
}

fn test_profile(email: &str) -> Profile {
    Profile {
        id: EntityId::new().0,
        email: email.to_string(),
        name: "Test User".to_string(),
        role: Role::Student.as_str().to_string(),
        password_hash: "hash".to_string(),
        created_at: Utc::now(),
        updated_at: Utc::now(),
    }
}

fn test_course(id: &str) -> CourseRow {
    CourseRow {
        id: id.to_string(),
        title: "Intro".to_string(),
        description: "<p>Basics</p>".to_string(),
        outline: None,
        instructor: "Ada".to_string(),
        instructor_bio: None,
        duration: "4 weeks".to_string(),
        level: Level::Beginner.as_str().to_string(),
        price: 49.0,
        tags: r#"["intro"]"#.to_string(),
        image: None,
        image_path: None,
        signature_path: None,
        created_at: Utc::now(),
        updated_at: Utc::now(),
    }
}

#[tokio::test]
async fn test_database_connection() {
    let (_db, _temp_dir) = create_test_db().await;
    // Connection successful if we get here without panicking
}

#[tokio::test]
async fn test_profile_insert_and_lookup() {
    let (db, _temp_dir) = create_test_db().await;
    let profile = test_profile("student@example.com");

    db.insert_profile(&profile).await.unwrap();

    let by_id = db.get_profile(&profile.id).await.unwrap().unwrap();
    assert_eq!(by_id.email, "student@example.com");

    let by_email = db
        .get_profile_by_email("student@example.com")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(by_email.id, profile.id);
}

#[tokio::test]
async fn test_duplicate_email_is_conflict() {
    let (db, _temp_dir) = create_test_db().await;

    db.insert_profile(&test_profile("dup@example.com"))
        .await
        .unwrap();
    let error = db
        .insert_profile(&test_profile("dup@example.com"))
        .await
        .unwrap_err();

    assert!(matches!(error, crate::error::AppError::Conflict(_)));
}

#[tokio::test]
async fn test_course_upsert_keeps_created_at() {
    let (db, _temp_dir) = create_test_db().await;
    let course = test_course("c1");
    db.upsert_course(&course).await.unwrap();

    let mut edited = course.clone();
    edited.title = "Intro, second edition".to_string();
    edited.created_at = Utc::now() + chrono::Duration::days(1);
    db.upsert_course(&edited).await.unwrap();

    let stored = db.get_course("c1").await.unwrap().unwrap();
    assert_eq!(stored.title, "Intro, second edition");
    assert_eq!(
        stored.created_at.timestamp_millis(),
        course.created_at.timestamp_millis()
    );
    assert_eq!(db.list_courses().await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_enrollment_insert_is_idempotent() {
    let (db, _temp_dir) = create_test_db().await;
    let profile = test_profile("s@example.com");
    db.insert_profile(&profile).await.unwrap();
    db.upsert_course(&test_course("c1")).await.unwrap();

    assert!(db.insert_enrollment_if_absent(&profile.id, "c1").await.unwrap());
    assert!(!db.insert_enrollment_if_absent(&profile.id, "c1").await.unwrap());

    let enrollment = db.get_enrollment(&profile.id, "c1").await.unwrap().unwrap();
    assert_eq!(enrollment.status, EnrollmentStatus::Registered);
    assert_eq!(enrollment.progress, 0);
}

#[tokio::test]
async fn test_enrollment_update() {
    let (db, _temp_dir) = create_test_db().await;
    let profile = test_profile("s@example.com");
    db.insert_profile(&profile).await.unwrap();
    db.upsert_course(&test_course("c1")).await.unwrap();
    db.insert_enrollment_if_absent(&profile.id, "c1").await.unwrap();

    let mut enrollment = db.get_enrollment(&profile.id, "c1").await.unwrap().unwrap();
    enrollment.status = EnrollmentStatus::Pending;
    enrollment.progress = 75;
    db.update_enrollment(&enrollment).await.unwrap();

    let stored = db.list_enrollments_for_user(&profile.id).await.unwrap();
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].status, EnrollmentStatus::Pending);
    assert_eq!(stored[0].progress, 75);
}

#[tokio::test]
async fn test_update_missing_enrollment_is_not_found() {
    let (db, _temp_dir) = create_test_db().await;

    let enrollment = Enrollment {
        user_id: "nobody".to_string(),
        course_id: "nothing".to_string(),
        status: EnrollmentStatus::Pending,
        progress: 10,
        updated_at: Utc::now(),
    };

    assert!(matches!(
        db.update_enrollment(&enrollment).await,
        Err(crate::error::AppError::NotFound)
    ));
}

#[tokio::test]
async fn test_delete_course_cascades_to_enrollments() {
    let (db, _temp_dir) = create_test_db().await;
    let profile = test_profile("s@example.com");
    db.insert_profile(&profile).await.unwrap();
    db.upsert_course(&test_course("c1")).await.unwrap();
    db.upsert_course(&test_course("c2")).await.unwrap();
    db.insert_enrollment_if_absent(&profile.id, "c1").await.unwrap();
    db.insert_enrollment_if_absent(&profile.id, "c2").await.unwrap();

    let removed = db.delete_course("c1").await.unwrap();

    assert_eq!(removed, 1);
    assert!(db.get_course("c1").await.unwrap().is_none());
    let remaining = db.list_enrollments().await.unwrap();
    assert_eq!(remaining.len(), 1);
    assert_eq!(remaining[0].course_id, "c2");

    assert!(matches!(
        db.delete_course("c1").await,
        Err(crate::error::AppError::NotFound)
    ));
}

#[tokio::test]
async fn test_course_asset_paths() {
    let (db, _temp_dir) = create_test_db().await;
    let mut course = test_course("c1");
    course.image = Some("https://cdn.example.com/cover.png".to_string());
    db.upsert_course(&course).await.unwrap();

    db.set_course_image_path("c1", Some("u1/courses/c1-a.png"))
        .await
        .unwrap();
    db.set_course_signature_path("c1", Some("u1/signatures/c1-b.png"))
        .await
        .unwrap();

    let stored = db.get_course("c1").await.unwrap().unwrap();
    assert_eq!(stored.image_path.as_deref(), Some("u1/courses/c1-a.png"));
    assert_eq!(stored.image, None);
    assert_eq!(
        stored.signature_path.as_deref(),
        Some("u1/signatures/c1-b.png")
    );

    db.set_course_signature_path("c1", None).await.unwrap();
    let stored = db.get_course("c1").await.unwrap().unwrap();
    assert_eq!(stored.signature_path, None);
}

#[tokio::test]
async fn test_settings_round_trip() {
    let (db, _temp_dir) = create_test_db().await;

    assert!(db.get_setting(HOME_CONTENT_KEY).await.unwrap().is_none());
    db.put_setting(HOME_CONTENT_KEY, "{}").await.unwrap();
    db.put_setting(HOME_CONTENT_KEY, r#"{"a":1}"#).await.unwrap();

    assert_eq!(
        db.get_setting(HOME_CONTENT_KEY).await.unwrap().as_deref(),
        Some(r#"{"a":1}"#)
    );
}

#[tokio::test]
async fn test_video_crud() {
    let (db, _temp_dir) = create_test_db().await;
    let video = VideoRow {
        id: EntityId::new().0,
        title: "Welcome".to_string(),
        description: None,
        video_path: "u1/videos/library-x.mp4".to_string(),
        content_type: "video/mp4".to_string(),
        created_by: "u1".to_string(),
        created_at: Utc::now(),
    };

    db.insert_video(&video).await.unwrap();
    assert_eq!(db.list_videos().await.unwrap().len(), 1);
    assert!(db.get_video(&video.id).await.unwrap().is_some());

    db.delete_video(&video.id).await.unwrap();
    assert!(db.list_videos().await.unwrap().is_empty());
}
