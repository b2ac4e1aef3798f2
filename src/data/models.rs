//! Data models
//!
//! Rust structs representing database entities and the domain views built
//! from them. Rows use ULID ids and chrono timestamps; enum-like columns are
//! stored as text and parsed at the edge.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::AppError;

// =============================================================================
// ID Types
// =============================================================================

/// Entity ID wrapper (ULID format, 26 characters)
///
/// Example: "01ARZ3NDEKTSV4RRFFQ69G5FAV"
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityId(pub String);

impl EntityId {
    /// Generate a new ULID
    pub fn new() -> Self {
        Self(ulid::Ulid::new().to_string())
    }
}

impl Default for EntityId {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// Profiles / Users
// =============================================================================

/// Account role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Student,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Student => "student",
            Self::Admin => "admin",
        }
    }

    pub fn parse(value: &str) -> Self {
        if value.eq_ignore_ascii_case("admin") {
            Self::Admin
        } else {
            Self::Student
        }
    }

    /// Role for a newly signed-up account
    ///
    /// Admin iff the email matches the configured administrator address.
    pub fn for_email(email: &str, admin_email: &str) -> Self {
        if email.trim().eq_ignore_ascii_case(admin_email.trim()) {
            Self::Admin
        } else {
            Self::Student
        }
    }
}

/// Stored profile row
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Profile {
    pub id: String,
    pub email: String,
    pub name: String,
    /// "student" or "admin"
    pub role: String,
    /// Argon2id PHC string
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A user with enrollment sets derived from their enrollment rows
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub name: String,
    pub email: String,
    pub role: Role,
    pub registered_course_ids: BTreeSet<String>,
    pub pending_course_ids: BTreeSet<String>,
    pub completed_course_ids: BTreeSet<String>,
    pub course_progress: BTreeMap<String, u8>,
}

impl User {
    /// Build the user view from a profile and that user's enrollments.
    ///
    /// Every enrollment lands in `registered_course_ids`, so the pending and
    /// completed sets are always subsets of it and disjoint from each other.
    pub fn from_parts(profile: &Profile, enrollments: &[Enrollment]) -> Self {
        let mut user = Self {
            id: profile.id.clone(),
            name: profile.name.clone(),
            email: profile.email.clone(),
            role: Role::parse(&profile.role),
            registered_course_ids: BTreeSet::new(),
            pending_course_ids: BTreeSet::new(),
            completed_course_ids: BTreeSet::new(),
            course_progress: BTreeMap::new(),
        };

        for enrollment in enrollments.iter().filter(|e| e.user_id == profile.id) {
            let course_id = enrollment.course_id.clone();
            user.registered_course_ids.insert(course_id.clone());
            match enrollment.status {
                EnrollmentStatus::Pending => {
                    user.pending_course_ids.insert(course_id.clone());
                }
                EnrollmentStatus::Completed => {
                    user.completed_course_ids.insert(course_id.clone());
                }
                EnrollmentStatus::Registered => {}
            }
            user.course_progress.insert(course_id, enrollment.progress);
        }

        user
    }
}

// =============================================================================
// Enrollments
// =============================================================================

/// Lifecycle state of a (user, course) pairing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EnrollmentStatus {
    Registered,
    Pending,
    Completed,
}

impl EnrollmentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Registered => "registered",
            Self::Pending => "pending",
            Self::Completed => "completed",
        }
    }
}

impl std::str::FromStr for EnrollmentStatus {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "registered" => Ok(Self::Registered),
            "pending" => Ok(Self::Pending),
            "completed" => Ok(Self::Completed),
            other => Err(AppError::Internal(anyhow::anyhow!(
                "unknown enrollment status: {other}"
            ))),
        }
    }
}

/// Stored enrollment row
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct EnrollmentRow {
    pub user_id: String,
    pub course_id: String,
    pub status: String,
    pub progress: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Enrollment with typed status
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Enrollment {
    pub user_id: String,
    pub course_id: String,
    pub status: EnrollmentStatus,
    pub progress: u8,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<EnrollmentRow> for Enrollment {
    type Error = AppError;

    fn try_from(row: EnrollmentRow) -> Result<Self, Self::Error> {
        Ok(Self {
            status: row.status.parse()?,
            progress: row.progress.clamp(0, 100) as u8,
            user_id: row.user_id,
            course_id: row.course_id,
            updated_at: row.updated_at,
        })
    }
}

// =============================================================================
// Courses
// =============================================================================

/// Course difficulty
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum Level {
    #[default]
    Beginner,
    Intermediate,
    Advanced,
}

impl Level {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Beginner => "Beginner",
            Self::Intermediate => "Intermediate",
            Self::Advanced => "Advanced",
        }
    }

    pub fn parse(value: &str) -> Self {
        match value {
            "Intermediate" => Self::Intermediate,
            "Advanced" => Self::Advanced,
            _ => Self::Beginner,
        }
    }
}

/// Stored course row
///
/// `image` holds an external URL when the cover is not in our bucket;
/// `image_path` and `signature_path` are storage keys.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct CourseRow {
    pub id: String,
    pub title: String,
    pub description: String,
    pub outline: Option<String>,
    pub instructor: String,
    pub instructor_bio: Option<String>,
    pub duration: String,
    pub level: String,
    pub price: f64,
    /// JSON array of strings
    pub tags: String,
    pub image: Option<String>,
    pub image_path: Option<String>,
    pub signature_path: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl CourseRow {
    pub fn tag_list(&self) -> Vec<String> {
        serde_json::from_str(&self.tags).unwrap_or_default()
    }

    /// Durable reference for the cover image, preferring our own bucket
    pub fn image_reference(&self) -> Option<&str> {
        self.image_path.as_deref().or(self.image.as_deref())
    }
}

/// Course with asset references resolved to temporary URLs
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Course {
    pub id: String,
    pub title: String,
    pub description: String,
    pub outline: Option<String>,
    pub instructor: String,
    pub instructor_bio: Option<String>,
    pub duration: String,
    pub level: Level,
    pub price: f64,
    pub tags: Vec<String>,
    pub image: Option<String>,
    pub image_path: Option<String>,
    pub signature_image: Option<String>,
    pub signature_path: Option<String>,
}

// =============================================================================
// Site settings
// =============================================================================

/// Settings key for the landing page content
pub const HOME_CONTENT_KEY: &str = "home_content";

/// A landing page feature card
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Feature {
    pub title: String,
    pub description: String,
}

/// Landing page hero content (singleton)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HomeContent {
    pub hero_title: String,
    pub hero_subtitle: String,
    #[serde(default)]
    pub features: Vec<Feature>,
    /// URL or storage key as stored; resolved on read
    #[serde(default)]
    pub hero_image: Option<String>,
}

impl Default for HomeContent {
    fn default() -> Self {
        Self {
            hero_title: "Learn without limits".to_string(),
            hero_subtitle: "Courses taught by practitioners, with certificates you can share."
                .to_string(),
            features: vec![
                Feature {
                    title: "Expert instructors".to_string(),
                    description: "Every course is built and taught by people who do the work."
                        .to_string(),
                },
                Feature {
                    title: "Learn at your pace".to_string(),
                    description: "Track your progress and pick up where you left off.".to_string(),
                },
                Feature {
                    title: "Certificates".to_string(),
                    description: "Finish a course and receive a signed certificate.".to_string(),
                },
            ],
            hero_image: None,
        }
    }
}

// =============================================================================
// Videos
// =============================================================================

/// Stored video row
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct VideoRow {
    pub id: String,
    pub title: String,
    pub description: Option<String>,
    /// Storage key, or an absolute URL for externally hosted videos
    pub video_path: String,
    pub content_type: String,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
}

/// Video with a resolved playback URL
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Video {
    pub id: String,
    pub title: String,
    pub description: Option<String>,
    pub video_path: String,
    pub content_type: String,
    pub url: Option<String>,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn profile(id: &str) -> Profile {
        Profile {
            id: id.to_string(),
            email: format!("{id}@example.com"),
            name: id.to_string(),
            role: "student".to_string(),
            password_hash: String::new(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn enrollment(user: &str, course: &str, status: EnrollmentStatus, progress: u8) -> Enrollment {
        Enrollment {
            user_id: user.to_string(),
            course_id: course.to_string(),
            status,
            progress,
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn role_for_email_matches_admin_case_insensitively() {
        assert_eq!(
            Role::for_email(" Admin@Inst.Example ", "admin@inst.example"),
            Role::Admin
        );
        assert_eq!(
            Role::for_email("student@inst.example", "admin@inst.example"),
            Role::Student
        );
    }

    #[test]
    fn user_sets_respect_subset_invariants() {
        let enrollments = vec![
            enrollment("u1", "c1", EnrollmentStatus::Registered, 10),
            enrollment("u1", "c2", EnrollmentStatus::Pending, 80),
            enrollment("u1", "c3", EnrollmentStatus::Completed, 100),
            enrollment("u2", "c4", EnrollmentStatus::Pending, 0),
        ];

        let user = User::from_parts(&profile("u1"), &enrollments);

        assert_eq!(user.registered_course_ids.len(), 3);
        assert!(user.pending_course_ids.is_subset(&user.registered_course_ids));
        assert!(
            user.completed_course_ids
                .is_subset(&user.registered_course_ids)
        );
        assert!(
            user.pending_course_ids
                .is_disjoint(&user.completed_course_ids)
        );
        assert_eq!(user.course_progress.get("c2"), Some(&80));
        assert!(!user.registered_course_ids.contains("c4"));
    }

    #[test]
    fn enrollment_status_round_trips_through_text() {
        for status in [
            EnrollmentStatus::Registered,
            EnrollmentStatus::Pending,
            EnrollmentStatus::Completed,
        ] {
            assert_eq!(status.as_str().parse::<EnrollmentStatus>().unwrap(), status);
        }
        assert!("archived".parse::<EnrollmentStatus>().is_err());
    }

    #[test]
    fn course_row_prefers_storage_key_over_external_image() {
        let row = CourseRow {
            id: "c1".to_string(),
            title: "Intro".to_string(),
            description: String::new(),
            outline: None,
            instructor: "Ada".to_string(),
            instructor_bio: None,
            duration: "4 weeks".to_string(),
            level: "Beginner".to_string(),
            price: 0.0,
            tags: r#"["rust","intro"]"#.to_string(),
            image: Some("https://cdn.example.com/cover.png".to_string()),
            image_path: Some("u1/courses/c1-x.png".to_string()),
            signature_path: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };

        assert_eq!(row.image_reference(), Some("u1/courses/c1-x.png"));
        assert_eq!(row.tag_list(), vec!["rust", "intro"]);
    }
}
