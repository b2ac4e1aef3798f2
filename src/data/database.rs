//! SQLite database operations
//!
//! All database access goes through this module.
//! Uses SQLx with runtime-checked queries and embedded migrations.

use chrono::Utc;
use sqlx::{Pool, Sqlite, SqlitePool};
use std::path::Path;

use super::models::*;
use crate::error::AppError;

/// Database connection pool wrapper.
pub struct Database {
    pool: Pool<Sqlite>,
}

impl Database {
    // =========================================================================
    // Connection
    // =========================================================================

    /// Connect to SQLite database
    ///
    /// Creates the database file if it doesn't exist.
    /// Runs pending migrations automatically.
    ///
    /// # Arguments
    /// * `path` - Path to SQLite database file
    ///
    /// # Errors
    /// Returns error if connection or migration fails
    pub async fn connect(path: &Path) -> Result<Self, AppError> {
        // Create parent directory if it doesn't exist
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| AppError::Database(sqlx::Error::Io(e)))?;
        }

        let connection_string = format!("sqlite:{}?mode=rwc", path.display());
        let pool = SqlitePool::connect(&connection_string).await?;

        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .map_err(|e| {
                tracing::error!("Migration failed: {}", e);
                AppError::Internal(anyhow::anyhow!("Migration failed: {}", e))
            })?;

        tracing::info!(path = %path.display(), "Database connected and migrated successfully");

        Ok(Self { pool })
    }

    // =========================================================================
    // Profiles
    // =========================================================================

    /// Insert a new profile
    ///
    /// # Errors
    /// Returns `Conflict` if the email is already taken
    pub async fn insert_profile(&self, profile: &Profile) -> Result<(), AppError> {
        let result = sqlx::query(
            r#"
            INSERT INTO profiles (id, email, name, role, password_hash, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(email) DO NOTHING
            "#,
        )
        .bind(&profile.id)
        .bind(&profile.email)
        .bind(&profile.name)
        .bind(&profile.role)
        .bind(&profile.password_hash)
        .bind(profile.created_at)
        .bind(profile.updated_at)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::Conflict(
                "an account with this email already exists".to_string(),
            ));
        }

        Ok(())
    }

    pub async fn get_profile(&self, id: &str) -> Result<Option<Profile>, AppError> {
        let profile = sqlx::query_as::<_, Profile>("SELECT * FROM profiles WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(profile)
    }

    /// Look up a profile by normalized (lowercase) email
    pub async fn get_profile_by_email(&self, email: &str) -> Result<Option<Profile>, AppError> {
        let profile = sqlx::query_as::<_, Profile>("SELECT * FROM profiles WHERE email = ?")
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;

        Ok(profile)
    }

    /// All profiles, oldest first
    pub async fn list_profiles(&self) -> Result<Vec<Profile>, AppError> {
        let profiles =
            sqlx::query_as::<_, Profile>("SELECT * FROM profiles ORDER BY created_at ASC, id ASC")
                .fetch_all(&self.pool)
                .await?;

        Ok(profiles)
    }

    // =========================================================================
    // Enrollments
    // =========================================================================

    /// Create an enrollment at `registered`/0 unless the pair already exists
    ///
    /// # Returns
    /// `true` if a row was inserted
    pub async fn insert_enrollment_if_absent(
        &self,
        user_id: &str,
        course_id: &str,
    ) -> Result<bool, AppError> {
        let now = Utc::now();
        let result = sqlx::query(
            r#"
            INSERT INTO enrollments (user_id, course_id, status, progress, created_at, updated_at)
            VALUES (?, ?, ?, 0, ?, ?)
            ON CONFLICT(user_id, course_id) DO NOTHING
            "#,
        )
        .bind(user_id)
        .bind(course_id)
        .bind(EnrollmentStatus::Registered.as_str())
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    pub async fn get_enrollment(
        &self,
        user_id: &str,
        course_id: &str,
    ) -> Result<Option<Enrollment>, AppError> {
        let row = sqlx::query_as::<_, EnrollmentRow>(
            "SELECT * FROM enrollments WHERE user_id = ? AND course_id = ?",
        )
        .bind(user_id)
        .bind(course_id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(Enrollment::try_from).transpose()
    }

    /// Overwrite status and progress of an existing enrollment
    pub async fn update_enrollment(&self, enrollment: &Enrollment) -> Result<(), AppError> {
        let result = sqlx::query(
            r#"
            UPDATE enrollments
            SET status = ?, progress = ?, updated_at = ?
            WHERE user_id = ? AND course_id = ?
            "#,
        )
        .bind(enrollment.status.as_str())
        .bind(i64::from(enrollment.progress))
        .bind(enrollment.updated_at)
        .bind(&enrollment.user_id)
        .bind(&enrollment.course_id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound);
        }

        Ok(())
    }

    /// Enrollments of a single user
    pub async fn list_enrollments_for_user(
        &self,
        user_id: &str,
    ) -> Result<Vec<Enrollment>, AppError> {
        let rows = sqlx::query_as::<_, EnrollmentRow>(
            "SELECT * FROM enrollments WHERE user_id = ? ORDER BY course_id ASC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Enrollment::try_from).collect()
    }

    /// Every enrollment, for snapshot-based derivations
    pub async fn list_enrollments(&self) -> Result<Vec<Enrollment>, AppError> {
        let rows = sqlx::query_as::<_, EnrollmentRow>(
            "SELECT * FROM enrollments ORDER BY user_id ASC, course_id ASC",
        )
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Enrollment::try_from).collect()
    }

    // =========================================================================
    // Courses
    // =========================================================================

    /// All courses, oldest first
    pub async fn list_courses(&self) -> Result<Vec<CourseRow>, AppError> {
        let rows =
            sqlx::query_as::<_, CourseRow>("SELECT * FROM courses ORDER BY created_at ASC, id ASC")
                .fetch_all(&self.pool)
                .await?;

        Ok(rows)
    }

    pub async fn get_course(&self, id: &str) -> Result<Option<CourseRow>, AppError> {
        let row = sqlx::query_as::<_, CourseRow>("SELECT * FROM courses WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row)
    }

    /// Create or update a course
    ///
    /// `created_at` is kept on update.
    pub async fn upsert_course(&self, course: &CourseRow) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO courses (
                id, title, description, outline, instructor, instructor_bio, duration,
                level, price, tags, image, image_path, signature_path, created_at, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(id) DO UPDATE SET
                title = excluded.title,
                description = excluded.description,
                outline = excluded.outline,
                instructor = excluded.instructor,
                instructor_bio = excluded.instructor_bio,
                duration = excluded.duration,
                level = excluded.level,
                price = excluded.price,
                tags = excluded.tags,
                image = excluded.image,
                image_path = excluded.image_path,
                signature_path = excluded.signature_path,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(&course.id)
        .bind(&course.title)
        .bind(&course.description)
        .bind(&course.outline)
        .bind(&course.instructor)
        .bind(&course.instructor_bio)
        .bind(&course.duration)
        .bind(&course.level)
        .bind(course.price)
        .bind(&course.tags)
        .bind(&course.image)
        .bind(&course.image_path)
        .bind(&course.signature_path)
        .bind(course.created_at)
        .bind(course.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Set or clear the cover image storage key
    pub async fn set_course_image_path(
        &self,
        id: &str,
        image_path: Option<&str>,
    ) -> Result<(), AppError> {
        let result = sqlx::query(
            "UPDATE courses SET image_path = ?, image = NULL, updated_at = ? WHERE id = ?",
        )
        .bind(image_path)
        .bind(Utc::now())
        .bind(id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound);
        }
        Ok(())
    }

    /// Set or clear the certificate signature storage key
    pub async fn set_course_signature_path(
        &self,
        id: &str,
        signature_path: Option<&str>,
    ) -> Result<(), AppError> {
        let result =
            sqlx::query("UPDATE courses SET signature_path = ?, updated_at = ? WHERE id = ?")
                .bind(signature_path)
                .bind(Utc::now())
                .bind(id)
                .execute(&self.pool)
                .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound);
        }
        Ok(())
    }

    /// Delete a course together with its enrollments
    ///
    /// # Returns
    /// Number of enrollments removed alongside the course
    pub async fn delete_course(&self, id: &str) -> Result<u64, AppError> {
        let mut tx = self.pool.begin().await?;

        let enrollments = sqlx::query("DELETE FROM enrollments WHERE course_id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?
            .rows_affected();

        let courses = sqlx::query("DELETE FROM courses WHERE id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?
            .rows_affected();

        if courses == 0 {
            tx.rollback().await?;
            return Err(AppError::NotFound);
        }

        tx.commit().await?;
        Ok(enrollments)
    }

    // =========================================================================
    // Site settings
    // =========================================================================

    pub async fn get_setting(&self, key: &str) -> Result<Option<String>, AppError> {
        let value: Option<String> =
            sqlx::query_scalar("SELECT value FROM site_settings WHERE key = ?")
                .bind(key)
                .fetch_optional(&self.pool)
                .await?;

        Ok(value)
    }

    pub async fn put_setting(&self, key: &str, value: &str) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO site_settings (key, value, updated_at) VALUES (?, ?, ?)
            ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at
            "#,
        )
        .bind(key)
        .bind(value)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    // =========================================================================
    // Videos
    // =========================================================================

    pub async fn insert_video(&self, video: &VideoRow) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO videos (id, title, description, video_path, content_type, created_by, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&video.id)
        .bind(&video.title)
        .bind(&video.description)
        .bind(&video.video_path)
        .bind(&video.content_type)
        .bind(&video.created_by)
        .bind(video.created_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// All videos, newest first
    pub async fn list_videos(&self) -> Result<Vec<VideoRow>, AppError> {
        let rows =
            sqlx::query_as::<_, VideoRow>("SELECT * FROM videos ORDER BY created_at DESC, id DESC")
                .fetch_all(&self.pool)
                .await?;

        Ok(rows)
    }

    pub async fn get_video(&self, id: &str) -> Result<Option<VideoRow>, AppError> {
        let row = sqlx::query_as::<_, VideoRow>("SELECT * FROM videos WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row)
    }

    pub async fn delete_video(&self, id: &str) -> Result<(), AppError> {
        let result = sqlx::query("DELETE FROM videos WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound);
        }
        Ok(())
    }
}
