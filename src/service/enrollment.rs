//! Enrollment lifecycle
//!
//! `registered -> pending -> completed`, with `pending -> registered` on
//! rejection. `Enrollment::apply` is the only place a status changes; the
//! service loads, applies, persists and then emits notifications.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;

use super::notify::{Mailer, NotificationBus, NotificationKind};
use crate::auth::{Capability, Session};
use crate::data::{CourseRow, Database, Enrollment, EnrollmentStatus};
use crate::error::AppError;
use crate::metrics::ENROLLMENT_TRANSITIONS_TOTAL;
use crate::storage::AssetResolver;

/// Highest progress value
pub const MAX_PROGRESS: u8 = 100;

/// A requested change to an enrollment
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    SetProgress(u8),
    RequestCompletion,
    Approve,
    Reject,
}

impl Transition {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SetProgress(_) => "set_progress",
            Self::RequestCompletion => "request_completion",
            Self::Approve => "approve",
            Self::Reject => "reject",
        }
    }
}

/// Why a transition was refused
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TransitionError {
    #[error("progress must be between 0 and 100, got {0}")]
    ProgressOutOfRange(u8),

    #[error("course is already completed")]
    AlreadyCompleted,

    #[error("cannot {transition} an enrollment that is {status}, expected pending")]
    NotPending {
        transition: &'static str,
        status: &'static str,
    },
}

impl From<TransitionError> for AppError {
    fn from(err: TransitionError) -> Self {
        match err {
            TransitionError::ProgressOutOfRange(_) => AppError::Validation(err.to_string()),
            _ => AppError::Conflict(err.to_string()),
        }
    }
}

impl Enrollment {
    /// Compute the state after `transition`
    ///
    /// Pure: the caller decides whether and when to persist the result.
    pub fn apply(&self, transition: Transition) -> Result<Enrollment, TransitionError> {
        let mut next = self.clone();

        match (transition, self.status) {
            (Transition::SetProgress(progress), _) => {
                if progress > MAX_PROGRESS {
                    return Err(TransitionError::ProgressOutOfRange(progress));
                }
                next.progress = progress;
            }
            (Transition::RequestCompletion, EnrollmentStatus::Completed) => {
                return Err(TransitionError::AlreadyCompleted);
            }
            (Transition::RequestCompletion, _) => {
                next.status = EnrollmentStatus::Pending;
            }
            (Transition::Approve, EnrollmentStatus::Pending) => {
                next.status = EnrollmentStatus::Completed;
                next.progress = MAX_PROGRESS;
            }
            (Transition::Reject, EnrollmentStatus::Pending) => {
                next.status = EnrollmentStatus::Registered;
            }
            (Transition::Approve | Transition::Reject, status) => {
                return Err(TransitionError::NotPending {
                    transition: transition.as_str(),
                    status: status.as_str(),
                });
            }
        }

        next.updated_at = Utc::now();
        Ok(next)
    }
}

/// Data printed on a completion certificate
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Certificate {
    pub student_name: String,
    pub course_id: String,
    pub course_title: String,
    pub instructor: String,
    pub completed_at: DateTime<Utc>,
    pub signature_image: Option<String>,
}

/// Enrollment operations for students and reviewers
pub struct EnrollmentService {
    db: Arc<Database>,
    resolver: AssetResolver,
    notifications: Arc<NotificationBus>,
    mailer: Mailer,
}

impl EnrollmentService {
    pub fn new(
        db: Arc<Database>,
        resolver: AssetResolver,
        notifications: Arc<NotificationBus>,
        mailer: Mailer,
    ) -> Self {
        Self {
            db,
            resolver,
            notifications,
            mailer,
        }
    }

    async fn course(&self, course_id: &str) -> Result<CourseRow, AppError> {
        self.db.get_course(course_id).await?.ok_or(AppError::NotFound)
    }

    async fn enrollment(&self, user_id: &str, course_id: &str) -> Result<Enrollment, AppError> {
        self.db
            .get_enrollment(user_id, course_id)
            .await?
            .ok_or(AppError::NotFound)
    }

    /// Persist the result of `transition` and count it
    async fn transition(
        &self,
        current: &Enrollment,
        transition: Transition,
    ) -> Result<Enrollment, AppError> {
        let next = current.apply(transition)?;
        self.db.update_enrollment(&next).await?;

        ENROLLMENT_TRANSITIONS_TOTAL
            .with_label_values(&[transition.as_str()])
            .inc();
        tracing::info!(
            user_id = %next.user_id,
            course_id = %next.course_id,
            transition = transition.as_str(),
            from = current.status.as_str(),
            to = next.status.as_str(),
            progress = next.progress,
            "Enrollment updated"
        );

        Ok(next)
    }

    /// Register the caller for a course at `registered`/0
    ///
    /// # Errors
    /// `NotFound` for an unknown course, `Conflict` when already registered
    pub async fn register(&self, user: &Session, course_id: &str) -> Result<Enrollment, AppError> {
        user.require(Capability::TrackOwnLearning)?;
        let course = self.course(course_id).await?;

        let inserted = self
            .db
            .insert_enrollment_if_absent(&user.user_id, course_id)
            .await?;
        if !inserted {
            self.notifications
                .notify(
                    &user.user_id,
                    format!("You are already registered for {}.", course.title),
                    NotificationKind::Info,
                )
                .await;
            return Err(AppError::Conflict(format!(
                "already registered for course {course_id}"
            )));
        }

        ENROLLMENT_TRANSITIONS_TOTAL
            .with_label_values(&["register"])
            .inc();
        tracing::info!(user_id = %user.user_id, course_id, "Enrollment created");

        self.notifications
            .notify(
                &user.user_id,
                format!("Congratulations! You are now registered for {}.", course.title),
                NotificationKind::Success,
            )
            .await;
        self.mailer
            .send(
                &user.user_id,
                &user.email,
                &format!("Registration confirmed: {}", course.title),
                &format!(
                    "Hi {}, you are registered for {} with {}.",
                    user.name, course.title, course.instructor
                ),
            )
            .await;

        self.enrollment(&user.user_id, course_id).await
    }

    /// Overwrite the caller's progress for a course
    ///
    /// # Errors
    /// `Validation` outside 0..=100, `NotFound` without an enrollment
    pub async fn set_progress(
        &self,
        user: &Session,
        course_id: &str,
        percent: i64,
    ) -> Result<Enrollment, AppError> {
        user.require(Capability::TrackOwnLearning)?;
        let progress = u8::try_from(percent)
            .ok()
            .filter(|p| *p <= MAX_PROGRESS)
            .ok_or_else(|| {
                AppError::Validation(format!("progress must be between 0 and 100, got {percent}"))
            })?;

        let current = self.enrollment(&user.user_id, course_id).await?;
        self.transition(&current, Transition::SetProgress(progress))
            .await
    }

    /// Ask a reviewer to mark the course completed
    ///
    /// Already completed enrollments are returned unchanged with an info
    /// notification.
    pub async fn request_completion(
        &self,
        user: &Session,
        course_id: &str,
    ) -> Result<Enrollment, AppError> {
        user.require(Capability::TrackOwnLearning)?;
        let course = self.course(course_id).await?;
        let current = self.enrollment(&user.user_id, course_id).await?;

        match current.apply(Transition::RequestCompletion) {
            Err(TransitionError::AlreadyCompleted) => {
                self.notifications
                    .notify(
                        &user.user_id,
                        format!("You have already completed {}.", course.title),
                        NotificationKind::Info,
                    )
                    .await;
                Ok(current)
            }
            Err(error) => Err(error.into()),
            Ok(_) => {
                let next = self
                    .transition(&current, Transition::RequestCompletion)
                    .await?;
                self.notifications
                    .notify(
                        &user.user_id,
                        format!(
                            "Completion request for {} sent. An administrator will review it.",
                            course.title
                        ),
                        NotificationKind::Info,
                    )
                    .await;
                Ok(next)
            }
        }
    }

    /// Approve a pending completion; progress becomes 100
    pub async fn approve_completion(
        &self,
        admin: &Session,
        user_id: &str,
        course_id: &str,
    ) -> Result<Enrollment, AppError> {
        admin.require(Capability::ReviewCompletions)?;
        let course = self.course(course_id).await?;
        let current = self.enrollment(user_id, course_id).await?;
        let next = self.transition(&current, Transition::Approve).await?;

        self.notifications
            .notify(
                user_id,
                format!("Congratulations! You have completed {}.", course.title),
                NotificationKind::Success,
            )
            .await;
        if let Some(student) = self.db.get_profile(user_id).await? {
            self.mailer
                .send(
                    user_id,
                    &student.email,
                    &format!("Course completed: {}", course.title),
                    &format!(
                        "Hi {}, your completion of {} was approved. Your certificate is ready.",
                        student.name, course.title
                    ),
                )
                .await;
        }

        Ok(next)
    }

    /// Send a pending completion back to `registered`; progress is kept
    pub async fn reject_completion(
        &self,
        admin: &Session,
        user_id: &str,
        course_id: &str,
    ) -> Result<Enrollment, AppError> {
        admin.require(Capability::ReviewCompletions)?;
        let course = self.course(course_id).await?;
        let current = self.enrollment(user_id, course_id).await?;
        let next = self.transition(&current, Transition::Reject).await?;

        self.notifications
            .notify(
                user_id,
                format!(
                    "Your completion request for {} was not approved. Keep going and try again.",
                    course.title
                ),
                NotificationKind::Info,
            )
            .await;

        Ok(next)
    }

    /// Certificate data for a completed course
    ///
    /// # Errors
    /// `Conflict` unless the enrollment is completed
    pub async fn certificate(&self, user: &Session, course_id: &str) -> Result<Certificate, AppError> {
        user.require(Capability::TrackOwnLearning)?;
        let enrollment = self.enrollment(&user.user_id, course_id).await?;
        if enrollment.status != EnrollmentStatus::Completed {
            return Err(AppError::Conflict(
                "a certificate is only available for completed courses".to_string(),
            ));
        }

        let course = self.course(course_id).await?;
        let student_name = self
            .db
            .get_profile(&user.user_id)
            .await?
            .map(|profile| profile.name)
            .unwrap_or_else(|| user.name.clone());

        Ok(Certificate {
            student_name,
            course_id: course.id.clone(),
            course_title: course.title.clone(),
            instructor: course.instructor.clone(),
            completed_at: enrollment.updated_at,
            signature_image: self
                .resolver
                .resolve_opt(course.signature_path.as_deref())
                .await,
        })
    }
}
