//! Completion review queue
//!
//! The queue is never stored. It is derived from a fresh snapshot of users
//! and courses every time a reviewer asks for it.

use std::collections::HashMap;
use std::sync::Arc;

use serde::Serialize;

use super::catalog::CatalogService;
use crate::auth::{Capability, Session};
use crate::data::{Course, Database, Enrollment, User};
use crate::error::AppError;

/// One completion request awaiting review
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingRequest {
    pub user: User,
    pub course_id: String,
    pub course: Course,
}

/// Flatten every user's pending set, dropping courses no longer in the catalog
///
/// Output follows user order, then course id order.
pub fn pending_requests(users: &[User], courses: &[Course]) -> Vec<PendingRequest> {
    let by_id: HashMap<&str, &Course> = courses
        .iter()
        .map(|course| (course.id.as_str(), course))
        .collect();

    users
        .iter()
        .flat_map(|user| {
            user.pending_course_ids.iter().filter_map(|course_id| {
                by_id.get(course_id.as_str()).map(|course| PendingRequest {
                    user: user.clone(),
                    course_id: course_id.clone(),
                    course: (*course).clone(),
                })
            })
        })
        .collect()
}

/// Reviewer-facing reads
pub struct ReviewService {
    db: Arc<Database>,
    catalog: CatalogService,
}

impl ReviewService {
    pub fn new(db: Arc<Database>, catalog: CatalogService) -> Self {
        Self { db, catalog }
    }

    /// All users with their derived enrollment sets
    pub async fn users(&self, admin: &Session) -> Result<Vec<User>, AppError> {
        admin.require(Capability::ReviewCompletions)?;
        self.snapshot_users().await
    }

    /// Pending completion requests across all users
    pub async fn queue(&self, admin: &Session) -> Result<Vec<PendingRequest>, AppError> {
        admin.require(Capability::ReviewCompletions)?;

        let (users, courses) = tokio::try_join!(self.snapshot_users(), self.catalog.list_courses())?;
        let requests = pending_requests(&users, &courses);
        tracing::debug!(pending = requests.len(), "Review queue derived");

        Ok(requests)
    }

    async fn snapshot_users(&self) -> Result<Vec<User>, AppError> {
        let (profiles, enrollments) =
            tokio::try_join!(self.db.list_profiles(), self.db.list_enrollments())?;

        let mut by_user: HashMap<&str, Vec<Enrollment>> = HashMap::new();
        for enrollment in &enrollments {
            by_user
                .entry(enrollment.user_id.as_str())
                .or_default()
                .push(enrollment.clone());
        }

        Ok(profiles
            .iter()
            .map(|profile| {
                let own = by_user
                    .get(profile.id.as_str())
                    .map(Vec::as_slice)
                    .unwrap_or_default();
                User::from_parts(profile, own)
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{Level, Role};
    use crate::service::test_support::{TestContext, seed_course};
    use std::collections::{BTreeMap, BTreeSet};

    fn user(id: &str, pending: &[&str]) -> User {
        let pending: BTreeSet<String> = pending.iter().map(|id| id.to_string()).collect();
        User {
            id: id.to_string(),
            name: id.to_string(),
            email: format!("{id}@inst.example"),
            role: Role::Student,
            registered_course_ids: pending.clone(),
            pending_course_ids: pending,
            completed_course_ids: BTreeSet::new(),
            course_progress: BTreeMap::new(),
        }
    }

    fn course(id: &str) -> Course {
        Course {
            id: id.to_string(),
            title: format!("Course {id}"),
            description: String::new(),
            outline: None,
            instructor: "Ada".to_string(),
            instructor_bio: None,
            duration: String::new(),
            level: Level::Beginner,
            price: 0.0,
            tags: Vec::new(),
            image: None,
            image_path: None,
            signature_image: None,
            signature_path: None,
        }
    }

    #[test]
    fn flattens_in_user_then_course_order() {
        let users = vec![user("u2", &["c2", "c1"]), user("u1", &["c1"])];
        let courses = vec![course("c1"), course("c2")];

        let queue = pending_requests(&users, &courses);
        let pairs: Vec<(&str, &str)> = queue
            .iter()
            .map(|r| (r.user.id.as_str(), r.course_id.as_str()))
            .collect();
        assert_eq!(pairs, vec![("u2", "c1"), ("u2", "c2"), ("u1", "c1")]);
        assert_eq!(queue[0].course.title, "Course c1");
    }

    #[test]
    fn drops_requests_for_deleted_courses() {
        let users = vec![user("u1", &["c1", "gone"])];
        let queue = pending_requests(&users, &[course("c1")]);

        assert_eq!(queue.len(), 1);
        assert!(queue.iter().all(|r| r.course_id != "gone"));
    }

    #[test]
    fn empty_inputs_give_empty_queue() {
        assert!(pending_requests(&[], &[course("c1")]).is_empty());
        assert!(pending_requests(&[user("u1", &["c1"])], &[]).is_empty());
    }

    #[tokio::test]
    async fn queue_reflects_stored_enrollments() {
        let ctx = TestContext::new().await;
        seed_course(&ctx.db, "c1", "Intro").await;
        let student = ctx.student("student@inst.example").await;
        let admin = ctx.admin().await;
        let enrollments = ctx.enrollments();

        enrollments.register(&student, "c1").await.unwrap();
        assert!(ctx.reviews().queue(&admin).await.unwrap().is_empty());

        enrollments.request_completion(&student, "c1").await.unwrap();
        let queue = ctx.reviews().queue(&admin).await.unwrap();
        assert_eq!(queue.len(), 1);
        assert_eq!(queue[0].user.id, student.user_id);
        assert_eq!(queue[0].course_id, "c1");

        assert!(matches!(
            ctx.reviews().queue(&student).await,
            Err(AppError::Forbidden)
        ));
    }
}
