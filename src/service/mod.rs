//! Service layer
//!
//! Contains business logic separated from HTTP handlers.
//! Services check capabilities, talk to the database and object store, and
//! push notifications.

mod account;
mod assets;
mod catalog;
mod enrollment;
mod home;
mod notify;
mod review;
mod videos;

pub use account::{AccountService, SignUpInput, SignedIn};
pub use assets::{AssetService, CourseAsset, StoredAsset, UploadedFile};
pub use catalog::{CatalogService, CourseInput};
pub use enrollment::{Certificate, EnrollmentService, Transition, TransitionError};
pub use home::{HomeContentInput, HomePage, HomeService};
pub use notify::{Mailer, Notification, NotificationBus, NotificationKind};
pub use review::{PendingRequest, ReviewService, pending_requests};
pub use videos::VideoService;

#[cfg(test)]
pub(crate) mod test_support {
    use std::sync::Arc;
    use std::time::Duration;

    use chrono::Utc;
    use tempfile::TempDir;

    use super::*;
    use crate::auth::{RateLimiter, Session};
    use crate::config::tests::valid_config;
    use crate::data::{CourseRow, Database, EntityId, Level, Profile, Role};
    use crate::storage::{AssetResolver, MockObjectStore, ObjectStore, UploadLimits};

    /// Temp database plus the shared pieces services are built from
    pub(crate) struct TestContext {
        pub db: Arc<Database>,
        pub store: Arc<dyn ObjectStore>,
        pub notifications: Arc<NotificationBus>,
        _temp_dir: TempDir,
    }

    impl TestContext {
        pub async fn new() -> Self {
            Self::with_store(MockObjectStore::new()).await
        }

        pub async fn with_store(store: MockObjectStore) -> Self {
            let temp_dir = TempDir::new().unwrap();
            let db = Database::connect(&temp_dir.path().join("test.db"))
                .await
                .unwrap();
            Self {
                db: Arc::new(db),
                store: Arc::new(store),
                notifications: Arc::new(NotificationBus::new(Duration::from_secs(600))),
                _temp_dir: temp_dir,
            }
        }

        pub fn resolver(&self) -> AssetResolver {
            AssetResolver::new(Arc::clone(&self.store), Duration::from_secs(86_400))
        }

        pub fn enrollments(&self) -> EnrollmentService {
            EnrollmentService::new(
                Arc::clone(&self.db),
                self.resolver(),
                Arc::clone(&self.notifications),
                Mailer::new(Arc::clone(&self.notifications)),
            )
        }

        pub fn catalog(&self) -> CatalogService {
            CatalogService::new(Arc::clone(&self.db), Arc::clone(&self.store), self.resolver())
        }

        pub fn reviews(&self) -> ReviewService {
            ReviewService::new(Arc::clone(&self.db), self.catalog())
        }

        pub fn home(&self) -> HomeService {
            HomeService::new(Arc::clone(&self.db), self.resolver(), self.assets())
        }

        pub fn assets(&self) -> AssetService {
            AssetService::new(
                Arc::clone(&self.db),
                Arc::clone(&self.store),
                self.resolver(),
                UploadLimits::default(),
            )
        }

        pub fn videos(&self) -> VideoService {
            VideoService::new(
                Arc::clone(&self.db),
                Arc::clone(&self.store),
                self.resolver(),
                self.assets(),
            )
        }

        pub fn accounts(&self) -> AccountService {
            let config = valid_config();
            let limiter = RateLimiter::new(
                config.auth.sign_in_max_attempts,
                Duration::from_secs(config.auth.sign_in_window_seconds),
            );
            AccountService::new(Arc::clone(&self.db), Arc::new(config), Arc::new(limiter))
        }

        async fn session(&self, email: &str, role: Role) -> Session {
            let name = email.split('@').next().unwrap_or(email).to_string();
            let profile = Profile {
                id: EntityId::new().0,
                email: email.to_string(),
                name,
                role: role.as_str().to_string(),
                password_hash: String::new(),
                created_at: Utc::now(),
                updated_at: Utc::now(),
            };
            self.db.insert_profile(&profile).await.unwrap();
            Session::for_profile(&profile, role, 3600)
        }

        pub async fn student(&self, email: &str) -> Session {
            self.session(email, Role::Student).await
        }

        pub async fn admin(&self) -> Session {
            self.session("admin@inst.example", Role::Admin).await
        }
    }

    pub(crate) async fn seed_course(db: &Database, id: &str, title: &str) {
        let now = Utc::now();
        db.upsert_course(&CourseRow {
            id: id.to_string(),
            title: title.to_string(),
            description: String::new(),
            outline: None,
            instructor: "Ada".to_string(),
            instructor_bio: None,
            duration: "4 weeks".to_string(),
            level: Level::Beginner.as_str().to_string(),
            price: 0.0,
            tags: "[]".to_string(),
            image: None,
            image_path: None,
            signature_path: None,
            created_at: now,
            updated_at: now,
        })
        .await
        .unwrap();
    }
}
