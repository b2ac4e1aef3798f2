//! Capability policy
//!
//! The single place that decides what each role may do. Handlers ask for a
//! capability once per operation instead of comparing roles inline.

use crate::data::Role;

/// An operation class that needs authorization
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Capability {
    /// Create, edit and delete courses and their assets
    ManageCatalog,
    /// Edit landing page content
    ManageSiteContent,
    /// Upload and delete library videos
    ManageVideos,
    /// Approve or reject completion requests, list users
    ReviewCompletions,
    /// Read Prometheus metrics
    ViewMetrics,
    /// Chat and video generation
    UseAssistant,
    /// Register, update progress, request completion for oneself
    TrackOwnLearning,
}

impl Role {
    /// Policy table
    pub fn grants(&self, capability: Capability) -> bool {
        match capability {
            Capability::TrackOwnLearning | Capability::UseAssistant => true,
            Capability::ManageCatalog
            | Capability::ManageSiteContent
            | Capability::ManageVideos
            | Capability::ReviewCompletions
            | Capability::ViewMetrics => *self == Role::Admin,
        }
    }
}
