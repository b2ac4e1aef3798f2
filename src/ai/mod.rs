//! AI assistant
//!
//! Handles:
//! - Chat completion against the generative model API
//! - Video generation jobs with bounded, cancellable polling

mod client;
mod jobs;

pub use client::{
    ChatMessage, ChatRole, GeminiClient, OperationStatus, VideoConfig, VideoOperations,
};
pub use jobs::{
    CancellationToken, PollPolicy, VideoJob, VideoJobStatus, VideoJobs, poll_until_done,
};

#[cfg(test)]
pub use client::MockVideoOperations;
