//! Agent backend transport
//!
//! [`AgentBackend`] is the seam between the session controller and the remote
//! agent: one call per backend operation, no shared state beyond network I/O.
//! [`client::AgentTransport`] is the HTTP implementation.

pub mod client;

pub use client::AgentTransport;

use crate::protocol::{HealthHistory, Medication, ResponseEnvelope, Turn, UserProfile};
use crate::Result;
use async_trait::async_trait;

/// Operations the remote agent backend exposes to this client
#[async_trait]
pub trait AgentBackend: Send + Sync {
    /// Send one user turn and parse the structured response envelope
    async fn send_turn(&self, turn: &Turn) -> Result<ResponseEnvelope>;

    /// Synthesize speech for the given text, returning raw audio bytes
    async fn synthesize_speech(&self, text: &str, voice: &str) -> Result<Vec<u8>>;

    /// Fetch the user profile (agent config plus body measurements)
    async fn fetch_profile(&self) -> Result<UserProfile>;

    /// Fetch the medication list
    async fn fetch_medications(&self) -> Result<Vec<Medication>>;

    /// Fetch the most recent health samples, newest first
    async fn fetch_health_history(&self, limit: u32) -> Result<HealthHistory>;
}
