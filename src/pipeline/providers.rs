// Adapter traits for every external capability the pipeline touches.
//
// Each adapter is stateless and reached through a narrow request/response
// contract, so every one of them can be replaced with a test double. The
// concrete implementations live in the `*_client` modules.

use crate::error::PipelineError;
use crate::job_store::JobStore;
use async_trait::async_trait;
use std::sync::Arc;

/// Output of the script generator: narration text plus a visual
/// description for the avatar image.
#[derive(Debug, Clone, PartialEq)]
pub struct GeneratedScript {
    pub script: String,
    pub avatar_description: String,
}

/// Terminal or in-progress state of an animation render.
#[derive(Debug, Clone, PartialEq)]
pub enum TalkStatus {
    Pending,
    Done { result_url: String },
    Error { message: String },
}

#[async_trait]
pub trait GenerateScript: Send + Sync {
    async fn generate(&self, prompt: &str) -> Result<GeneratedScript, PipelineError>;
}

#[async_trait]
pub trait RenderAvatar: Send + Sync {
    /// Produce avatar image bytes from a visual description.
    async fn render(&self, description: &str) -> Result<Vec<u8>, PipelineError>;
}

#[async_trait]
pub trait SynthesizeSpeech: Send + Sync {
    /// Synthesize speech audio for `text` with the given voice reference.
    async fn synthesize(&self, text: &str, voice_id: &str) -> Result<Vec<u8>, PipelineError>;
}

#[async_trait]
pub trait AnimateTalk: Send + Sync {
    /// Submit an animation render; returns the opaque talk id.
    async fn submit(&self, avatar_url: &str, audio_url: &str) -> Result<String, PipelineError>;

    /// Look up the current render status for a talk id.
    async fn status(&self, talk_id: &str) -> Result<TalkStatus, PipelineError>;
}

#[async_trait]
pub trait PublishVideo: Send + Sync {
    /// Re-host an ephemeral provider URL to durable storage.
    async fn publish(&self, video_url: &str) -> Result<String, PipelineError>;
}

#[async_trait]
pub trait HostMedia: Send + Sync {
    /// Persist bytes to a transient public location and return its URL.
    async fn host(&self, bytes: Vec<u8>, content_type: &str) -> Result<String, PipelineError>;
}

/// The full set of collaborators the pipeline sequences. Constructed once
/// at startup and passed by reference; never global state.
#[derive(Clone)]
pub struct Providers {
    pub script: Arc<dyn GenerateScript>,
    pub avatar: Arc<dyn RenderAvatar>,
    pub speech: Arc<dyn SynthesizeSpeech>,
    pub animator: Arc<dyn AnimateTalk>,
    pub publisher: Arc<dyn PublishVideo>,
    pub media: Arc<dyn HostMedia>,
    pub store: Arc<dyn JobStore>,
}
