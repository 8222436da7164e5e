// Wire types for the HTTP surface.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ============================================================================
// Animation
// ============================================================================

#[derive(Serialize, Debug)]
pub struct UploadForAnimationResponse {
    pub avatar_url: String,
    pub audio_url: String,
}

#[derive(Deserialize, Debug)]
pub struct AnimateRequest {
    #[serde(default)]
    pub avatar_url: String,
    #[serde(default)]
    pub audio_url: String,
}

#[derive(Serialize, Debug)]
pub struct AnimateResponse {
    pub talk_id: String,
}

// ============================================================================
// Voice
// ============================================================================

#[derive(Serialize, Debug)]
pub struct CloneVoiceResponse {
    pub voice_id: String,
}

#[derive(Deserialize, Debug)]
pub struct GenerateSpeechRequest {
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub voice_id: String,
}

// ============================================================================
// Storage / video utilities
// ============================================================================

#[derive(Deserialize, Debug)]
pub struct UploadVideoRequest {
    #[serde(default)]
    pub video_url: String,
}

#[derive(Serialize, Debug)]
pub struct UploadVideoResponse {
    pub url: String,
}

#[derive(Serialize, Debug)]
pub struct ExtractFrameResponse {
    pub frame_url: String,
}

#[derive(Deserialize, Debug)]
pub struct GenerateAvatarRequest {
    #[serde(default)]
    pub image_url: String,
}

// ============================================================================
// End-to-end pipeline
// ============================================================================

#[derive(Serialize, Debug)]
pub struct GenerateResponse {
    pub job_id: Uuid,
    pub video_url: String,
}

#[derive(Deserialize, Debug)]
pub struct PromptRequest {
    pub prompt: String,
    #[serde(default)]
    pub dry_run: bool,
}

#[derive(Serialize, Debug)]
pub struct PromptResponse {
    pub job_id: Uuid,
    pub script: String,
    pub image_url: String,
    pub video_url: String,
}

// ============================================================================
// YouTube
// ============================================================================

#[derive(Deserialize, Debug)]
pub struct YouTubeUploadRequest {
    #[serde(default)]
    pub video_url: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub access_token: String,
    #[serde(default)]
    pub dry_run: bool,
}

#[derive(Serialize, Debug)]
pub struct YouTubeUploadResponse {
    pub youtube_url: String,
    pub dry_run: bool,
}
