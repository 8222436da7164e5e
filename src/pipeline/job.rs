// Job record and its status state machine.
//
// A job is created at request entry, mutated only by the pipeline as each
// stage completes, and persisted exactly once in a terminal state.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// How the job entered the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobMode {
    /// Caller supplied a finished script and an avatar image.
    Direct,
    /// Caller supplied a single prompt; script and avatar are generated.
    Prompt,
}

/// Monotonic status sequence. No backward transitions; `Published` and
/// `Failed` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Created,
    ScriptReady,
    VoiceReady,
    AnimationPending,
    AnimationDone,
    Published,
    Failed,
}

/// The six pipeline stages, named in `failure_reason` when one aborts the
/// run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    ScriptGeneration,
    AvatarRender,
    VoiceSynthesis,
    AnimationSubmit,
    AnimationRender,
    Publish,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::ScriptGeneration => "script_generation",
            Stage::AvatarRender => "avatar_render",
            Stage::VoiceSynthesis => "voice_synthesis",
            Stage::AnimationSubmit => "animation_submit",
            Stage::AnimationRender => "animation_render",
            Stage::Publish => "publish",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    pub id: Uuid,
    pub mode: JobMode,
    pub prompt: Option<String>,
    pub script: Option<String>,
    pub avatar_description: Option<String>,
    pub image_url: Option<String>,
    pub audio_url: Option<String>,
    pub talk_id: Option<String>,
    pub video_url: Option<String>,
    pub status: JobStatus,
    pub failure_reason: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Job {
    pub fn new(mode: JobMode) -> Self {
        Job {
            id: Uuid::new_v4(),
            mode,
            prompt: None,
            script: None,
            avatar_description: None,
            image_url: None,
            audio_url: None,
            talk_id: None,
            video_url: None,
            status: JobStatus::Created,
            failure_reason: None,
            created_at: Utc::now(),
        }
    }

    /// Advance the status. Transitions are forward-only; a stale transition
    /// is a pipeline bug and is logged rather than applied.
    pub fn advance(&mut self, status: JobStatus) {
        if status <= self.status {
            tracing::warn!(
                job_id = %self.id,
                from = ?self.status,
                to = ?status,
                "ignoring backward status transition"
            );
            return;
        }
        self.status = status;
    }

    /// Mark the job published with its durable video URL.
    pub fn publish(&mut self, video_url: String) {
        self.video_url = Some(video_url);
        self.advance(JobStatus::Published);
    }

    /// Mark the job failed, recording which stage aborted the run.
    pub fn fail(&mut self, stage: Stage, message: &str) {
        self.failure_reason = Some(format!("{}: {}", stage, message));
        self.status = JobStatus::Failed;
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self.status, JobStatus::Published | JobStatus::Failed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_is_monotonic() {
        let mut job = Job::new(JobMode::Direct);
        job.advance(JobStatus::VoiceReady);
        job.advance(JobStatus::ScriptReady); // ignored, backward
        assert_eq!(job.status, JobStatus::VoiceReady);
    }

    #[test]
    fn published_sets_video_url() {
        let mut job = Job::new(JobMode::Direct);
        job.publish("https://cdn.example/v.mp4".to_string());
        assert_eq!(job.status, JobStatus::Published);
        assert_eq!(job.video_url.as_deref(), Some("https://cdn.example/v.mp4"));
        assert!(job.failure_reason.is_none());
        assert!(job.is_terminal());
    }

    #[test]
    fn failed_names_the_stage() {
        let mut job = Job::new(JobMode::Prompt);
        job.fail(Stage::VoiceSynthesis, "fish-audio: (401) invalid api key");
        assert_eq!(job.status, JobStatus::Failed);
        assert_eq!(
            job.failure_reason.as_deref(),
            Some("voice_synthesis: fish-audio: (401) invalid api key")
        );
        assert!(job.video_url.is_none());
    }

    #[test]
    fn new_jobs_get_distinct_ids() {
        let a = Job::new(JobMode::Direct);
        let b = Job::new(JobMode::Direct);
        assert_ne!(a.id, b.id);
    }
}
