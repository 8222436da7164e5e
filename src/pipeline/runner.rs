// Sequences the pipeline stages for one job: each stage is strictly gated
// on the previous stage's success, no stage is retried, and the first
// failure aborts the run. The terminal record is persisted either way.

use crate::error::PipelineError;
use crate::pipeline::job::{Job, JobMode, JobStatus, Stage};
use crate::pipeline::poller::{self, PollPolicy};
use crate::pipeline::providers::Providers;

/// Caller input for one pipeline invocation.
pub enum JobRequest {
    /// Script and avatar image supplied by the caller; script generation
    /// and avatar rendering are skipped.
    Direct {
        script: String,
        avatar: Vec<u8>,
        avatar_content_type: String,
        voice_id: Option<String>,
    },
    /// Single prompt; script and avatar are generated first.
    Prompt { prompt: String },
}

pub struct Pipeline {
    providers: Providers,
    poll: PollPolicy,
}

impl Pipeline {
    pub fn new(providers: Providers, poll: PollPolicy) -> Self {
        Pipeline { providers, poll }
    }

    /// Run one job to a terminal state. On failure the job record is
    /// persisted with `status = failed` before the error is returned.
    pub async fn run(&self, request: JobRequest, dry_run: bool) -> Result<Job, PipelineError> {
        let mode = match request {
            JobRequest::Direct { .. } => JobMode::Direct,
            JobRequest::Prompt { .. } => JobMode::Prompt,
        };
        let mut job = Job::new(mode);
        tracing::info!(job_id = %job.id, ?mode, dry_run, "starting pipeline");

        if dry_run {
            return Ok(self.dry_run(job, &request).await);
        }

        // Stages 1-2: script + avatar image, or the caller's own.
        match request {
            JobRequest::Prompt { ref prompt } => {
                job.prompt = Some(prompt.clone());

                let generated = match self.providers.script.generate(prompt).await {
                    Ok(g) => g,
                    Err(e) => return Err(self.abort(job, Stage::ScriptGeneration, e).await),
                };
                job.script = Some(generated.script);
                job.avatar_description = Some(generated.avatar_description.clone());
                job.advance(JobStatus::ScriptReady);

                let image = match self.providers.avatar.render(&generated.avatar_description).await {
                    Ok(bytes) => bytes,
                    Err(e) => return Err(self.abort(job, Stage::AvatarRender, e).await),
                };
                match self.providers.media.host(image, "image/jpeg").await {
                    Ok(url) => job.image_url = Some(url),
                    Err(e) => return Err(self.abort(job, Stage::AvatarRender, e).await),
                }
            }
            JobRequest::Direct {
                ref script,
                ref avatar,
                ref avatar_content_type,
                ..
            } => {
                if script.trim().is_empty() {
                    let e = PipelineError::invalid("script must not be empty");
                    return Err(self.abort(job, Stage::VoiceSynthesis, e).await);
                }
                job.script = Some(script.clone());
                job.advance(JobStatus::ScriptReady);

                match self
                    .providers
                    .media
                    .host(avatar.clone(), avatar_content_type)
                    .await
                {
                    Ok(url) => job.image_url = Some(url),
                    Err(e) => return Err(self.abort(job, Stage::AvatarRender, e).await),
                }
            }
        }

        // Stage 3: speech synthesis, hosted for the animator.
        let script = job.script.clone().unwrap_or_default();
        let voice_id = match &request {
            JobRequest::Direct { voice_id: Some(v), .. } => v.clone(),
            _ => job.id.to_string(),
        };
        let audio = match self.providers.speech.synthesize(&script, &voice_id).await {
            Ok(bytes) => bytes,
            Err(e) => return Err(self.abort(job, Stage::VoiceSynthesis, e).await),
        };
        match self.providers.media.host(audio, "audio/mpeg").await {
            Ok(url) => job.audio_url = Some(url),
            Err(e) => return Err(self.abort(job, Stage::VoiceSynthesis, e).await),
        }
        job.advance(JobStatus::VoiceReady);

        // Stage 4: submit the animation render.
        let image_url = job.image_url.clone().unwrap_or_default();
        let audio_url = job.audio_url.clone().unwrap_or_default();
        let talk_id = match self.providers.animator.submit(&image_url, &audio_url).await {
            Ok(id) => id,
            Err(e) => return Err(self.abort(job, Stage::AnimationSubmit, e).await),
        };
        job.talk_id = Some(talk_id.clone());
        job.advance(JobStatus::AnimationPending);

        // Stage 5: poll until the render is terminal.
        let ephemeral_url =
            match poller::poll_until_terminal(self.providers.animator.as_ref(), &talk_id, self.poll)
                .await
            {
                Ok(url) => url,
                Err(e) => return Err(self.abort(job, Stage::AnimationRender, e).await),
            };
        job.advance(JobStatus::AnimationDone);

        // Stage 6: re-host the ephemeral render to durable storage.
        let final_url = match self.providers.publisher.publish(&ephemeral_url).await {
            Ok(url) => url,
            Err(e) => return Err(self.abort(job, Stage::Publish, e).await),
        };
        job.publish(final_url);

        // Stage 7: bookkeeping. Never fails the pipeline.
        self.providers.store.save(&job).await;
        tracing::info!(job_id = %job.id, video_url = ?job.video_url, "pipeline published");
        Ok(job)
    }

    /// Bypass every adapter and synthesize deterministic mock artifacts
    /// from the job id. Bookkeeping still records a published job.
    async fn dry_run(&self, mut job: Job, request: &JobRequest) -> Job {
        if let JobRequest::Prompt { prompt } = request {
            job.prompt = Some(prompt.clone());
            job.script = Some(format!("This is a mock script for: {}", prompt));
            job.avatar_description = Some(format!("A mock avatar for: {}", prompt));
            job.image_url = Some(format!("https://mock.cdn/image/{}.jpg", job.id));
        } else if let JobRequest::Direct { script, .. } = request {
            job.script = Some(script.clone());
        }
        job.publish(format!("https://mock.cdn/video/{}.mp4", job.id));
        self.providers.store.save(&job).await;
        tracing::info!(job_id = %job.id, "dry run complete, no providers called");
        job
    }

    /// Record the failing stage, persist the failed job, and hand the
    /// adapter's error back to the caller.
    async fn abort(&self, mut job: Job, stage: Stage, err: PipelineError) -> PipelineError {
        tracing::error!(job_id = %job.id, %stage, error = %err, "pipeline stage failed");
        job.fail(stage, &err.to_string());
        self.providers.store.save(&job).await;
        err
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::job_store::MemoryStore;
    use crate::pipeline::providers::{
        AnimateTalk, GenerateScript, GeneratedScript, HostMedia, PublishVideo, RenderAvatar,
        SynthesizeSpeech, TalkStatus,
    };
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    #[derive(Default)]
    struct Calls {
        script: AtomicUsize,
        avatar: AtomicUsize,
        speech: AtomicUsize,
        submit: AtomicUsize,
        status: AtomicUsize,
        publish: AtomicUsize,
        host: AtomicUsize,
    }

    struct MockProviders {
        calls: Arc<Calls>,
        fail_speech: AtomicBool,
        never_render: AtomicBool,
    }

    impl MockProviders {
        fn new(calls: Arc<Calls>) -> Self {
            MockProviders {
                calls,
                fail_speech: AtomicBool::new(false),
                never_render: AtomicBool::new(false),
            }
        }
    }

    #[async_trait]
    impl GenerateScript for MockProviders {
        async fn generate(&self, prompt: &str) -> Result<GeneratedScript, PipelineError> {
            self.calls.script.fetch_add(1, Ordering::SeqCst);
            Ok(GeneratedScript {
                script: format!("script for {}", prompt),
                avatar_description: format!("avatar for {}", prompt),
            })
        }
    }

    #[async_trait]
    impl RenderAvatar for MockProviders {
        async fn render(&self, _: &str) -> Result<Vec<u8>, PipelineError> {
            self.calls.avatar.fetch_add(1, Ordering::SeqCst);
            Ok(vec![0xff, 0xd8])
        }
    }

    #[async_trait]
    impl SynthesizeSpeech for MockProviders {
        async fn synthesize(&self, _: &str, _: &str) -> Result<Vec<u8>, PipelineError> {
            self.calls.speech.fetch_add(1, Ordering::SeqCst);
            if self.fail_speech.load(Ordering::SeqCst) {
                return Err(PipelineError::upstream("fish-audio", Some(500), "tts blew up"));
            }
            Ok(vec![0x49, 0x44, 0x33])
        }
    }

    #[async_trait]
    impl AnimateTalk for MockProviders {
        async fn submit(&self, _: &str, _: &str) -> Result<String, PipelineError> {
            self.calls.submit.fetch_add(1, Ordering::SeqCst);
            Ok("T1".to_string())
        }

        async fn status(&self, _: &str) -> Result<TalkStatus, PipelineError> {
            self.calls.status.fetch_add(1, Ordering::SeqCst);
            if self.never_render.load(Ordering::SeqCst) {
                return Ok(TalkStatus::Pending);
            }
            Ok(TalkStatus::Done {
                result_url: "https://d-id.example/ephemeral.mp4".to_string(),
            })
        }
    }

    #[async_trait]
    impl PublishVideo for MockProviders {
        async fn publish(&self, _: &str) -> Result<String, PipelineError> {
            self.calls.publish.fetch_add(1, Ordering::SeqCst);
            Ok("https://cdn.example/final.mp4".to_string())
        }
    }

    #[async_trait]
    impl HostMedia for MockProviders {
        async fn host(&self, _: Vec<u8>, _: &str) -> Result<String, PipelineError> {
            self.calls.host.fetch_add(1, Ordering::SeqCst);
            Ok("https://tmp.example/file".to_string())
        }
    }

    fn pipeline_with(
        mocks: Arc<MockProviders>,
        store: Arc<MemoryStore>,
    ) -> Pipeline {
        let providers = Providers {
            script: mocks.clone(),
            avatar: mocks.clone(),
            speech: mocks.clone(),
            animator: mocks.clone(),
            publisher: mocks.clone(),
            media: mocks,
            store,
        };
        let poll = PollPolicy {
            interval: Duration::from_millis(1),
            max_wait: Duration::from_millis(20),
        };
        Pipeline::new(providers, poll)
    }

    fn direct_request() -> JobRequest {
        JobRequest::Direct {
            script: "Hello world".to_string(),
            avatar: vec![0xff, 0xd8],
            avatar_content_type: "image/jpeg".to_string(),
            voice_id: None,
        }
    }

    #[tokio::test]
    async fn direct_mode_publishes_and_persists() {
        let calls = Arc::new(Calls::default());
        let mocks = Arc::new(MockProviders::new(calls.clone()));
        let store = Arc::new(MemoryStore::new());
        let pipeline = pipeline_with(mocks, store.clone());

        let job = pipeline.run(direct_request(), false).await.unwrap();
        assert_eq!(job.status, JobStatus::Published);
        assert_eq!(job.video_url.as_deref(), Some("https://cdn.example/final.mp4"));
        assert!(job.failure_reason.is_none());
        // Direct mode never generates a script or renders an avatar.
        assert_eq!(calls.script.load(Ordering::SeqCst), 0);
        assert_eq!(calls.avatar.load(Ordering::SeqCst), 0);

        let saved = store.get(job.id).unwrap();
        assert_eq!(saved.status, JobStatus::Published);
    }

    #[tokio::test]
    async fn prompt_mode_runs_generation_stages_first() {
        let calls = Arc::new(Calls::default());
        let mocks = Arc::new(MockProviders::new(calls.clone()));
        let store = Arc::new(MemoryStore::new());
        let pipeline = pipeline_with(mocks, store);

        let job = pipeline
            .run(
                JobRequest::Prompt {
                    prompt: "a calm narrator".to_string(),
                },
                false,
            )
            .await
            .unwrap();

        assert_eq!(job.status, JobStatus::Published);
        assert_eq!(job.script.as_deref(), Some("script for a calm narrator"));
        assert_eq!(calls.script.load(Ordering::SeqCst), 1);
        assert_eq!(calls.avatar.load(Ordering::SeqCst), 1);
        // avatar image + audio both hosted
        assert_eq!(calls.host.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn voice_failure_gates_the_animator() {
        let calls = Arc::new(Calls::default());
        let mocks = Arc::new(MockProviders::new(calls.clone()));
        mocks.fail_speech.store(true, Ordering::SeqCst);
        let store = Arc::new(MemoryStore::new());
        let pipeline = pipeline_with(mocks, store.clone());

        let err = pipeline.run(direct_request(), false).await.unwrap_err();
        assert!(matches!(err, PipelineError::Upstream { .. }));
        assert_eq!(calls.submit.load(Ordering::SeqCst), 0);
        assert_eq!(calls.status.load(Ordering::SeqCst), 0);
        assert_eq!(calls.publish.load(Ordering::SeqCst), 0);

        let saved = store.all().pop().unwrap();
        assert_eq!(saved.status, JobStatus::Failed);
        assert!(saved
            .failure_reason
            .as_deref()
            .unwrap()
            .starts_with("voice_synthesis:"));
    }

    #[tokio::test]
    async fn stuck_render_fails_with_animation_stage() {
        let calls = Arc::new(Calls::default());
        let mocks = Arc::new(MockProviders::new(calls.clone()));
        mocks.never_render.store(true, Ordering::SeqCst);
        let store = Arc::new(MemoryStore::new());
        let pipeline = pipeline_with(mocks, store.clone());

        let err = pipeline.run(direct_request(), false).await.unwrap_err();
        assert!(matches!(err, PipelineError::Timeout { .. }));
        // Publishing never happens past the failed stage.
        assert_eq!(calls.publish.load(Ordering::SeqCst), 0);

        let saved = store.all().pop().unwrap();
        assert!(saved
            .failure_reason
            .as_deref()
            .unwrap()
            .starts_with("animation_render:"));
    }

    #[tokio::test]
    async fn dry_run_calls_no_provider_and_is_deterministic() {
        let calls = Arc::new(Calls::default());
        let mocks = Arc::new(MockProviders::new(calls.clone()));
        let store = Arc::new(MemoryStore::new());
        let pipeline = pipeline_with(mocks, store.clone());

        let job = pipeline.run(direct_request(), true).await.unwrap();
        assert_eq!(
            job.video_url.as_deref(),
            Some(format!("https://mock.cdn/video/{}.mp4", job.id).as_str())
        );
        assert_eq!(calls.script.load(Ordering::SeqCst), 0);
        assert_eq!(calls.speech.load(Ordering::SeqCst), 0);
        assert_eq!(calls.submit.load(Ordering::SeqCst), 0);
        assert_eq!(calls.publish.load(Ordering::SeqCst), 0);
        assert_eq!(calls.host.load(Ordering::SeqCst), 0);
        // Dry runs still record a published job.
        assert_eq!(store.get(job.id).unwrap().status, JobStatus::Published);
    }

    #[tokio::test]
    async fn two_runs_never_share_an_id() {
        let calls = Arc::new(Calls::default());
        let mocks = Arc::new(MockProviders::new(calls));
        let store = Arc::new(MemoryStore::new());
        let pipeline = pipeline_with(mocks, store);

        let a = pipeline.run(direct_request(), true).await.unwrap();
        let b = pipeline.run(direct_request(), true).await.unwrap();
        assert_ne!(a.id, b.id);
    }

    #[tokio::test]
    async fn empty_script_is_rejected_before_any_provider() {
        let calls = Arc::new(Calls::default());
        let mocks = Arc::new(MockProviders::new(calls.clone()));
        let store = Arc::new(MemoryStore::new());
        let pipeline = pipeline_with(mocks, store);

        let request = JobRequest::Direct {
            script: "   ".to_string(),
            avatar: vec![],
            avatar_content_type: "image/jpeg".to_string(),
            voice_id: None,
        };
        let err = pipeline.run(request, false).await.unwrap_err();
        assert!(matches!(err, PipelineError::InvalidInput(_)));
        assert_eq!(calls.speech.load(Ordering::SeqCst), 0);
        assert_eq!(calls.host.load(Ordering::SeqCst), 0);
    }
}
