// Animation poller: query the render status at a fixed interval until it
// reaches a terminal state, bounded by a maximum wait.
//
// A failed status lookup is terminal for the job; nothing here retries.

use crate::error::PipelineError;
use crate::pipeline::providers::{AnimateTalk, TalkStatus};
use std::time::Duration;
use tokio::time::Instant;

#[derive(Debug, Clone, Copy)]
pub struct PollPolicy {
    pub interval: Duration,
    pub max_wait: Duration,
}

impl Default for PollPolicy {
    fn default() -> Self {
        // D-ID renders short talks in well under two minutes.
        PollPolicy {
            interval: Duration::from_secs(3),
            max_wait: Duration::from_secs(120),
        }
    }
}

/// Poll `animator` for `talk_id` until the render is done or errored.
/// Returns the provider-hosted result URL on success.
pub async fn poll_until_terminal(
    animator: &dyn AnimateTalk,
    talk_id: &str,
    policy: PollPolicy,
) -> Result<String, PipelineError> {
    let start = Instant::now();

    loop {
        match animator.status(talk_id).await? {
            TalkStatus::Done { result_url } => return Ok(result_url),
            TalkStatus::Error { message } => {
                return Err(PipelineError::upstream("d-id", None, message));
            }
            TalkStatus::Pending => {}
        }

        let waited = start.elapsed();
        if waited >= policy.max_wait {
            tracing::warn!(talk_id, ?waited, "animation polling exceeded its bound");
            return Err(PipelineError::Timeout { waited });
        }

        tokio::time::sleep(policy.interval).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Status source that stays pending until the Nth query.
    struct DoneOnNth {
        n: usize,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl AnimateTalk for DoneOnNth {
        async fn submit(&self, _: &str, _: &str) -> Result<String, PipelineError> {
            unreachable!("poller never submits")
        }

        async fn status(&self, _: &str) -> Result<TalkStatus, PipelineError> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            if call >= self.n {
                Ok(TalkStatus::Done {
                    result_url: "https://d-id.example/result.mp4".to_string(),
                })
            } else {
                Ok(TalkStatus::Pending)
            }
        }
    }

    struct NeverDone;

    #[async_trait]
    impl AnimateTalk for NeverDone {
        async fn submit(&self, _: &str, _: &str) -> Result<String, PipelineError> {
            unreachable!()
        }

        async fn status(&self, _: &str) -> Result<TalkStatus, PipelineError> {
            Ok(TalkStatus::Pending)
        }
    }

    struct AlwaysErrored;

    #[async_trait]
    impl AnimateTalk for AlwaysErrored {
        async fn submit(&self, _: &str, _: &str) -> Result<String, PipelineError> {
            unreachable!()
        }

        async fn status(&self, _: &str) -> Result<TalkStatus, PipelineError> {
            Ok(TalkStatus::Error {
                message: "render rejected".to_string(),
            })
        }
    }

    fn fast_policy() -> PollPolicy {
        PollPolicy {
            interval: Duration::from_millis(1),
            max_wait: Duration::from_millis(50),
        }
    }

    #[tokio::test]
    async fn issues_exactly_n_queries_when_done_on_nth() {
        let source = DoneOnNth {
            n: 4,
            calls: AtomicUsize::new(0),
        };
        let url = poll_until_terminal(&source, "T1", fast_policy()).await.unwrap();
        assert_eq!(url, "https://d-id.example/result.mp4");
        assert_eq!(source.calls.load(Ordering::SeqCst), 4);
    }

    #[tokio::test]
    async fn first_query_can_terminate() {
        let source = DoneOnNth {
            n: 1,
            calls: AtomicUsize::new(0),
        };
        poll_until_terminal(&source, "T1", fast_policy()).await.unwrap();
        assert_eq!(source.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn never_terminating_source_times_out() {
        let err = poll_until_terminal(&NeverDone, "T1", fast_policy())
            .await
            .unwrap_err();
        assert!(matches!(err, PipelineError::Timeout { .. }));
    }

    #[tokio::test]
    async fn render_error_is_terminal_not_retried() {
        let err = poll_until_terminal(&AlwaysErrored, "T1", fast_policy())
            .await
            .unwrap_err();
        match err {
            PipelineError::Upstream { provider, message, .. } => {
                assert_eq!(provider, "d-id");
                assert!(message.contains("render rejected"));
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }
}
