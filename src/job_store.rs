// Append-only persistence of terminal job records.
//
// Bookkeeping must never mask a pipeline result: a save failure (or a
// store that was never configured) is logged at warn level and swallowed.
// Duplicate ids overwrite the existing row (PostgREST merge-duplicates).

use crate::config::SupabaseConfig;
use crate::pipeline::job::Job;
use async_trait::async_trait;
use reqwest::Client;
use serde_json::json;
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;
use uuid::Uuid;

#[async_trait]
pub trait JobStore: Send + Sync {
    async fn save(&self, job: &Job);
}

/// Supabase-backed store using the PostgREST `jobs` table.
pub struct SupabaseStore {
    client: Client,
    url: String,
    key: String,
}

impl SupabaseStore {
    pub fn new(config: SupabaseConfig) -> Self {
        SupabaseStore {
            client: Client::builder()
                .timeout(Duration::from_secs(30))
                .build()
                .unwrap_or_else(|_| Client::new()),
            url: config.url.trim_end_matches('/').to_string(),
            key: config.key,
        }
    }
}

#[async_trait]
impl JobStore for SupabaseStore {
    async fn save(&self, job: &Job) {
        let endpoint = format!("{}/rest/v1/jobs", self.url);
        let row = json!({
            "id": job.id,
            "mode": job.mode,
            "prompt": job.prompt.clone().unwrap_or_default(),
            "script": job.script.clone().unwrap_or_default(),
            "image_url": job.image_url,
            "video_url": job.video_url,
            "status": job.status,
            "failure_reason": job.failure_reason,
            "created_at": job.created_at,
        });

        let result = self
            .client
            .post(&endpoint)
            .header("apikey", &self.key)
            .header("Authorization", format!("Bearer {}", self.key))
            .header("Prefer", "resolution=merge-duplicates")
            .json(&row)
            .send()
            .await;

        match result {
            Ok(resp) if resp.status().is_success() => {
                tracing::debug!(job_id = %job.id, "job record saved");
            }
            Ok(resp) => {
                let status = resp.status();
                let body = resp.text().await.unwrap_or_default();
                tracing::warn!(job_id = %job.id, %status, body, "failed to save job record");
            }
            Err(e) => {
                tracing::warn!(job_id = %job.id, error = %e, "job store unreachable, skipping save");
            }
        }
    }
}

/// Store used when Supabase credentials are absent.
pub struct NoopStore;

#[async_trait]
impl JobStore for NoopStore {
    async fn save(&self, job: &Job) {
        tracing::warn!(job_id = %job.id, "job store not configured, skipping save");
    }
}

/// In-memory store for tests.
pub struct MemoryStore {
    jobs: Mutex<HashMap<Uuid, Job>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        MemoryStore {
            jobs: Mutex::new(HashMap::new()),
        }
    }

    pub fn get(&self, id: Uuid) -> Option<Job> {
        self.jobs.lock().unwrap().get(&id).cloned()
    }

    pub fn all(&self) -> Vec<Job> {
        self.jobs.lock().unwrap().values().cloned().collect()
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl JobStore for MemoryStore {
    async fn save(&self, job: &Job) {
        // Same duplicate-id policy as the Supabase store: overwrite.
        self.jobs.lock().unwrap().insert(job.id, job.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::job::{JobMode, JobStatus};

    #[tokio::test]
    async fn duplicate_id_overwrites() {
        let store = MemoryStore::new();
        let mut job = Job::new(JobMode::Direct);
        job.fail(crate::pipeline::job::Stage::Publish, "cloudinary down");
        store.save(&job).await;

        job.failure_reason = None;
        job.status = JobStatus::Published;
        job.video_url = Some("https://cdn.example/v.mp4".to_string());
        store.save(&job).await;

        let saved = store.get(job.id).unwrap();
        assert_eq!(saved.status, JobStatus::Published);
        assert_eq!(store.all().len(), 1);
    }
}
