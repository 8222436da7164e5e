// CloudConvert client: extract the first frame of an uploaded video as a
// JPEG and return the exported frame URL.
//
// Three-task job: import/upload -> convert (ffmpeg, capture at 1s) ->
// export/url. The sync endpoint blocks until the job is finished.

use crate::error::PipelineError;
use reqwest::multipart;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use std::collections::HashMap;
use std::time::Duration;

#[derive(Clone)]
pub struct CloudConvertClient {
    api_key: String,
    client: Client,
    base_url: String,
    sync_url: String,
}

#[derive(Deserialize, Debug)]
struct JobEnvelope {
    data: JobData,
}

#[derive(Deserialize, Debug)]
struct JobData {
    id: String,
    status: Option<String>,
    tasks: Vec<TaskData>,
}

#[derive(Deserialize, Debug)]
struct TaskData {
    name: String,
    operation: String,
    status: Option<String>,
    result: Option<TaskResult>,
}

#[derive(Deserialize, Debug)]
struct TaskResult {
    form: Option<UploadForm>,
    files: Option<Vec<ExportedFile>>,
}

#[derive(Deserialize, Debug)]
struct UploadForm {
    url: String,
    parameters: HashMap<String, String>,
}

#[derive(Deserialize, Debug)]
struct ExportedFile {
    url: String,
}

impl CloudConvertClient {
    pub fn new(api_key: String) -> Self {
        Self {
            api_key,
            client: Client::builder()
                .timeout(Duration::from_secs(300))
                .build()
                .unwrap_or_else(|_| Client::new()),
            base_url: "https://api.cloudconvert.com/v2".to_string(),
            sync_url: "https://sync.api.cloudconvert.com/v2".to_string(),
        }
    }

    /// Run the full extract-frame job for a video file.
    pub async fn extract_frame(&self, video: Vec<u8>, file_name: &str) -> Result<String, PipelineError> {
        let job = self.create_job().await?;

        let upload_task = job
            .tasks
            .iter()
            .find(|t| t.operation == "import/upload")
            .and_then(|t| t.result.as_ref())
            .and_then(|r| r.form.as_ref())
            .ok_or_else(|| {
                PipelineError::upstream("cloudconvert", None, "job carried no upload form")
            })?;

        self.upload(upload_task, video, file_name).await?;
        self.wait_for_export(&job.id).await
    }

    async fn create_job(&self) -> Result<JobData, PipelineError> {
        let payload = json!({
            "tasks": {
                "import-file": { "operation": "import/upload" },
                "extract-frame": {
                    "operation": "convert",
                    "input": "import-file",
                    "output_format": "jpg",
                    "engine": "ffmpeg",
                    "capture_mode": "time",
                    "capture_time": 1,
                    "filename": "frame.jpg"
                },
                "export-frame": {
                    "operation": "export/url",
                    "input": "extract-frame",
                    "inline": false,
                    "archive_multiple_files": false
                }
            }
        });

        let response = self
            .client
            .post(format!("{}/jobs", self.base_url))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&payload)
            .send()
            .await
            .map_err(|e| PipelineError::transport("cloudconvert", e))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let error_text = response.text().await.unwrap_or_else(|_| "Unknown error".to_string());
            return Err(PipelineError::upstream("cloudconvert", Some(status), error_text));
        }

        let envelope: JobEnvelope = response
            .json()
            .await
            .map_err(|e| PipelineError::upstream("cloudconvert", None, format!("unparseable response: {}", e)))?;
        Ok(envelope.data)
    }

    async fn upload(&self, form: &UploadForm, video: Vec<u8>, file_name: &str) -> Result<(), PipelineError> {
        let mut multipart_form = multipart::Form::new();
        for (key, value) in &form.parameters {
            multipart_form = multipart_form.text(key.clone(), value.clone());
        }
        multipart_form = multipart_form.part(
            "file",
            multipart::Part::bytes(video)
                .file_name(file_name.to_string())
                .mime_str("video/mp4")
                .map_err(|e| PipelineError::upstream("cloudconvert", None, e.to_string()))?,
        );

        let response = self
            .client
            .post(&form.url)
            .multipart(multipart_form)
            .send()
            .await
            .map_err(|e| PipelineError::transport("cloudconvert", e))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let error_text = response.text().await.unwrap_or_else(|_| "Unknown error".to_string());
            return Err(PipelineError::upstream("cloudconvert", Some(status), error_text));
        }
        Ok(())
    }

    async fn wait_for_export(&self, job_id: &str) -> Result<String, PipelineError> {
        let response = self
            .client
            .get(format!("{}/jobs/{}", self.sync_url, job_id))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .send()
            .await
            .map_err(|e| PipelineError::transport("cloudconvert", e))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let error_text = response.text().await.unwrap_or_else(|_| "Unknown error".to_string());
            return Err(PipelineError::upstream("cloudconvert", Some(status), error_text));
        }

        let envelope: JobEnvelope = response
            .json()
            .await
            .map_err(|e| PipelineError::upstream("cloudconvert", None, format!("unparseable response: {}", e)))?;

        if envelope.data.status.as_deref() != Some("finished") {
            return Err(PipelineError::upstream(
                "cloudconvert",
                None,
                format!("job ended in status {:?}", envelope.data.status),
            ));
        }

        envelope
            .data
            .tasks
            .iter()
            .find(|t| t.name == "export-frame" && t.status.as_deref() == Some("finished"))
            .and_then(|t| t.result.as_ref())
            .and_then(|r| r.files.as_ref())
            .and_then(|files| files.first())
            .map(|f| f.url.clone())
            .ok_or_else(|| PipelineError::upstream("cloudconvert", None, "frame export failed"))
    }
}
