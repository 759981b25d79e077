use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use pgpt_core::{
    BatchMetadata, BatchResult, CustomerInterest, DocumentResult, DocumentService, FeedbackRecord,
    FeedbackReply, LanguageCatalog, Result, SelectedFile, ServiceError, ServiceResult,
    TranslationItem, UploadOptions,
};
use reqwest::multipart::{Form, Part};
use reqwest::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use url::Url;

use crate::normalize;
use crate::ClientConfig;

#[derive(Deserialize)]
#[serde(untagged)]
enum UploadEnvelope {
    Batch {
        results: Vec<DocumentResult>,
        #[serde(default)]
        metadata: Option<BatchMetadata>,
    },
    Legacy {
        successful_files: Vec<DocumentResult>,
        #[serde(default)]
        failed_files: Vec<FailedFile>,
    },
}

#[derive(Deserialize)]
struct FailedFile {
    filename: String,
    error: String,
}

impl From<UploadEnvelope> for BatchResult {
    fn from(envelope: UploadEnvelope) -> Self {
        match envelope {
            UploadEnvelope::Batch { results, metadata } => BatchResult { results, metadata },
            UploadEnvelope::Legacy {
                mut successful_files,
                failed_files,
            } => {
                successful_files.extend(
                    failed_files
                        .into_iter()
                        .map(|failed| DocumentResult::failed(failed.filename, failed.error)),
                );
                BatchResult {
                    results: successful_files,
                    metadata: None,
                }
            }
        }
    }
}

#[derive(Deserialize)]
struct LanguagesResponse {
    supported_languages: LanguageCatalog,
}

#[derive(Deserialize)]
struct InterestsResponse {
    customer_interests: Vec<CustomerInterest>,
}

#[derive(Deserialize)]
struct HealthResponse {
    status: String,
}

#[derive(Serialize)]
struct TranslationRequest<'a> {
    target_language: &'a str,
    results: &'a [TranslationItem],
}

/// Text fields that accompany the file parts of an upload.
pub(crate) fn upload_fields(options: &UploadOptions) -> Vec<(&'static str, String)> {
    let mut fields = Vec::new();
    if let Some(language) = options.target_language.as_deref().filter(|l| !l.is_empty()) {
        fields.push(("target_language", language.to_string()));
    }
    if let Some(prompt) = options.custom_prompt.as_deref().filter(|p| !p.trim().is_empty()) {
        fields.push(("custom_prompt", prompt.to_string()));
    }
    if let Some(profile) = &options.personalization {
        fields.push(("reading_level", profile.reading_level.code().to_string()));
        if let Some(interests) = profile.interests_field() {
            fields.push(("interests", interests));
        }
        if let Some(age_group) = profile.age_group {
            fields.push(("age_group", age_group.code().to_string()));
        }
    }
    fields
}

pub(crate) fn feedback_fields(record: &FeedbackRecord) -> Vec<(&'static str, String)> {
    let mut fields = vec![
        ("summary_id", record.summary_id.clone()),
        ("feedback_type", record.feedback_type.as_str().to_string()),
    ];
    let optional = [
        ("original_text", &record.original_text),
        ("original_summary", &record.original_summary),
        ("feedback_text", &record.feedback_text),
        ("target_language", &record.target_language),
    ];
    for (name, value) in optional {
        if let Some(value) = value.as_deref().filter(|v| !v.is_empty()) {
            fields.push((name, value.to_string()));
        }
    }
    fields
}

/// `DocumentService` backed by the PolicyGPT HTTP API.
#[derive(Clone)]
pub struct HttpDocumentService {
    client: Arc<Client>,
    config: ClientConfig,
}

impl HttpDocumentService {
    pub fn new(config: ClientConfig) -> Result<Self> {
        let mut builder = Client::builder();
        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }
        let client = Arc::new(builder.build()?);
        Ok(Self { client, config })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// `GET /`, true when the backend reports itself healthy.
    pub async fn health(&self) -> ServiceResult<bool> {
        let response = self.send(self.client.get(self.endpoint("")?)).await?;
        let health: HealthResponse = decode(response).await?;
        Ok(health.status == "healthy")
    }

    fn endpoint(&self, path: &str) -> ServiceResult<Url> {
        self.config
            .api_url
            .join(path)
            .map_err(|e| ServiceError::Client(format!("Invalid endpoint {}: {}", path, e)))
    }

    async fn send(&self, request: RequestBuilder) -> ServiceResult<Response> {
        let response = request.send().await.map_err(normalize::transport_error)?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        let err = normalize::status_error(status, &body);
        warn!("Backend answered {}: {}", status, err);
        Err(err)
    }

    async fn upload_once(
        &self,
        files: &[SelectedFile],
        options: &UploadOptions,
    ) -> ServiceResult<BatchResult> {
        let mut form = Form::new();
        for file in files {
            let part = Part::bytes(file.data.clone())
                .file_name(file.filename.clone())
                .mime_str(&file.mime_type)
                .map_err(normalize::transport_error)?;
            form = form.part("files", part);
        }
        for (name, value) in upload_fields(options) {
            form = form.text(name, value);
        }

        let request = self.client.post(self.endpoint("upload")?).multipart(form);
        let response = self.send(request).await?;
        let envelope: UploadEnvelope = decode(response).await?;
        Ok(envelope.into())
    }
}

impl fmt::Debug for HttpDocumentService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpDocumentService")
            .field("client", &"<reqwest::Client>")
            .field("api_url", &self.config.api_url.as_str())
            .field("retry_upload_once", &self.config.retry_upload_once)
            .finish()
    }
}

async fn decode<T: DeserializeOwned>(response: Response) -> ServiceResult<T> {
    response.json::<T>().await.map_err(normalize::decode_error)
}

#[async_trait]
impl DocumentService for HttpDocumentService {
    async fn submit_upload(
        &self,
        files: &[SelectedFile],
        options: &UploadOptions,
    ) -> ServiceResult<BatchResult> {
        debug!("Uploading {} file(s) to {}", files.len(), self.config.api_url);
        let batch = match self.upload_once(files, options).await {
            Err(err) if self.config.retry_upload_once => {
                warn!("Upload failed ({}), retrying once", err);
                self.upload_once(files, options).await?
            }
            other => other?,
        };
        info!(
            "📄 Upload returned {} result(s), {} failed",
            batch.results.len(),
            batch.results.iter().filter(|r| r.error.is_some()).count()
        );
        Ok(batch)
    }

    async fn translate_summaries(
        &self,
        items: &[TranslationItem],
        target_language: &str,
    ) -> ServiceResult<BatchResult> {
        debug!("Requesting {} translation for {} result(s)", target_language, items.len());
        let request = self
            .client
            .post(self.endpoint("translate-summaries")?)
            .json(&TranslationRequest {
                target_language,
                results: items,
            });
        let response = self.send(request).await?;
        let envelope: UploadEnvelope = decode(response).await?;
        Ok(envelope.into())
    }

    async fn list_languages(&self) -> ServiceResult<LanguageCatalog> {
        let response = self.send(self.client.get(self.endpoint("languages")?)).await?;
        let languages: LanguagesResponse = decode(response).await?;
        Ok(languages.supported_languages)
    }

    async fn list_interests(&self) -> ServiceResult<Vec<CustomerInterest>> {
        let response = self.send(self.client.get(self.endpoint("customer-interests")?)).await?;
        let interests: InterestsResponse = decode(response).await?;
        Ok(interests.customer_interests)
    }

    async fn submit_feedback(&self, record: &FeedbackRecord) -> ServiceResult<FeedbackReply> {
        debug!("Submitting {} feedback for {}", record.feedback_type, record.summary_id);
        let form = feedback_fields(record)
            .into_iter()
            .fold(Form::new(), |form, (name, value)| form.text(name, value));
        let request = self.client.post(self.endpoint("feedback")?).multipart(form);
        let response = self.send(request).await?;
        decode(response).await
    }
}
