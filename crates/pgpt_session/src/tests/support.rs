use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use pgpt_core::{
    BatchResult, CustomerInterest, DocumentResult, DocumentService, FeedbackRecord, FeedbackReply,
    LanguageCatalog, SelectedFile, ServiceError, ServiceResult, TranslationItem, UploadOptions,
    ORIGINAL, PDF_MIME_TYPE,
};
use tokio::sync::Semaphore;

use crate::{DocumentSession, SessionConfig};

#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    Upload { files: Vec<String>, options: UploadOptions },
    Translate { filenames: Vec<String>, language: String },
    Feedback(FeedbackRecord),
    Languages,
    Interests,
}

/// In-memory backend. Queued replies are used first; otherwise it answers like
/// a healthy backend would. With a gate set, every call waits for one permit.
#[derive(Debug, Default)]
pub struct ScriptedService {
    uploads: Mutex<VecDeque<ServiceResult<BatchResult>>>,
    translations: Mutex<VecDeque<ServiceResult<BatchResult>>>,
    feedback: Mutex<VecDeque<ServiceResult<FeedbackReply>>>,
    languages: Mutex<Option<ServiceResult<LanguageCatalog>>>,
    calls: Mutex<Vec<Call>>,
    gate: Mutex<Option<Arc<Semaphore>>>,
}

impl ScriptedService {
    pub fn queue_upload(&self, reply: ServiceResult<BatchResult>) {
        self.uploads.lock().unwrap().push_back(reply);
    }

    pub fn queue_translation(&self, reply: ServiceResult<BatchResult>) {
        self.translations.lock().unwrap().push_back(reply);
    }

    pub fn queue_feedback(&self, reply: ServiceResult<FeedbackReply>) {
        self.feedback.lock().unwrap().push_back(reply);
    }

    pub fn fail_languages(&self, err: ServiceError) {
        *self.languages.lock().unwrap() = Some(Err(err));
    }

    /// Holds every call until a permit is added to the returned semaphore.
    pub fn gate(&self) -> Arc<Semaphore> {
        let gate = Arc::new(Semaphore::new(0));
        *self.gate.lock().unwrap() = Some(gate.clone());
        gate
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn feedback_records(&self) -> Vec<FeedbackRecord> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                Call::Feedback(record) => Some(record),
                _ => None,
            })
            .collect()
    }

    pub fn translation_calls(&self) -> usize {
        self.calls()
            .iter()
            .filter(|call| matches!(call, Call::Translate { .. }))
            .count()
    }

    async fn enter(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
        let gate = self.gate.lock().unwrap().clone();
        if let Some(gate) = gate {
            gate.acquire().await.unwrap().forget();
        }
    }
}

pub fn summarized(filename: &str) -> DocumentResult {
    let mut result = DocumentResult {
        filename: filename.to_string(),
        original_text: Some(format!("Full text of {}", filename)),
        ..Default::default()
    };
    result.summaries.insert(ORIGINAL.to_string(), format!("Summary of {}", filename));
    result
}

#[async_trait]
impl DocumentService for ScriptedService {
    async fn submit_upload(
        &self,
        files: &[SelectedFile],
        options: &UploadOptions,
    ) -> ServiceResult<BatchResult> {
        self.enter(Call::Upload {
            files: files.iter().map(|f| f.filename.clone()).collect(),
            options: options.clone(),
        })
        .await;
        let queued = self.uploads.lock().unwrap().pop_front();
        queued.unwrap_or_else(|| {
            Ok(BatchResult {
                results: files.iter().map(|f| summarized(&f.filename)).collect(),
                metadata: None,
            })
        })
    }

    async fn translate_summaries(
        &self,
        items: &[TranslationItem],
        target_language: &str,
    ) -> ServiceResult<BatchResult> {
        self.enter(Call::Translate {
            filenames: items.iter().map(|i| i.filename.clone()).collect(),
            language: target_language.to_string(),
        })
        .await;
        let queued = self.translations.lock().unwrap().pop_front();
        queued.unwrap_or_else(|| {
            let results = items
                .iter()
                .map(|item| {
                    let mut summaries = item.summaries.clone();
                    let original = summaries.get(ORIGINAL).cloned().unwrap_or_default();
                    let translated = format!("[{}] {}", target_language, original);
                    summaries.insert(target_language.to_string(), translated);
                    DocumentResult {
                        filename: item.filename.clone(),
                        summaries,
                        ..Default::default()
                    }
                })
                .collect();
            Ok(BatchResult { results, metadata: None })
        })
    }

    async fn list_languages(&self) -> ServiceResult<LanguageCatalog> {
        self.enter(Call::Languages).await;
        let scripted = self.languages.lock().unwrap().clone();
        scripted.unwrap_or_else(|| {
            Ok([("hi", "Hindi"), ("fr", "French")]
                .into_iter()
                .map(|(code, name)| (code.to_string(), name.to_string()))
                .collect())
        })
    }

    async fn list_interests(&self) -> ServiceResult<Vec<CustomerInterest>> {
        self.enter(Call::Interests).await;
        Ok(vec![CustomerInterest {
            code: "claim_process".into(),
            name: "Claim Process".into(),
        }])
    }

    async fn submit_feedback(&self, record: &FeedbackRecord) -> ServiceResult<FeedbackReply> {
        self.enter(Call::Feedback(record.clone())).await;
        let queued = self.feedback.lock().unwrap().pop_front();
        queued.unwrap_or_else(|| Ok(FeedbackReply::default()))
    }
}

pub fn pdf(name: &str) -> SelectedFile {
    SelectedFile::new(name, PDF_MIME_TYPE, b"%PDF-1.4".to_vec())
}

pub fn session_with(config: SessionConfig) -> (DocumentSession, Arc<ScriptedService>) {
    let service = Arc::new(ScriptedService::default());
    (DocumentSession::new(service.clone(), config), service)
}

pub fn session() -> (DocumentSession, Arc<ScriptedService>) {
    session_with(SessionConfig::default())
}

/// A session whose results are `names`, already uploaded.
pub async fn uploaded(names: &[&str]) -> (DocumentSession, Arc<ScriptedService>) {
    let (session, service) = session();
    session.handle_files(names.iter().map(|name| pdf(name)).collect());
    session.upload_files().await;
    (session, service)
}
