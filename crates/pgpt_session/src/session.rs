use std::collections::{BTreeMap, HashMap, HashSet};
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, Weak};
use std::time::Duration;

use pgpt_core::{
    BatchMetadata, CustomerInterest, DocumentResult, DocumentService, FeedbackRecord, FeedbackType,
    LanguageCatalog, PersonalizationConfig, SelectedFile, TranslationItem, UploadOptions,
};
use serde::Serialize;
use thiserror::Error;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::dialog::{ClickEvents, ClickSubscription, ClickTarget, DialogView, FeedbackDialog};
use crate::feedback::{EntryId, FeedbackStatus, FeedbackTracker};

pub const PDF_ONLY_MESSAGE: &str = "Please select PDF files only";
pub const LANGUAGES_FAILED_MESSAGE: &str = "Error loading supported languages";
pub const FEEDBACK_SUCCESS_TTL: Duration = Duration::from_millis(3000);

/// Which of the upload flows this session offers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Capabilities {
    /// Send reading level, interests and age group with uploads.
    pub supports_personalization: bool,
    /// Translate existing results when the language changes instead of waiting for the next upload.
    pub supports_incremental_translation: bool,
    /// Empty the pending batch once an upload succeeds.
    pub clears_batch_on_success: bool,
}

impl Default for Capabilities {
    fn default() -> Self {
        Self {
            supports_personalization: true,
            supports_incremental_translation: true,
            clears_batch_on_success: false,
        }
    }
}

#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub capabilities: Capabilities,
    pub feedback_success_ttl: Duration,
    pub custom_prompt: Option<String>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            capabilities: Capabilities::default(),
            feedback_success_ttl: FEEDBACK_SUCCESS_TTL,
            custom_prompt: None,
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    #[error("No result for {0}")]
    UnknownResult(String),

    #[error("{0} has no summary to give feedback on")]
    NoSummary(String),
}

/// What became of a batch or translation request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestOutcome {
    /// Nothing to send, or a request was already running.
    Skipped,
    Applied,
    /// The request failed; the message is in the session error.
    Failed,
    /// A newer action superseded the request before its response arrived.
    Discarded,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedbackOutcome {
    DialogOpened,
    Recorded { refined: bool },
    Failed,
    /// Already submitting, or no dialog to submit.
    Ignored,
    Discarded,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PendingFile {
    pub filename: String,
    pub mime_type: String,
    pub size: u64,
}

/// Read-only copy of everything a front end renders.
#[derive(Debug, Clone, Serialize)]
pub struct SessionSnapshot {
    pub pending: Vec<PendingFile>,
    pub results: Vec<DocumentResult>,
    pub error_message: Option<String>,
    pub processing: bool,
    pub selected_language: Option<String>,
    pub personalization: PersonalizationConfig,
    pub languages: LanguageCatalog,
    pub interests: Vec<CustomerInterest>,
    pub metadata: Option<BatchMetadata>,
    pub feedback: BTreeMap<String, FeedbackStatus>,
    pub dialog: Option<DialogView>,
}

#[derive(Default)]
struct SessionState {
    pending: Vec<SelectedFile>,
    results: Vec<DocumentResult>,
    error_message: Option<String>,
    processing: bool,
    selected_language: Option<String>,
    personalization: PersonalizationConfig,
    languages: LanguageCatalog,
    interests: Vec<CustomerInterest>,
    metadata: Option<BatchMetadata>,
    feedback: FeedbackTracker,
    dialog: FeedbackDialog,
    current_request: Option<Uuid>,
    expiries: HashMap<String, JoinHandle<()>>,
}

impl SessionState {
    fn cancel_expiry(&mut self, filename: &str) {
        if let Some(handle) = self.expiries.remove(filename) {
            handle.abort();
        }
    }

    fn reset_feedback(&mut self) {
        for (_, handle) in self.expiries.drain() {
            handle.abort();
        }
        self.feedback.clear();
        self.dialog.dismiss();
    }

    fn dismiss_dialog(&mut self) -> Option<String> {
        let filename = self.dialog.dismiss()?;
        self.cancel_expiry(&filename);
        self.feedback.remove(&filename);
        Some(filename)
    }

    fn finish_request(&mut self, request: Uuid) -> bool {
        if self.current_request != Some(request) {
            return false;
        }
        self.current_request = None;
        self.processing = false;
        true
    }
}

struct Inner {
    service: Arc<dyn DocumentService>,
    config: SessionConfig,
    state: Mutex<SessionState>,
}

impl Inner {
    fn lock(&self) -> MutexGuard<'_, SessionState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Upload / translate / feedback orchestration for one user.
///
/// Cloning is cheap and every clone drives the same state. No lock is held while a
/// request is in flight; each request carries an id and its response is dropped
/// if a newer action replaced that id in the meantime.
#[derive(Clone)]
pub struct DocumentSession {
    inner: Arc<Inner>,
}

impl fmt::Debug for DocumentSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DocumentSession")
            .field("service", &self.inner.service)
            .field("config", &self.inner.config)
            .finish()
    }
}

impl DocumentSession {
    pub fn new(service: Arc<dyn DocumentService>, config: SessionConfig) -> Self {
        Self {
            inner: Arc::new(Inner {
                service,
                config,
                state: Mutex::new(SessionState::default()),
            }),
        }
    }

    pub fn config(&self) -> &SessionConfig {
        &self.inner.config
    }

    fn lock(&self) -> MutexGuard<'_, SessionState> {
        self.inner.lock()
    }

    /// Loads the language list and, with personalization, the interest catalog.
    pub async fn load_options(&self) {
        match self.inner.service.list_languages().await {
            Ok(languages) => {
                debug!("Loaded {} languages", languages.len());
                self.lock().languages = languages;
            }
            Err(err) => {
                warn!("Error loading languages: {}", err);
                self.lock().error_message = Some(LANGUAGES_FAILED_MESSAGE.to_string());
            }
        }

        if !self.inner.config.capabilities.supports_personalization {
            return;
        }
        match self.inner.service.list_interests().await {
            Ok(interests) => self.lock().interests = interests,
            Err(err) => warn!("Error loading customer interests: {}", err),
        }
    }

    /// Appends the PDF candidates to the pending batch; returns how many were taken.
    pub fn handle_files(&self, candidates: Vec<SelectedFile>) -> usize {
        let pdfs: Vec<SelectedFile> = candidates.into_iter().filter(SelectedFile::is_pdf).collect();
        let mut state = self.lock();
        if pdfs.is_empty() {
            state.error_message = Some(PDF_ONLY_MESSAGE.to_string());
            return 0;
        }
        let accepted = pdfs.len();
        state.pending.extend(pdfs);
        state.error_message = None;
        accepted
    }

    /// Resets the batch, results and error. A request still in flight is not
    /// cancelled, but its response will be dropped.
    pub fn clear_files(&self) {
        let mut state = self.lock();
        state.pending.clear();
        state.results.clear();
        state.metadata = None;
        state.error_message = None;
        state.processing = false;
        if state.current_request.take().is_some() {
            debug!("Clearing with a request in flight; its response will be dropped");
        }
        state.reset_feedback();
    }

    pub fn set_reading_level(&self, level: pgpt_core::ReadingLevel) {
        self.lock().personalization.reading_level = level;
    }

    pub fn set_interest(&self, code: &str, checked: bool) {
        self.lock().personalization.set_interest(code, checked);
    }

    pub fn set_age_group(&self, age_group: Option<pgpt_core::AgeGroup>) {
        self.lock().personalization.age_group = age_group;
    }

    pub fn set_personalization(&self, personalization: PersonalizationConfig) {
        self.lock().personalization = personalization;
    }

    fn upload_options(&self, state: &SessionState) -> UploadOptions {
        let personalization = Some(state.personalization.clone())
            .filter(|p| self.inner.config.capabilities.supports_personalization && p.is_in_use());
        UploadOptions {
            target_language: state.selected_language.clone(),
            custom_prompt: self.inner.config.custom_prompt.clone(),
            personalization,
        }
    }

    /// Sends the whole pending batch as one request.
    pub async fn upload_files(&self) -> RequestOutcome {
        let (request, files, options) = {
            let mut state = self.lock();
            if state.pending.is_empty() || state.processing {
                return RequestOutcome::Skipped;
            }
            state.results.clear();
            state.metadata = None;
            state.error_message = None;
            state.reset_feedback();
            state.processing = true;
            let request = Uuid::new_v4();
            state.current_request = Some(request);
            (request, state.pending.clone(), self.upload_options(&state))
        };
        let personalized = options.personalization.is_some();

        info!("📤 Uploading {} file(s)", files.len());
        let response = self.inner.service.submit_upload(&files, &options).await;

        let mut state = self.lock();
        if !state.finish_request(request) {
            debug!("Dropping stale upload response");
            return RequestOutcome::Discarded;
        }
        match response {
            Ok(batch) => {
                state.error_message = batch.error_summary();
                if let Some(errors) = &state.error_message {
                    warn!("Some files failed:\n{}", errors);
                }
                let supports_personalization =
                    self.inner.config.capabilities.supports_personalization;
                state.results = batch
                    .results
                    .into_iter()
                    .map(|mut result| {
                        if result.error.is_none() {
                            result.original_text.get_or_insert_with(String::new);
                            if supports_personalization {
                                result.personalized = result.personalized.or(Some(personalized));
                            }
                        }
                        result
                    })
                    .collect();
                state.metadata = batch.metadata;
                if self.inner.config.capabilities.clears_batch_on_success {
                    state.pending.clear();
                }
                let ready = state.results.iter().filter(|r| r.accepts_feedback()).count();
                info!("✨ {} summaries ready", ready);
                RequestOutcome::Applied
            }
            Err(err) => {
                warn!("Upload failed: {}", err);
                state.error_message = Some(err.to_string());
                RequestOutcome::Failed
            }
        }
    }

    /// Selects a language, translating existing results when some lack it.
    pub async fn on_language_change(&self, language: &str) -> RequestOutcome {
        let language = language.trim().to_string();
        let (request, items) = {
            let mut state = self.lock();
            state.selected_language = Some(language.clone()).filter(|l| !l.is_empty());
            let capabilities = &self.inner.config.capabilities;
            if language.is_empty() || !capabilities.supports_incremental_translation {
                return RequestOutcome::Skipped;
            }
            if state.results.iter().all(|result| result.has_summary(&language)) {
                debug!("Every result already has a {} summary", language);
                return RequestOutcome::Skipped;
            }
            // Failed results have nothing to translate; they are kept by the merge.
            let items: Vec<TranslationItem> = state
                .results
                .iter()
                .filter(|result| result.error.is_none())
                .map(TranslationItem::from)
                .collect();
            state.processing = true;
            let request = Uuid::new_v4();
            state.current_request = Some(request);
            (request, items)
        };

        info!("🌐 Translating {} result(s) to {}", items.len(), language);
        let response = self.inner.service.translate_summaries(&items, &language).await;

        let mut state = self.lock();
        if !state.finish_request(request) {
            debug!("Dropping stale translation response");
            return RequestOutcome::Discarded;
        }
        match response {
            Ok(batch) => {
                if let Some(errors) = batch.error_summary() {
                    state.error_message = Some(errors);
                }
                let previous = std::mem::take(&mut state.results);
                state.results = merge_translation(previous, batch.results);
                RequestOutcome::Applied
            }
            Err(err) => {
                warn!("Translation failed: {}", err);
                state.error_message = Some(err.to_string());
                RequestOutcome::Failed
            }
        }
    }

    /// Rates a result. Helpful feedback is sent right away; the other types open the dialog.
    pub async fn submit_feedback(
        &self,
        filename: &str,
        feedback_type: FeedbackType,
    ) -> Result<FeedbackOutcome, SessionError> {
        {
            let mut state = self.lock();
            ensure_rateable(&state.results, filename)?;
            if state.feedback.is_submitting(filename) {
                return Ok(FeedbackOutcome::Ignored);
            }
            if state.dialog.is_open() {
                state.dismiss_dialog();
            }
            state.cancel_expiry(filename);
            state.feedback.record_type(filename, feedback_type);
            if feedback_type.requests_refinement() {
                state.dialog.open(filename, feedback_type);
                return Ok(FeedbackOutcome::DialogOpened);
            }
        }
        self.process_feedback(filename, feedback_type, String::new()).await
    }

    pub fn set_dialog_text(&self, text: &str) {
        self.lock().dialog.set_text(text);
    }

    /// Submits the open dialog with `text` as the free-text feedback.
    pub async fn submit_dialog(&self, text: &str) -> Result<FeedbackOutcome, SessionError> {
        let submission = {
            let mut state = self.lock();
            state.dialog.set_text(text);
            state.dialog.take_submission()
        };
        match submission {
            Some((filename, feedback_type, text)) => {
                self.process_feedback(&filename, feedback_type, text).await
            }
            None => Ok(FeedbackOutcome::Ignored),
        }
    }

    /// Cancels the dialog; the feedback entry for its document is removed entirely.
    pub fn close_feedback_dialog(&self) {
        if let Some(filename) = self.lock().dismiss_dialog() {
            debug!("Feedback dialog for {} cancelled", filename);
        }
    }

    /// Closes the dialog on clicks outside it for as long as the subscription lives.
    pub fn mount_dialog(&self, events: &ClickEvents) -> ClickSubscription {
        let session: Weak<Inner> = Arc::downgrade(&self.inner);
        events.subscribe(move |target| {
            if target != ClickTarget::Outside {
                return;
            }
            if let Some(inner) = session.upgrade() {
                DocumentSession { inner }.close_feedback_dialog();
            }
        })
    }

    async fn process_feedback(
        &self,
        filename: &str,
        feedback_type: FeedbackType,
        text: String,
    ) -> Result<FeedbackOutcome, SessionError> {
        let refine = feedback_type.requests_refinement();
        let (record, entry) = {
            let mut state = self.lock();
            let result = ensure_rateable(&state.results, filename)?;
            let record = FeedbackRecord {
                summary_id: filename.to_string(),
                feedback_type,
                original_text: if refine { result.original_text.clone() } else { None },
                original_summary: if refine {
                    result.original_summary().map(str::to_string)
                } else {
                    None
                },
                feedback_text: Some(text).filter(|t| !t.is_empty()),
                target_language: if refine { state.selected_language.clone() } else { None },
            };
            state.cancel_expiry(filename);
            let Some(entry) = state.feedback.begin(filename, feedback_type) else {
                return Ok(FeedbackOutcome::Ignored);
            };
            (record, entry)
        };

        let reply = self.inner.service.submit_feedback(&record).await;

        let mut state = self.lock();
        if !state.feedback.is_current(filename, entry) {
            debug!("Dropping stale feedback response for {}", filename);
            return Ok(FeedbackOutcome::Discarded);
        }
        match reply {
            Ok(reply) => {
                let refined = match reply.summaries.filter(|_| refine) {
                    Some(summaries) if reply_has_original(&summaries) => {
                        let target = state.results.iter_mut().find(|r| r.filename == filename);
                        if let Some(result) = target {
                            debug!("Applying refined summary for {}", filename);
                            // Translations of the old summary are stale; keep only what came back.
                            result.summaries = summaries;
                        }
                        true
                    }
                    _ => false,
                };
                let entry = state.feedback.succeed(filename, feedback_type, refined);
                self.schedule_expiry(&mut state, filename, entry);
                Ok(FeedbackOutcome::Recorded { refined })
            }
            Err(err) => {
                warn!("Error submitting feedback for {}: {}", filename, err);
                state.feedback.fail(filename, feedback_type);
                Ok(FeedbackOutcome::Failed)
            }
        }
    }

    fn schedule_expiry(&self, state: &mut SessionState, filename: &str, entry: EntryId) {
        let session = Arc::downgrade(&self.inner);
        let deadline = tokio::time::Instant::now() + self.inner.config.feedback_success_ttl;
        let key = filename.to_string();
        let handle = tokio::spawn(async move {
            tokio::time::sleep_until(deadline).await;
            let Some(inner) = session.upgrade() else { return };
            let mut state = inner.lock();
            if state.feedback.expire(&key, entry) {
                state.expiries.remove(&key);
            }
        });
        if let Some(previous) = state.expiries.insert(filename.to_string(), handle) {
            previous.abort();
        }
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        let state = self.lock();
        SessionSnapshot {
            pending: state
                .pending
                .iter()
                .map(|file| PendingFile {
                    filename: file.filename.clone(),
                    mime_type: file.mime_type.clone(),
                    size: file.size(),
                })
                .collect(),
            results: state.results.clone(),
            error_message: state.error_message.clone(),
            processing: state.processing,
            selected_language: state.selected_language.clone(),
            personalization: state.personalization.clone(),
            languages: state.languages.clone(),
            interests: state.interests.clone(),
            metadata: state.metadata.clone(),
            feedback: state.feedback.entries().clone(),
            dialog: state.dialog.view(),
        }
    }

    pub fn feedback_status(&self, filename: &str) -> Option<FeedbackStatus> {
        self.lock().feedback.get(filename).cloned()
    }

    pub fn results(&self) -> Vec<DocumentResult> {
        self.lock().results.clone()
    }

    pub fn error_message(&self) -> Option<String> {
        self.lock().error_message.clone()
    }

    pub fn is_processing(&self) -> bool {
        self.lock().processing
    }

    pub fn pending_count(&self) -> usize {
        self.lock().pending.len()
    }
}

fn ensure_rateable<'a>(
    results: &'a [DocumentResult],
    filename: &str,
) -> Result<&'a DocumentResult, SessionError> {
    let result = results
        .iter()
        .find(|result| result.filename == filename)
        .ok_or_else(|| SessionError::UnknownResult(filename.to_string()))?;
    if !result.accepts_feedback() {
        return Err(SessionError::NoSummary(filename.to_string()));
    }
    Ok(result)
}

fn reply_has_original(summaries: &BTreeMap<String, String>) -> bool {
    summaries.contains_key(pgpt_core::ORIGINAL)
}

/// Translated results replace the previous set; fields the translation omits carry
/// over, and failed results that were not sent are kept at the end.
fn merge_translation(
    previous: Vec<DocumentResult>,
    translated: Vec<DocumentResult>,
) -> Vec<DocumentResult> {
    let returned: HashSet<String> = translated.iter().map(|r| r.filename.clone()).collect();
    let mut by_name: HashMap<String, DocumentResult> = HashMap::new();
    let mut leftovers = Vec::new();
    for result in previous {
        if returned.contains(&result.filename) {
            by_name.insert(result.filename.clone(), result);
        } else if result.error.is_some() {
            leftovers.push(result);
        }
    }

    let mut merged: Vec<DocumentResult> = translated
        .into_iter()
        .map(|mut result| {
            if let Some(before) = by_name.remove(&result.filename) {
                if result.original_text.is_none() {
                    result.original_text = before.original_text;
                }
                if result.personalized.is_none() {
                    result.personalized = before.personalized;
                }
            }
            result
        })
        .collect();
    merged.extend(leftovers);
    merged
}
