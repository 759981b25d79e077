use std::fmt;

use async_trait::async_trait;

use crate::error::ServiceResult;
use crate::types::{
    BatchResult, CustomerInterest, FeedbackRecord, FeedbackReply, LanguageCatalog, SelectedFile,
    TranslationItem,
};
use crate::UploadOptions;

/// The summarization backend, seen from the client.
#[async_trait]
pub trait DocumentService: Send + Sync + fmt::Debug {
    /// Upload a whole batch in one request and get one result per file back.
    async fn submit_upload(
        &self,
        files: &[SelectedFile],
        options: &UploadOptions,
    ) -> ServiceResult<BatchResult>;

    /// Translate already produced summaries into `target_language`.
    async fn translate_summaries(
        &self,
        items: &[TranslationItem],
        target_language: &str,
    ) -> ServiceResult<BatchResult>;

    async fn list_languages(&self) -> ServiceResult<LanguageCatalog>;

    async fn list_interests(&self) -> ServiceResult<Vec<CustomerInterest>>;

    async fn submit_feedback(&self, record: &FeedbackRecord) -> ServiceResult<FeedbackReply>;
}
