pub mod error;
pub mod format;
pub mod personalization;
pub mod service;
pub mod types;

pub use error::{Error, Result, ServiceError, ServiceResult};
pub use format::format_file_size;
pub use personalization::{AgeGroup, PersonalizationConfig, ReadingLevel};
pub use service::DocumentService;
pub use types::{
    BatchMetadata, BatchResult, CustomerInterest, DocumentResult, FeedbackRecord, FeedbackReply,
    FeedbackType, LanguageCatalog, SelectedFile, TranslationItem, UploadOptions, ORIGINAL,
    PDF_MIME_TYPE,
};
