pub mod dialog;
pub mod feedback;
pub mod session;

#[cfg(test)]
mod tests;

pub use dialog::{ClickEvents, ClickSubscription, ClickTarget, DialogView, FeedbackDialog};
pub use feedback::{FeedbackState, FeedbackStatus, FeedbackTracker};
pub use session::{
    Capabilities, DocumentSession, FeedbackOutcome, PendingFile, RequestOutcome, SessionConfig,
    SessionError, SessionSnapshot,
};
