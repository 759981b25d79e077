use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, Weak};

use pgpt_core::FeedbackType;
use serde::Serialize;
use uuid::Uuid;

/// Free-text prompt shown for unclear/inaccurate feedback.
#[derive(Debug, Default)]
pub struct FeedbackDialog {
    open: Option<(String, FeedbackType)>,
    text: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DialogView {
    pub filename: String,
    pub feedback_type: FeedbackType,
    pub title: &'static str,
    pub placeholder: &'static str,
    pub text: String,
}

pub fn dialog_title(feedback_type: Option<FeedbackType>) -> &'static str {
    match feedback_type {
        Some(FeedbackType::Unclear) => "What was unclear about the summary?",
        Some(FeedbackType::Inaccurate) => "What was inaccurate about the summary?",
        _ => "Please provide your feedback",
    }
}

pub fn dialog_placeholder(feedback_type: Option<FeedbackType>) -> &'static str {
    match feedback_type {
        Some(FeedbackType::Unclear) => {
            "Please explain what aspects of the summary were unclear or confusing..."
        }
        Some(FeedbackType::Inaccurate) => {
            "Please explain what information was incorrect or missing in the summary..."
        }
        _ => "Enter your feedback here...",
    }
}

impl FeedbackDialog {
    pub fn open(&mut self, filename: &str, feedback_type: FeedbackType) {
        self.open = Some((filename.to_string(), feedback_type));
        self.text.clear();
    }

    pub fn is_open(&self) -> bool {
        self.open.is_some()
    }

    pub fn target(&self) -> Option<&str> {
        self.open.as_ref().map(|(filename, _)| filename.as_str())
    }

    pub fn set_text(&mut self, text: &str) {
        self.text = text.to_string();
    }

    /// Closes the dialog and hands back what was typed.
    pub fn take_submission(&mut self) -> Option<(String, FeedbackType, String)> {
        let (filename, feedback_type) = self.open.take()?;
        Some((filename, feedback_type, std::mem::take(&mut self.text)))
    }

    /// Closes without submitting; returns the filename the dialog was for.
    pub fn dismiss(&mut self) -> Option<String> {
        self.text.clear();
        self.open.take().map(|(filename, _)| filename)
    }

    pub fn view(&self) -> Option<DialogView> {
        self.open.as_ref().map(|(filename, feedback_type)| DialogView {
            filename: filename.clone(),
            feedback_type: *feedback_type,
            title: dialog_title(Some(*feedback_type)),
            placeholder: dialog_placeholder(Some(*feedback_type)),
            text: self.text.clone(),
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClickTarget {
    InsideDialog,
    Outside,
}

type Listener = Arc<dyn Fn(ClickTarget) + Send + Sync>;
type Listeners = Mutex<HashMap<Uuid, Listener>>;

/// Pointer clicks fanned out to whoever is mounted.
#[derive(Clone, Default)]
pub struct ClickEvents {
    listeners: Arc<Listeners>,
}

impl ClickEvents {
    pub fn subscribe(
        &self,
        listener: impl Fn(ClickTarget) + Send + Sync + 'static,
    ) -> ClickSubscription {
        let id = Uuid::new_v4();
        lock(&self.listeners).insert(id, Arc::new(listener));
        ClickSubscription {
            id,
            listeners: Arc::downgrade(&self.listeners),
        }
    }

    pub fn dispatch(&self, target: ClickTarget) {
        // Listeners may take other locks; call them outside ours.
        let listeners: Vec<Listener> = lock(&self.listeners).values().cloned().collect();
        for listener in listeners {
            listener(target);
        }
    }

    pub fn listener_count(&self) -> usize {
        lock(&self.listeners).len()
    }
}

impl fmt::Debug for ClickEvents {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClickEvents")
            .field("listeners", &self.listener_count())
            .finish()
    }
}

/// Unsubscribes on drop.
#[must_use = "dropping the subscription unsubscribes immediately"]
pub struct ClickSubscription {
    id: Uuid,
    listeners: Weak<Listeners>,
}

impl Drop for ClickSubscription {
    fn drop(&mut self) {
        if let Some(listeners) = self.listeners.upgrade() {
            lock(&listeners).remove(&self.id);
        }
    }
}

fn lock(listeners: &Listeners) -> std::sync::MutexGuard<'_, HashMap<Uuid, Listener>> {
    listeners.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
