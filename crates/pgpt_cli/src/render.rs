use pgpt_core::{format_file_size, CustomerInterest, DocumentResult, LanguageCatalog};
use pgpt_session::{FeedbackState, SessionSnapshot};

pub fn pending(snapshot: &SessionSnapshot) -> String {
    if snapshot.pending.is_empty() {
        return "No files selected".to_string();
    }
    let mut out = format!("📄 {} file(s) selected:\n", snapshot.pending.len());
    for file in &snapshot.pending {
        out.push_str(&format!("  {} ({})\n", file.filename, format_file_size(file.size)));
    }
    out
}

fn result(result: &DocumentResult, language: Option<&str>, out: &mut String) {
    if let Some(error) = &result.error {
        out.push_str(&format!("❌ {}: {}\n", result.filename, error));
        return;
    }
    let marker = if result.personalized == Some(true) { " (personalized)" } else { "" };
    out.push_str(&format!("📝 {}{}\n", result.filename, marker));
    if let Some(summary) = result.original_summary() {
        out.push_str(&format!("{}\n", summary));
    }
    if let Some(language) = language {
        if let Some(translated) = result.summary(language) {
            out.push_str(&format!("\n[{}]\n{}\n", language, translated));
        }
    }
}

pub fn results(snapshot: &SessionSnapshot) -> String {
    let mut out = String::new();
    for item in &snapshot.results {
        result(item, snapshot.selected_language.as_deref(), &mut out);
        if let Some(status) = snapshot.feedback.get(&item.filename) {
            if status.state != FeedbackState::None {
                if let Some(message) = &status.message {
                    out.push_str(&format!("  💬 {}\n", message));
                }
            }
        }
        out.push('\n');
    }
    if let Some(metadata) = &snapshot.metadata {
        let when = metadata
            .processed_at()
            .map(|at| at.format("%Y-%m-%d %H:%M:%S").to_string())
            .unwrap_or_else(|| metadata.processing_timestamp.clone());
        out.push_str(&format!(
            "Processed {} file(s) at {}\n",
            metadata.total_files_processed, when
        ));
    }
    if let Some(error) = &snapshot.error_message {
        out.push_str(&format!("⚠️ {}\n", error));
    }
    out
}

pub fn languages(languages: &LanguageCatalog) -> String {
    languages
        .iter()
        .map(|(code, name)| format!("{:<6} {}\n", code, name))
        .collect()
}

pub fn interests(interests: &[CustomerInterest]) -> String {
    interests
        .iter()
        .map(|interest| format!("{:<20} {}\n", interest.code, interest.name))
        .collect()
}
