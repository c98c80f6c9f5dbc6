//! Prompt construction, response parsing, and positional merge for
//! AI-generated remediation suggestions.
//!
//! The network call lives in the main crate; everything here is pure so the
//! permissive parsing can be tested against crafted model output.

use serde_json::Value;

use crate::models::Finding;

/// One entry of the suggestion array returned by the model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SuggestedFix {
    pub suggestion: Option<String>,
}

/// Result of parsing free-form model output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SuggestionResponse {
    Structured(Vec<SuggestedFix>),
    Unparseable,
}

/// Builds the single enumerated prompt sent to the generative service.
pub fn build_prompt(findings: &[Finding], source_name: &str) -> String {
    let issues = findings
        .iter()
        .enumerate()
        .map(|(i, f)| format!("{}. Code: {}, Message: {}", i + 1, f.code, f.message))
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        "You are an expert WCAG 2.1 consultant. A recent accessibility scan of the \
         document/website \"{name}\" resulted in the following issues. For EACH issue below, \
         provide a professional, concise, and technical 'suggestion' on how to fix it, \
         focusing on web standards (HTML/CSS).\n\n\
         IMPORTANT: Return ONLY a single JSON array with exactly {count} objects, in the same \
         order as the issues, with NO surrounding text or markdown code blocks. \
         Example format: [{{\"suggestion\": \"Use ARIA tags...\"}}, \
         {{\"suggestion\": \"Ensure contrast ratio...\"}}].\n\n\
         ISSUES:\n{issues}",
        name = source_name,
        count = findings.len(),
        issues = issues,
    )
}

/// Removes a code fence when the whole response is wrapped in one.
///
/// The opening fence line (including any language tag) is dropped, as is
/// everything from the last closing fence on.
fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();
    if !trimmed.starts_with("```") {
        return trimmed;
    }
    let body_start = match trimmed.find('\n') {
        Some(i) => i + 1,
        None => return trimmed.trim_start_matches('`').trim(),
    };
    let body = &trimmed[body_start..];
    match body.rfind("```") {
        Some(end) => body[..end].trim(),
        None => body.trim(),
    }
}

/// Parses model output into suggestions.
///
/// Strips a wrapping code fence, takes the span from the first `[` to the
/// last `]`, and parses it as a JSON array. Entries that are not objects, or
/// lack a string `suggestion`, become `SuggestedFix { suggestion: None }`.
pub fn parse_suggestions(raw: &str) -> SuggestionResponse {
    let cleaned = strip_code_fence(raw);
    let (start, end) = match (cleaned.find('['), cleaned.rfind(']')) {
        (Some(s), Some(e)) if s < e => (s, e),
        _ => return SuggestionResponse::Unparseable,
    };

    let items: Vec<Value> = match serde_json::from_str(&cleaned[start..=end]) {
        Ok(items) => items,
        Err(_) => return SuggestionResponse::Unparseable,
    };

    SuggestionResponse::Structured(
        items
            .iter()
            .map(|item| SuggestedFix {
                suggestion: item
                    .get("suggestion")
                    .and_then(Value::as_str)
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(str::to_string),
            })
            .collect(),
    )
}

/// Overwrites suggestions by position.
///
/// `findings[i]` takes `fixes[i].suggestion` when present; entries past the
/// end of `fixes` keep their original suggestion.
pub fn merge_suggestions(mut findings: Vec<Finding>, fixes: &[SuggestedFix]) -> Vec<Finding> {
    for (finding, fix) in findings.iter_mut().zip(fixes) {
        if let Some(ref suggestion) = fix.suggestion {
            finding.suggestion = suggestion.clone();
        }
    }
    findings
}
