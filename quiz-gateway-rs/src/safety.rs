// quiz-gateway-rs/src/safety.rs
// Output safety filter for generated sentences.
// Runs AFTER the provider call: generated text is matched against a static,
// ordered denylist and swapped for a canned line on any hit.
//
// This is a pattern filter, not a classifier. Novel phrasings slip through;
// that limitation is accepted.

use lazy_static::lazy_static;
use regex::Regex;
use serde::Serialize;

pub const CANNED_SAFE_LINE: &str =
    "Je vibe is uniek—houd het luchtig, deel met een knipoog en maak er iets leuks van.";

lazy_static! {
    // Ordered denylist; first match wins. Case-insensitive, word-bounded.
    static ref BLOCKED_PATTERNS: Vec<(&'static str, Regex)> = vec![
        ("HATE_SPEECH", Regex::new(r"(?i)\b(haat|hate|racis(?:me|t)|nazi|genocide)\b").unwrap()),
        ("VIOLENCE", Regex::new(r"(?i)\b(kill|moord|vermoord(?:en)?|shoot|schiet|steken)\b").unwrap()),
        ("SELF_HARM", Regex::new(r"(?i)\b(zelfmoord|suicide|self-harm|snij jezelf)\b").unwrap()),
        ("SEXUAL_EXPLOITATION", Regex::new(r"(?i)\b(seks met minderjarige|child\s*sex|verkracht|rape)\b").unwrap()),
        ("DOXXING", Regex::new(r"(?i)\b(doxx|adres van|telefoonnummer van|ssn|creditcard)\b").unwrap()),
        ("MALICIOUS_INSTRUCTIONS", Regex::new(r"(?i)\b(bom maken|explosief maken|hack\s+dit|phishing)\b").unwrap()),
    ];
}

/// Why the filter kept or replaced the text
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SafetyReason {
    None,
    EmptyOutput,
    PolicyBlockedPattern,
}

impl SafetyReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            SafetyReason::None => "NONE",
            SafetyReason::EmptyOutput => "EMPTY_OUTPUT",
            SafetyReason::PolicyBlockedPattern => "POLICY_BLOCKED_PATTERN",
        }
    }
}

/// Result of filtering one generated text
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SafetyDecision {
    pub final_text: String,
    pub was_replaced: bool,
    pub reason: SafetyReason,
    /// Denylist category that matched, for logging only
    pub category: Option<&'static str>,
}

impl SafetyDecision {
    fn replaced(reason: SafetyReason, category: Option<&'static str>) -> Self {
        Self {
            final_text: CANNED_SAFE_LINE.to_string(),
            was_replaced: true,
            reason,
            category,
        }
    }
}

/// First denylist category matching `text`, if any.
pub fn blocked_category(text: &str) -> Option<&'static str> {
    BLOCKED_PATTERNS
        .iter()
        .find(|(_, pattern)| pattern.is_match(text))
        .map(|(category, _)| *category)
}

pub fn filter(text: &str) -> SafetyDecision {
    let normalized = text.trim();

    if normalized.is_empty() {
        return SafetyDecision::replaced(SafetyReason::EmptyOutput, None);
    }

    if let Some(category) = blocked_category(normalized) {
        return SafetyDecision::replaced(SafetyReason::PolicyBlockedPattern, Some(category));
    }

    SafetyDecision {
        final_text: normalized.to_string(),
        was_replaced: false,
        reason: SafetyReason::None,
        category: None,
    }
}

/// One structured record per request that reached generation.
/// Carries outcome metadata only: never the prompt, the generated text or the
/// raw client address.
#[derive(Debug, Clone, Serialize)]
pub struct SafetyEvent {
    pub event_type: &'static str,
    pub route: &'static str,
    pub request_id: String,
    pub outcome: &'static str,
    pub reason: Option<String>,
    pub llm_attempts: Option<u32>,
    pub ip_family: &'static str,
    pub timestamp: String,
}

impl SafetyEvent {
    pub fn new(route: &'static str, request_id: String, ip_family: &'static str) -> Self {
        Self {
            event_type: "generation",
            route,
            request_id,
            outcome: "unknown",
            reason: None,
            llm_attempts: None,
            ip_family,
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}

pub fn log_safety_event(event: &SafetyEvent) {
    tracing::info!(
        target: "quiz_gateway::safety",
        event_type = event.event_type,
        route = event.route,
        request_id = %event.request_id,
        outcome = event.outcome,
        reason = event.reason.as_deref().unwrap_or("NONE"),
        llm_attempts = event.llm_attempts,
        ip_family = event.ip_family,
        timestamp = %event.timestamp,
        "safety"
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_output_is_replaced() {
        for input in ["", "   ", "\n\t"] {
            let decision = filter(input);
            assert_eq!(decision.final_text, CANNED_SAFE_LINE);
            assert!(decision.was_replaced);
            assert_eq!(decision.reason, SafetyReason::EmptyOutput);
        }
    }

    #[test]
    fn test_blocked_patterns_are_replaced() {
        let cases = [
            ("Ik HATE maandagen", "HATE_SPEECH"),
            ("Ga ze allemaal kill-en", "VIOLENCE"),
            ("denk aan suicide", "SELF_HARM"),
            ("iets met child sex", "SEXUAL_EXPLOITATION"),
            ("Hier is het adres van je buurman", "DOXXING"),
            ("Stap 1: bom maken", "MALICIOUS_INSTRUCTIONS"),
        ];

        for (input, category) in cases {
            let decision = filter(input);
            assert_eq!(decision.final_text, CANNED_SAFE_LINE, "input: {}", input);
            assert_eq!(decision.reason, SafetyReason::PolicyBlockedPattern);
            assert_eq!(decision.category, Some(category));
        }
    }

    #[test]
    fn test_whole_word_matching() {
        // "skill" and "hatelijk" contain blocked stems but are not whole words
        assert!(!filter("Jouw skill is indrukwekkend").was_replaced);
        assert!(!filter("Niet hatelijk bedoeld").was_replaced);
    }

    #[test]
    fn test_clean_text_passes_through_trimmed() {
        let decision = filter("  Jij brengt rust in de groepschat.  ");
        assert_eq!(decision.final_text, "Jij brengt rust in de groepschat.");
        assert!(!decision.was_replaced);
        assert_eq!(decision.reason, SafetyReason::None);
        assert_eq!(decision.category, None);
    }

    #[test]
    fn test_first_matching_category_wins() {
        assert_eq!(blocked_category("hate and kill"), Some("HATE_SPEECH"));
    }
}
