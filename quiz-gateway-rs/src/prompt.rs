// quiz-gateway-rs/src/prompt.rs
// Prompt Builder: maps a validated request to the text sent to the provider.
// Pure and deterministic; the same request always yields the same prompt.

use crate::types::{Drama, GenerationRequest};

/// Fixed generation constraints, appended to every prompt
const CONSTRAINT_LINES: &[&str] = &[
    "Schrijf precies één zin in het Nederlands, maximaal 25 woorden.",
    "Toon: speels, luchtig en positief.",
    "Geen diagnoses, geen medische of psychologische labels.",
    "Niet kwetsend: geen beledigingen, intimidatie of stereotypen.",
];

pub fn build_prompt(request: &GenerationRequest) -> String {
    let mut lines = vec![format!("Archetype: {}", request.archetype)];

    match request.drama {
        Drama::Level(level) => lines.push(format!("Drama: {}", level)),
        Drama::Score(score) => {
            lines.push(format!("Drama: {}", request.drama_level()));
            lines.push(format!("Drama score: {}/100", score));
        }
    }

    if let Some(engagement) = request.engagement_score {
        lines.push(format!("Engagement score: {}/100", engagement));
    }

    lines.push(format!("Emoji level: {}", request.emoji_level));

    if let Some(locale) = &request.locale {
        lines.push(format!("Locale: {}", locale));
    }

    lines.push(format!("User prompt: {}", request.prompt_hint));
    lines.extend(CONSTRAINT_LINES.iter().map(|line| line.to_string()));

    lines.join("\n")
}
