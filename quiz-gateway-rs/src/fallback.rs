// quiz-gateway-rs/src/fallback.rs
// Deterministic canned sentences used whenever generation is unavailable.

use crate::types::{Archetype, DramaLevel};

pub const DEFAULT_FALLBACK: &str = "Blijf in beweging; progressie ontstaat stap voor stap.";

const FALLBACKS: &[(Archetype, DramaLevel, &str)] = &[
    (Archetype::Mentor, DramaLevel::Low, "Houd koers: kleine, consistente stappen brengen je verder."),
    (Archetype::Mentor, DramaLevel::Medium, "Je bent dichterbij dan je denkt; focus op de volgende haalbare stap."),
    (Archetype::Mentor, DramaLevel::High, "Adem in, herpak je richting, en zet vandaag één moedige stap vooruit."),
    (Archetype::Rebel, DramaLevel::Low, "Breek het patroon subtiel: kies één ding dat jij vandaag anders doet."),
    (Archetype::Rebel, DramaLevel::Medium, "Durf de status quo te challengen; jouw aanpak mag scherp en origineel zijn."),
    (Archetype::Rebel, DramaLevel::High, "Dit is je moment om regels te herschrijven en je stem voluit te laten horen."),
    (Archetype::Sage, DramaLevel::Low, "Helderheid komt uit rust: observeer, weeg af, en kies bewust."),
    (Archetype::Sage, DramaLevel::Medium, "Verbind feiten met gevoel; wijsheid zit in de nuance tussen beide."),
    (Archetype::Sage, DramaLevel::High, "In de ruis ligt inzicht verborgen: vertraag en laat het patroon zichtbaar worden."),
    (Archetype::Explorer, DramaLevel::Low, "Neem een kleine afslag buiten je routine en kijk wat het je oplevert."),
    (Archetype::Explorer, DramaLevel::Medium, "Nieuw terrein vraagt lef; probeer iets dat je nog niet eerder deed."),
    (Archetype::Explorer, DramaLevel::High, "Volg je nieuwsgierigheid radicaal: avontuur begint precies waar zekerheid stopt."),
];

/// Canned sentence for the pair, or `DEFAULT_FALLBACK` when the table has none.
pub fn get_fallback(archetype: Archetype, drama: DramaLevel) -> &'static str {
    FALLBACKS
        .iter()
        .find(|(a, d, _)| *a == archetype && *d == drama)
        .map(|(_, _, line)| *line)
        .unwrap_or(DEFAULT_FALLBACK)
}
