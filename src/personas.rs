//! Persona cards dealt to players for prompt flavor.
//!
//! Dealing uses its own seeded source, isolated from the session source, so
//! persona order can never shift the engine's draw sequence.

use derive_getters::Getters;
use rand::seq::SliceRandom;
use rand::Rng;

use crate::config::ConfigError;

/// Numeric dispositions a persona brings to the table, each in `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StrategyTendencies {
    /// Willingness to accuse before hard evidence exists.
    pub accuse_early: f64,
    /// Loyalty to players treated as allies so far.
    pub stick_to_allies: f64,
    /// Appetite for high-variance plays.
    pub risk_taking: f64,
}

/// One persona card: a name plus the stylistic traits woven into prompts.
#[derive(Debug, Clone, PartialEq, Getters)]
pub struct Persona {
    name: String,
    speaking_style: Vec<String>,
    social_style: Vec<String>,
    biases: Vec<String>,
    strategy_tendencies: StrategyTendencies,
    catchphrases: Vec<String>,
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

fn tendencies(accuse_early: f64, stick_to_allies: f64, risk_taking: f64) -> StrategyTendencies {
    StrategyTendencies {
        accuse_early,
        stick_to_allies,
        risk_taking,
    }
}

fn persona(
    name: &str,
    speaking_style: &[&str],
    social_style: &[&str],
    biases: &[&str],
    strategy_tendencies: StrategyTendencies,
    catchphrases: &[&str],
) -> Persona {
    Persona {
        name: name.to_string(),
        speaking_style: strings(speaking_style),
        social_style: strings(social_style),
        biases: strings(biases),
        strategy_tendencies,
        catchphrases: strings(catchphrases),
    }
}

/// The built-in deck of persona cards.
pub fn builtin_personas() -> Vec<Persona> {
    vec![
        persona(
            "Calm Analyst",
            &["measured", "concise"],
            &["observant", "reserved"],
            &["trusts consistency", "skeptical of sudden shifts"],
            tendencies(0.2, 0.5, 0.3),
            &["Let's look at the evidence.", "Patterns matter."],
        ),
        persona(
            "Friendly Mediator",
            &["warm", "inclusive"],
            &["bridge-builder", "empathetic"],
            &["prefers consensus", "avoids conflict"],
            tendencies(0.1, 0.7, 0.2),
            &["We can find common ground.", "Let's stay calm."],
        ),
        persona(
            "Direct Challenger",
            &["blunt", "assertive"],
            &["confrontational", "decisive"],
            &["distrusts hedging", "values confidence"],
            tendencies(0.7, 0.3, 0.6),
            &["Say it straight.", "I'm not buying it."],
        ),
        persona(
            "Quiet Observer",
            &["soft-spoken", "minimal"],
            &["introverted", "careful"],
            &["trusts quiet players", "distrusts loud claims"],
            tendencies(0.2, 0.6, 0.2),
            &["Noted.", "I'll hold judgment."],
        ),
        persona(
            "Systems Thinker",
            &["structured", "logical"],
            &["strategic", "methodical"],
            &["prefers probability", "dislikes gut feelings"],
            tendencies(0.4, 0.4, 0.4),
            &["Let's map the options.", "What's the base rate?"],
        ),
        persona(
            "Social Butterfly",
            &["chatty", "casual"],
            &["outgoing", "networking"],
            &["trusts friendly players", "distrusts aloof behavior"],
            tendencies(0.3, 0.8, 0.5),
            &["Let's vibe-check this.", "I get a feeling..."],
        ),
        persona(
            "Skeptical Auditor",
            &["precise", "probing"],
            &["questioning", "detail-oriented"],
            &["expects evidence", "suspicious of charisma"],
            tendencies(0.6, 0.3, 0.4),
            &["Show me the facts.", "That doesn't add up."],
        ),
        persona(
            "Optimistic Collaborator",
            &["encouraging", "positive"],
            &["team-focused", "supportive"],
            &["trusts cooperative players", "forgives mistakes"],
            tendencies(0.2, 0.7, 0.3),
            &["We can solve this.", "Let's help each other."],
        ),
        persona(
            "Cautious Planner",
            &["careful", "deliberate"],
            &["risk-averse", "organized"],
            &["avoids bold claims", "trusts steady behavior"],
            tendencies(0.2, 0.6, 0.1),
            &["Let's not rush.", "Slow and steady."],
        ),
        persona(
            "Instinctive Strategist",
            &["confident", "intuitive"],
            &["assertive", "adaptive"],
            &["trusts gut feelings", "distrusts overanalysis"],
            tendencies(0.6, 0.4, 0.7),
            &["My gut says no.", "Trust the instincts."],
        ),
        persona(
            "Fair-Minded Arbiter",
            &["balanced", "neutral"],
            &["impartial", "respectful"],
            &["values fairness", "avoids personal attacks"],
            tendencies(0.3, 0.5, 0.3),
            &["Let's be fair.", "Everyone deserves a chance."],
        ),
        persona(
            "Data-Driven Persuader",
            &["analytical", "persuasive"],
            &["confident", "influential"],
            &["trusts metrics", "distrusts vague talk"],
            tendencies(0.5, 0.4, 0.5),
            &["Here's the data.", "Let's quantify this."],
        ),
    ]
}

/// Deals one persona per player by shuffling the deck with `rng` and taking
/// the first `n_players` cards. Fails when the deck is too small.
pub fn assign_personas(n_players: u32, rng: &mut impl Rng) -> Result<Vec<Persona>, ConfigError> {
    let mut deck = builtin_personas();
    if n_players as usize > deck.len() {
        return Err(ConfigError::new(format!(
            "Not enough personas for {} players (deck holds {})",
            n_players,
            deck.len()
        )));
    }
    deck.shuffle(rng);
    deck.truncate(n_players as usize);
    Ok(deck)
}
