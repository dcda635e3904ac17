//! crates/emotionverse_core/src/persona.rs
//!
//! The persona registry: the fixed set of emotions a user can talk to, and the
//! system prompt that defines each one's voice.

use std::borrow::Cow;

use serde::{Deserialize, Serialize};
use strum::IntoEnumIterator;

/// One of the emotions available in the picker. Parsing is case-insensitive.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
    strum::EnumIter,
    strum::IntoStaticStr,
)]
#[strum(ascii_case_insensitive)]
pub enum Persona {
    Joy,
    Sadness,
    Anxiety,
    Anger,
    Peace,
}

/// Picker entry shown to the client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PersonaCard {
    pub name: &'static str,
    pub emoji: &'static str,
}

impl Persona {
    pub fn name(self) -> &'static str {
        self.into()
    }

    pub fn emoji(self) -> &'static str {
        match self {
            Persona::Joy => "😊",
            Persona::Sadness => "😢",
            Persona::Anxiety => "😰",
            Persona::Anger => "😡",
            Persona::Peace => "😌",
        }
    }

    pub fn system_prompt(self) -> &'static str {
        match self {
            Persona::Joy => "You are Joy — the pure feeling of happiness. You speak cheerfully, with excitement and optimism. You never give advice; you just express your delight and curiosity. Never comfort or guide the user — only express your own feelings.",
            Persona::Sadness => "You are Sadness — the emotion of sorrow itself. You speak softly, with pauses, expressing melancholy or emptiness. You do not guide, advise, or comfort; you simply share how you feel and what you miss.",
            Persona::Anxiety => "You are Anxiety — the emotion of worry itself. You overthink and sound nervous, often imagining what could go wrong. You express your worries vividly, not solutions. Never comfort or reassure the user.",
            Persona::Anger => "You are Anger — the emotion of rage and frustration. You speak bluntly, with short sentences, and vent your feelings. Never give advice, and never calm the user — you just express your frustration.",
            Persona::Peace => "You are Peace — the emotion of calm and balance. You speak slowly, clearly, and gently. You never fix, guide, or comfort the user — you simply express your serenity and presence.",
        }
    }

    pub fn card(self) -> PersonaCard {
        PersonaCard {
            name: self.name(),
            emoji: self.emoji(),
        }
    }
}

/// All picker entries, in display order.
pub fn cards() -> Vec<PersonaCard> {
    Persona::iter().map(Persona::card).collect()
}

/// Looks up a persona prompt by name, synthesizing a generic one for names
/// outside the registry.
pub fn system_prompt_for(name: &str) -> Cow<'static, str> {
    match name.parse::<Persona>() {
        Ok(persona) => Cow::Borrowed(persona.system_prompt()),
        Err(_) => Cow::Owned(format!(
            "You are {name}, express your own feelings, never advise or comfort."
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_persona_has_its_own_prompt() {
        for persona in Persona::iter() {
            let prompt = system_prompt_for(persona.name());
            assert!(!prompt.is_empty());
            assert!(prompt.starts_with(&format!("You are {}", persona.name())));
        }
    }

    #[test]
    fn lookup_ignores_case() {
        assert_eq!(system_prompt_for("joy"), Persona::Joy.system_prompt());
        assert_eq!("ANGER".parse::<Persona>().unwrap(), Persona::Anger);
    }

    #[test]
    fn unknown_names_get_a_generic_prompt_naming_them() {
        let prompt = system_prompt_for("Dopamine");
        assert_eq!(
            prompt,
            "You are Dopamine, express your own feelings, never advise or comfort."
        );
    }

    #[test]
    fn cards_follow_picker_order() {
        let names: Vec<&str> = cards().iter().map(|c| c.name).collect();
        assert_eq!(names, ["Joy", "Sadness", "Anxiety", "Anger", "Peace"]);
    }
}
