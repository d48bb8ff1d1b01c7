use serde::{Deserialize, Serialize};
use std::fmt;

use crate::persona::Personality;

/// Animation tag the frontend plays alongside a reply. The serialized names
/// must match the client's animation set exactly.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Emotion {
    #[default]
    Idle,
    Angry,
    Shy,
    Greeting,
    Talking,
}

impl Emotion {
    pub fn as_str(&self) -> &'static str {
        match self {
            Emotion::Idle => "Idle",
            Emotion::Angry => "Angry",
            Emotion::Shy => "Shy",
            Emotion::Greeting => "Greeting",
            Emotion::Talking => "Talking",
        }
    }
}

impl fmt::Display for Emotion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

const ANGRY_WORDS: &[&str] = &["angry", "mad", "frustrated", "annoyed", "upset"];
const SHY_WORDS: &[&str] = &["shy", "blush", "embarrassed", "nervous", "awkward"];
const GREETING_WORDS: &[&str] = &["hello", "hi", "hey", "greetings", "welcome"];
const HAPPY_WORDS: &[&str] = &["happy", "excited", "great", "wonderful", "amazing"];

fn words(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric() && c != '\'')
        .filter(|w| !w.is_empty())
        .map(|w| w.to_lowercase())
        .collect()
}

fn any_word(words: &[String], wanted: &[&str]) -> bool {
    words.iter().any(|w| wanted.contains(&w.as_str()))
}

/// Pick the animation for a reply.
///
/// Persona-specific cues win over the general keyword groups. Replies that
/// match nothing are `Talking`, since the character is speaking.
pub fn detect(text: &str, personality: Personality) -> Emotion {
    let lower = text.to_lowercase();
    let words = words(&lower);

    match personality {
        Personality::Tsundere => {
            if lower.contains("not like") || any_word(&words, &["whatever", "hmph", "baka"]) {
                return Emotion::Angry;
            }
            if any_word(&words, &["maybe", "suppose", "fine", "okay"]) {
                return Emotion::Shy;
            }
        }
        Personality::Dandere => {
            if lower.contains("excuse me") || any_word(&words, &["um", "uh", "sorry"]) {
                return Emotion::Shy;
            }
        }
        Personality::Yandere => {
            if any_word(&words, &["only", "mine", "together", "forever"]) {
                return Emotion::Greeting;
            }
        }
        Personality::Friendly | Personality::Kuudere => {}
    }

    if any_word(&words, ANGRY_WORDS) {
        Emotion::Angry
    } else if any_word(&words, SHY_WORDS) || lower.contains(">///<") || lower.contains(">.<") {
        Emotion::Shy
    } else if any_word(&words, GREETING_WORDS) || any_word(&words, HAPPY_WORDS) {
        Emotion::Greeting
    } else {
        Emotion::Talking
    }
}
