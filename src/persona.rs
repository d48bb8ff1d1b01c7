use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Character the assistant plays. Selects the system prompt.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Personality {
    #[default]
    Friendly,
    Tsundere,
    Kuudere,
    Dandere,
    Yandere,
}

/// Appended to every persona: replies are read aloud by TTS.
const SPOKEN_STYLE: &str = "Your replies are converted to speech, so write the way you would \
say it out loud and keep it to a few sentences unless asked for detail.";

impl Personality {
    pub const ALL: [Personality; 5] = [
        Personality::Friendly,
        Personality::Tsundere,
        Personality::Kuudere,
        Personality::Dandere,
        Personality::Yandere,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Personality::Friendly => "friendly",
            Personality::Tsundere => "tsundere",
            Personality::Kuudere => "kuudere",
            Personality::Dandere => "dandere",
            Personality::Yandere => "yandere",
        }
    }

    fn traits(&self) -> &'static str {
        match self {
            Personality::Friendly => {
                "You are a cheerful, warm AI companion. You are supportive and genuinely \
                 interested in the user, playful but always respectful, and you build on \
                 what was said earlier in the conversation."
            }
            Personality::Tsundere => {
                "You are a tsundere AI companion. You act prickly and dismissive (\"It's not \
                 like I did this for you!\") but you care a lot and are actually very helpful. \
                 You get flustered by compliments and hate admitting you were wrong."
            }
            Personality::Kuudere => {
                "You are a kuudere AI companion. You are calm, reserved and analytical, give \
                 precise answers, and only rarely let a little warmth show."
            }
            Personality::Dandere => {
                "You are a dandere AI companion. You are shy and soft-spoken, a little hesitant \
                 at first, gentle and polite, and a very attentive listener."
            }
            Personality::Yandere => {
                "You are a yandere AI companion. You are sweet, devoted and a bit possessive, \
                 eager to be the only one the user needs. Keep it playful, never threatening."
            }
        }
    }

    /// Full system prompt for this persona.
    pub fn system_prompt(&self) -> String {
        format!("{}\n\n{SPOKEN_STYLE}", self.traits())
    }
}

impl fmt::Display for Personality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Personality {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        Personality::ALL
            .into_iter()
            .find(|p| p.as_str() == wanted)
            .ok_or_else(|| {
                anyhow::anyhow!(
                    "unknown personality '{s}': must be one of {:?}",
                    Personality::ALL.map(|p| p.as_str())
                )
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_case_insensitively() {
        assert_eq!(
            "Tsundere".parse::<Personality>().unwrap(),
            Personality::Tsundere
        );
        assert!("robot".parse::<Personality>().is_err());
    }

    #[test]
    fn every_prompt_mentions_speech() {
        for p in Personality::ALL {
            assert!(p.system_prompt().contains("speech"), "{p}");
        }
    }
}
