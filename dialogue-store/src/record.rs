//! Core searchable record types.
//!
//! All wire structs are serde-compatible with the JSON emitted by the asset
//! build (camelCase keys, hyphenated scenario tags).

use serde::{Deserialize, Serialize};

/// Category tag attached to every dialogue record, one query filter
/// dimension. The set is closed: the asset build emits exactly these tags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ScenarioType {
    #[serde(rename = "main")]
    Main,
    #[serde(rename = "card")]
    Card,
    #[serde(rename = "event")]
    Event,
    #[serde(rename = "love")]
    Love,
    #[serde(rename = "caulis")]
    Caulis,
    #[serde(rename = "campaign")]
    Campaign,
    #[serde(rename = "login-event")]
    LoginEvent,
    #[serde(rename = "ep-spot")]
    EpSpot,
    #[serde(rename = "ep-chara")]
    EpChara,
    #[serde(rename = "ep-card")]
    EpCard,
    #[serde(rename = "ep-special-1st")]
    EpSpecial1st,
    #[serde(rename = "ep-special-2nd")]
    EpSpecial2nd,
}

impl ScenarioType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Main => "main",
            Self::Card => "card",
            Self::Event => "event",
            Self::Love => "love",
            Self::Caulis => "caulis",
            Self::Campaign => "campaign",
            Self::LoginEvent => "login-event",
            Self::EpSpot => "ep-spot",
            Self::EpChara => "ep-chara",
            Self::EpCard => "ep-card",
            Self::EpSpecial1st => "ep-special-1st",
            Self::EpSpecial2nd => "ep-special-2nd",
        }
    }

    /// Parses the hyphenated wire form; `None` for unknown tags.
    pub fn parse(s: &str) -> Option<Self> {
        Some(match s {
            "main" => Self::Main,
            "card" => Self::Card,
            "event" => Self::Event,
            "love" => Self::Love,
            "caulis" => Self::Caulis,
            "campaign" => Self::Campaign,
            "login-event" => Self::LoginEvent,
            "ep-spot" => Self::EpSpot,
            "ep-chara" => Self::EpChara,
            "ep-card" => Self::EpCard,
            "ep-special-1st" => Self::EpSpecial1st,
            "ep-special-2nd" => Self::EpSpecial2nd,
            _ => return None,
        })
    }
}

impl std::fmt::Display for ScenarioType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One searchable utterance. Immutable once produced; the corpus index owns
/// the assembled collection and never mutates records in place.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DialogueRecord {
    pub scenario_type: ScenarioType,
    /// Composite key such as `"<group>-<episode>"`.
    pub scenario_id: String,
    pub speaker: String,
    /// May contain newlines.
    pub content: String,
    /// Episode title; the asset build always writes it, empty when unknown.
    #[serde(default)]
    pub title: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scenario_type_wire_form_round_trips() {
        for tag in [
            "main",
            "card",
            "event",
            "love",
            "caulis",
            "campaign",
            "login-event",
            "ep-spot",
            "ep-chara",
            "ep-card",
            "ep-special-1st",
            "ep-special-2nd",
        ] {
            let t = ScenarioType::parse(tag).unwrap();
            assert_eq!(t.as_str(), tag);
            let json = serde_json::to_string(&t).unwrap();
            assert_eq!(json, format!("\"{tag}\""));
            let back: ScenarioType = serde_json::from_str(&json).unwrap();
            assert_eq!(back, t);
        }
        assert!(ScenarioType::parse("ep-unknown").is_none());
    }

    #[test]
    fn record_accepts_missing_title() {
        let r: DialogueRecord = serde_json::from_str(
            r#"{"scenarioType":"main","scenarioId":"1-1","speaker":"Oz","content":"..."}"#,
        )
        .unwrap();
        assert_eq!(r.title, "");
        assert_eq!(r.scenario_type, ScenarioType::Main);
    }
}
