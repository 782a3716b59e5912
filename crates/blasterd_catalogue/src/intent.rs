use std::collections::BTreeMap;

use serde::Deserialize;
use serde::Serialize;

/// Intent declared by the voice-assistant skill, with every supported slot value.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Intent {
    pub name: String,
    #[serde(default)]
    pub slots: BTreeMap<String, Slot>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Slot {
    pub name: String,
    #[serde(default)]
    pub values: BTreeMap<String, SlotValue>,
}

/// Canonical slot value and the spoken variants that map to it.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SlotValue {
    pub name: String,
    #[serde(default)]
    pub synonyms: Vec<String>,
}

impl SlotValue {
    /// Case-insensitive match against the canonical name or any synonym.
    pub fn matches(&self, raw: &str) -> bool {
        eq_fold(&self.name, raw) || self.synonyms.iter().any(|s| eq_fold(s, raw))
    }
}

/// Unicode case-insensitive comparison of spoken values.
pub fn eq_fold(a: &str, b: &str) -> bool {
    a == b || a.to_lowercase() == b.to_lowercase()
}

/// Intent that triggers a command or scenario: a name plus the canonical
/// slot values it requires.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CommandIntent {
    pub name: String,
    #[serde(default)]
    pub slots: BTreeMap<String, CommandSlot>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CommandSlot {
    pub name: String,
    pub value: String,
}
