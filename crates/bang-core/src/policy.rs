use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::DraftError;

/// Wire form of a policy. Condition fields (`greater`, `less`, ...) sit
/// beside `occurences` and `escalation`; the misspelling is the server's.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PolicyConfig {
    pub name: String,
    #[serde(rename = "match", default, skip_serializing_if = "Option::is_none")]
    pub match_fields: Option<BTreeMap<String, String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub not_match: Option<NotMatch>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub crit: Option<Condition>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub warn: Option<Condition>,
}

impl PolicyConfig {
    /// Valid but never fires.
    pub fn is_inert(&self) -> bool {
        self.match_fields.is_none()
            && self.not_match.is_none()
            && self.crit.is_none()
            && self.warn.is_none()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotMatch {
    #[serde(rename = "occurences", default)]
    pub occurrences: u32,
    #[serde(flatten)]
    pub fields: BTreeMap<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Condition {
    #[serde(rename = "occurences", default)]
    pub occurrences: u32,
    #[serde(default)]
    pub escalation: String,
    #[serde(flatten)]
    pub fields: BTreeMap<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chip {
    pub key: String,
    pub value: String,
}

impl Chip {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Result<Self, DraftError> {
        let key = key.into();
        let value = value.into();
        if key.trim().is_empty() || value.trim().is_empty() {
            return Err(DraftError::EmptyChip);
        }
        Ok(Self { key, value })
    }
}

fn chip_map(chips: &[Chip]) -> BTreeMap<String, Value> {
    chips
        .iter()
        .map(|chip| (chip.key.clone(), Value::String(chip.value.clone())))
        .collect()
}

/// Crit or warn section under construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConditionDraft {
    chips: Vec<Chip>,
    occurrences: u32,
    escalation: Option<String>,
}

impl Default for ConditionDraft {
    fn default() -> Self {
        Self {
            chips: Vec::new(),
            occurrences: 1,
            escalation: None,
        }
    }
}

impl ConditionDraft {
    pub fn add_chip(&mut self, key: impl Into<String>, value: impl Into<String>) -> Result<(), DraftError> {
        self.chips.push(Chip::new(key, value)?);
        Ok(())
    }

    pub fn remove_chip(&mut self, index: usize) -> Option<Chip> {
        (index < self.chips.len()).then(|| self.chips.remove(index))
    }

    pub fn chips(&self) -> &[Chip] {
        &self.chips
    }

    pub fn occurrences(&self) -> u32 {
        self.occurrences
    }

    pub fn set_occurrences(&mut self, occurrences: u32) {
        self.occurrences = occurrences;
    }

    pub fn escalation(&self) -> Option<&str> {
        self.escalation.as_deref()
    }

    pub fn set_escalation(&mut self, escalation: Option<String>) {
        self.escalation = escalation.filter(|name| !name.trim().is_empty());
    }

    // Emitted only with at least one chip and an escalation target.
    fn build(&self) -> Option<Condition> {
        let escalation = self.escalation.as_ref()?;
        if self.chips.is_empty() {
            return None;
        }
        Some(Condition {
            occurrences: self.occurrences,
            escalation: escalation.clone(),
            fields: chip_map(&self.chips),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PolicyDraft {
    name: String,
    match_chips: Vec<Chip>,
    not_match_chips: Vec<Chip>,
    not_match_occurrences: u32,
    crit: ConditionDraft,
    warn: ConditionDraft,
}

impl Default for PolicyDraft {
    fn default() -> Self {
        Self {
            name: String::new(),
            match_chips: Vec::new(),
            not_match_chips: Vec::new(),
            not_match_occurrences: 1,
            crit: ConditionDraft::default(),
            warn: ConditionDraft::default(),
        }
    }
}

impl PolicyDraft {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    pub fn add_match(&mut self, key: impl Into<String>, value: impl Into<String>) -> Result<(), DraftError> {
        self.match_chips.push(Chip::new(key, value)?);
        Ok(())
    }

    pub fn match_chips(&self) -> &[Chip] {
        &self.match_chips
    }

    pub fn add_not_match(&mut self, key: impl Into<String>, value: impl Into<String>) -> Result<(), DraftError> {
        self.not_match_chips.push(Chip::new(key, value)?);
        Ok(())
    }

    pub fn not_match_chips(&self) -> &[Chip] {
        &self.not_match_chips
    }

    pub fn set_not_match_occurrences(&mut self, occurrences: u32) {
        self.not_match_occurrences = occurrences;
    }

    pub fn crit(&self) -> &ConditionDraft {
        &self.crit
    }

    pub fn crit_mut(&mut self) -> &mut ConditionDraft {
        &mut self.crit
    }

    pub fn warn(&self) -> &ConditionDraft {
        &self.warn
    }

    pub fn warn_mut(&mut self) -> &mut ConditionDraft {
        &mut self.warn
    }

    /// Assembles the policy. Empty sections are left out, and crit/warn are
    /// also left out when no escalation target is set.
    pub fn build_policy(&self) -> Result<PolicyConfig, DraftError> {
        if self.name.trim().is_empty() {
            return Err(DraftError::MissingName);
        }

        let match_fields = (!self.match_chips.is_empty()).then(|| {
            self.match_chips
                .iter()
                .map(|chip| (chip.key.clone(), chip.value.clone()))
                .collect()
        });

        let not_match = (!self.not_match_chips.is_empty()).then(|| NotMatch {
            occurrences: self.not_match_occurrences,
            fields: chip_map(&self.not_match_chips),
        });

        Ok(PolicyConfig {
            name: self.name.clone(),
            match_fields,
            not_match,
            crit: self.crit.build(),
            warn: self.warn.build(),
        })
    }
}
