use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{DraftError, SubmitError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepType {
    PagerDuty,
    Email,
    Console,
    GrafanaGraphiteAnnotation,
}

impl StepType {
    pub const ALL: [StepType; 4] = [
        StepType::PagerDuty,
        StepType::Email,
        StepType::Console,
        StepType::GrafanaGraphiteAnnotation,
    ];

    pub fn name(self) -> &'static str {
        match self {
            StepType::PagerDuty => "pager_duty",
            StepType::Email => "email",
            StepType::Console => "console",
            StepType::GrafanaGraphiteAnnotation => "grafana_graphite_annotation",
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            StepType::PagerDuty => "Pagerduty",
            StepType::Email => "Email",
            StepType::Console => "Console",
            StepType::GrafanaGraphiteAnnotation => "Grafana Graphite Annotation",
        }
    }

    pub fn options(self) -> &'static [OptionField] {
        match self {
            StepType::PagerDuty => PAGER_DUTY_OPTIONS,
            StepType::Email => EMAIL_OPTIONS,
            StepType::Console => &[],
            StepType::GrafanaGraphiteAnnotation => GRAPHITE_OPTIONS,
        }
    }

    pub fn option(self, field: &str) -> Option<&'static OptionField> {
        self.options().iter().find(|opt| opt.name == field)
    }
}

impl fmt::Display for StepType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for StepType {
    type Err = DraftError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        StepType::ALL
            .into_iter()
            .find(|kind| kind.name() == s)
            .ok_or_else(|| DraftError::UnknownStepType(s.to_string()))
    }
}

/// How an option's raw input becomes its wire value when a step is committed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transform {
    Identity,
    SplitComma,
    /// Falls back to the raw string when it does not parse; the server
    /// rejects what it cannot use.
    Numeric,
}

impl Transform {
    pub fn apply(self, raw: &str) -> Value {
        match self {
            Transform::Identity => Value::String(raw.to_string()),
            Transform::SplitComma => Value::Array(
                raw.split(',')
                    .map(str::trim)
                    .filter(|part| !part.is_empty())
                    .map(|part| Value::String(part.to_string()))
                    .collect(),
            ),
            Transform::Numeric => {
                let trimmed = raw.trim();
                if let Ok(n) = trimmed.parse::<i64>() {
                    Value::from(n)
                } else if let Some(n) = trimmed
                    .parse::<f64>()
                    .ok()
                    .and_then(serde_json::Number::from_f64)
                {
                    Value::Number(n)
                } else {
                    Value::String(raw.to_string())
                }
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OptionField {
    pub name: &'static str,
    pub title: &'static str,
    pub default: &'static str,
    pub transform: Transform,
}

const fn field(name: &'static str, title: &'static str, default: &'static str) -> OptionField {
    OptionField {
        name,
        title,
        default,
        transform: Transform::Identity,
    }
}

const fn numeric(name: &'static str, title: &'static str, default: &'static str) -> OptionField {
    OptionField {
        name,
        title,
        default,
        transform: Transform::Numeric,
    }
}

const PAGER_DUTY_OPTIONS: &[OptionField] = &[field("key", "Api Key", ""), field("subdomain", "Subdomain", "")];

const EMAIL_OPTIONS: &[OptionField] = &[
    OptionField {
        name: "recipients",
        title: "To",
        default: "",
        transform: Transform::SplitComma,
    },
    field("sender", "From", ""),
    field("user", "User", ""),
    field("password", "Password", ""),
    field("host", "Host", "smtp.gmail.com"),
    numeric("port", "Port", "465"),
];

const GRAPHITE_OPTIONS: &[OptionField] = &[field("host", "Host", ""), numeric("port", "Port", "2003")];

/// One committed notification step. Options sit beside `type` on the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EscalationStep {
    #[serde(rename = "type")]
    pub kind: StepType,
    #[serde(flatten)]
    pub options: BTreeMap<String, Value>,
}

/// Operator input for a named escalation. Option values are kept per step
/// type, so switching type and back does not lose what was typed.
#[derive(Debug, Clone, Default)]
pub struct EscalationDraft {
    name: String,
    step_type: Option<StepType>,
    values: HashMap<StepType, BTreeMap<&'static str, String>>,
    steps: Vec<EscalationStep>,
}

impl EscalationDraft {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    pub fn step_type(&self) -> Option<StepType> {
        self.step_type
    }

    pub fn select_type(&mut self, kind: StepType) {
        self.values.entry(kind).or_insert_with(|| {
            kind.options()
                .iter()
                .map(|opt| (opt.name, opt.default.to_string()))
                .collect()
        });
        self.step_type = Some(kind);
    }

    pub fn option_value(&self, field: &str) -> Option<&str> {
        let kind = self.step_type?;
        self.values.get(&kind)?.get(field).map(String::as_str)
    }

    pub fn set_option(&mut self, field: &str, value: impl Into<String>) -> Result<(), DraftError> {
        let kind = self.step_type.ok_or(DraftError::MissingStepType)?;
        let opt = kind.option(field).ok_or_else(|| DraftError::UnknownOption {
            step: kind.name().to_string(),
            field: field.to_string(),
        })?;
        self.values.entry(kind).or_default().insert(opt.name, value.into());
        Ok(())
    }

    /// Snapshots the selected type's current values into a new step at the
    /// end of the list.
    pub fn add_step(&mut self) -> Result<&EscalationStep, DraftError> {
        let kind = self.step_type.ok_or(DraftError::MissingStepType)?;
        let values = self.values.get(&kind);

        let options = kind
            .options()
            .iter()
            .map(|opt| {
                let raw = values
                    .and_then(|v| v.get(opt.name))
                    .map(String::as_str)
                    .unwrap_or(opt.default);
                (opt.name.to_string(), opt.transform.apply(raw))
            })
            .collect();

        self.steps.push(EscalationStep { kind, options });
        // never empty right after the push
        self.steps.last().ok_or(DraftError::MissingStepType)
    }

    pub fn remove_step(&mut self, index: usize) -> Option<EscalationStep> {
        (index < self.steps.len()).then(|| self.steps.remove(index))
    }

    pub fn steps(&self) -> &[EscalationStep] {
        &self.steps
    }

    pub(crate) fn payload(&self) -> Result<(String, Value), SubmitError> {
        if self.name.trim().is_empty() {
            return Err(DraftError::MissingName.into());
        }
        let body = serde_json::to_value(&self.steps)?;
        Ok((self.name.clone(), body))
    }
}
