use anyhow::{anyhow, Result};
use bang_core::{EscalationDraft, StepType};

/// Parses a `key=value` chip from the command line.
pub(crate) fn parse_chip(raw: &str) -> Result<(String, String), String> {
    let (key, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected key=value, got {raw:?}"))?;
    let key = key.trim();
    if key.is_empty() {
        return Err(format!("missing key in {raw:?}"));
    }
    Ok((key.to_string(), value.to_string()))
}

/// Applies `type[:field=value[;field=value]...]` to the draft and commits it
/// as a step. Values left out keep whatever the type last had.
pub(crate) fn apply_step_spec(draft: &mut EscalationDraft, spec: &str) -> Result<()> {
    let (kind, options) = spec.split_once(':').unwrap_or((spec, ""));
    let kind: StepType = kind.trim().parse()?;
    draft.select_type(kind);

    for pair in options.split(';').filter(|p| !p.trim().is_empty()) {
        let (field, value) = pair
            .split_once('=')
            .ok_or_else(|| anyhow!("expected field=value in step {spec:?}, got {pair:?}"))?;
        draft.set_option(field.trim(), value)?;
    }

    draft.add_step()?;
    Ok(())
}
