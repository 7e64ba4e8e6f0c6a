//! Attack schedule entries.

use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

use crate::validation::{invalid, validate_symbol_name, validate_time_ms};

/// One attack on one mote. Times are milliseconds of simulated time.
#[derive(Debug, Serialize, Deserialize, Validate, Clone, PartialEq)]
#[validate(schema(function = "validate_attack"))]
pub struct AttackConfig {
    pub symbol: String,
    pub target: u32,
    pub start_ms: u64,
    pub end_ms: u64,
    #[serde(default)]
    #[validate(nested)]
    pub program: Option<FaultProgramConfig>,
}

#[derive(Debug, Serialize, Deserialize, Validate, Clone, PartialEq)]
#[validate(schema(function = "validate_program"))]
pub struct FaultProgramConfig {
    /// Variable the steps write to. Defaults to the attack's own symbol.
    #[serde(default)]
    pub symbol: Option<String>,
    pub steps: Vec<FaultStepConfig>,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
pub struct FaultStepConfig {
    pub at_ms: u64,
    pub value: u8,
}

fn validate_attack(attack: &AttackConfig) -> Result<(), ValidationError> {
    validate_symbol_name(&attack.symbol)?;
    validate_time_ms(attack.start_ms)?;
    validate_time_ms(attack.end_ms)?;
    if attack.start_ms > attack.end_ms {
        return Err(invalid("inverted_window", "start_ms must not exceed end_ms"));
    }
    Ok(())
}

fn validate_program(program: &FaultProgramConfig) -> Result<(), ValidationError> {
    if let Some(symbol) = &program.symbol {
        validate_symbol_name(symbol)?;
    }
    for step in &program.steps {
        validate_time_ms(step.at_ms)?;
    }
    if program.steps.windows(2).any(|w| w[0].at_ms > w[1].at_ms) {
        return Err(invalid("unordered_steps", "steps must be sorted by at_ms"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn attack(symbol: &str, start_ms: u64, end_ms: u64) -> AttackConfig {
        AttackConfig {
            symbol: symbol.into(),
            target: 7,
            start_ms,
            end_ms,
            program: None,
        }
    }

    #[test]
    fn accepts_empty_window() {
        assert!(attack("SHA_on", 500, 500).validate().is_ok());
    }

    #[test]
    fn rejects_inverted_window_and_bad_symbol() {
        assert!(attack("SHA_on", 600, 500).validate().is_err());
        assert!(attack("SHA on", 0, 500).validate().is_err());
    }

    #[test]
    fn rejects_times_past_microsecond_range() {
        let max = crate::validation::MAX_TIME_MS;
        assert!(attack("SHA_on", max, max).validate().is_ok());
        assert!(attack("SHA_on", 0, max + 1).validate().is_err());
        assert!(attack("SHA_on", 18_446_744_073_709_552, u64::MAX).validate().is_err());

        let mut entry = attack("SYA_on", 0, 1000);
        entry.program = Some(FaultProgramConfig {
            symbol: None,
            steps: vec![FaultStepConfig { at_ms: max + 1, value: 1 }],
        });
        assert!(entry.validate().is_err());
    }

    #[test]
    fn rejects_unsorted_program() {
        let mut entry = attack("SYA_on", 0, 1000);
        entry.program = Some(FaultProgramConfig {
            symbol: Some("fake_id".into()),
            steps: vec![
                FaultStepConfig { at_ms: 400, value: 0x26 },
                FaultStepConfig { at_ms: 200, value: 0x09 },
            ],
        });
        assert!(entry.validate().is_err());
    }
}
