use crate::config::WorkflowSettings;
use crate::verification::error::WorkflowError;
use chrono::DateTime;
use serde::{Deserialize, Serialize};
use serde_json::{Number, Value};

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct StepAnalysis {
    pub is_a_prime_correct: bool,
    pub verification_critique: String,
    pub newly_generated_answer: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct HistoryEntry {
    #[serde(flatten)]
    pub analysis: StepAnalysis,
    pub step_index: u32,
    pub verified_candidate: String,
    pub timestamp: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct WorkflowResult {
    pub final_answer: String,
    pub total_steps: u32,
    pub history: Vec<HistoryEntry>,
}

impl WorkflowResult {
    /// Checks the history invariants against the candidate the run was seeded
    /// with.
    pub fn validate(&self, seed: &str) -> Result<(), WorkflowError> {
        if self.total_steps as usize != self.history.len() {
            return Err(WorkflowError::InvalidResult(format!(
                "total_steps {} does not match history length {}",
                self.total_steps,
                self.history.len()
            )));
        }

        let mut expected_candidate = seed;
        for (idx, entry) in self.history.iter().enumerate() {
            let expected_index = idx + 1;
            if entry.step_index as usize != expected_index {
                return Err(WorkflowError::InvalidResult(format!(
                    "history[{idx}].step_index is {}, expected {expected_index}",
                    entry.step_index
                )));
            }
            if entry.verified_candidate != expected_candidate {
                return Err(WorkflowError::InvalidResult(format!(
                    "history[{idx}].verified_candidate does not continue from the previous answer"
                )));
            }
            if DateTime::parse_from_rfc3339(&entry.timestamp).is_err() {
                return Err(WorkflowError::InvalidResult(format!(
                    "history[{idx}].timestamp `{}` is not an ISO-8601 datetime",
                    entry.timestamp
                )));
            }
            expected_candidate = &entry.analysis.newly_generated_answer;
        }

        if self.final_answer != expected_candidate {
            return Err(WorkflowError::InvalidResult(
                "final_answer does not match the last generated answer".to_string(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
struct RawIterVfInput {
    problem_q: String,
    #[serde(default)]
    max_iterations: Option<Number>,
    #[serde(default)]
    initial_answer_a0: Option<String>,
}

/// Validated tool arguments with defaults applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IterVfInput {
    pub problem_q: String,
    pub max_iterations: u32,
    pub initial_answer_a0: String,
}

impl IterVfInput {
    pub fn new(problem_q: impl Into<String>, max_iterations: u32) -> Self {
        Self {
            problem_q: problem_q.into(),
            max_iterations,
            initial_answer_a0: crate::config::DEFAULT_INITIAL_ANSWER.to_string(),
        }
    }

    pub fn with_initial_answer(mut self, initial_answer: impl Into<String>) -> Self {
        self.initial_answer_a0 = initial_answer.into();
        self
    }

    pub fn from_value(value: &Value, defaults: &WorkflowSettings) -> Result<Self, WorkflowError> {
        if !value.is_object() {
            return Err(WorkflowError::InvalidInput(
                "arguments must be a JSON object".to_string(),
            ));
        }
        let raw: RawIterVfInput = serde_json::from_value(value.clone())
            .map_err(|err| WorkflowError::InvalidInput(err.to_string()))?;

        let max_iterations = match raw.max_iterations {
            Some(number) => parse_iteration_budget(&number)?,
            None => defaults.default_max_iterations,
        };
        let input = Self {
            problem_q: raw.problem_q,
            max_iterations,
            initial_answer_a0: raw
                .initial_answer_a0
                .unwrap_or_else(|| defaults.fallback_initial_answer.clone()),
        };
        input.validate()?;
        Ok(input)
    }

    pub fn validate(&self) -> Result<(), WorkflowError> {
        if self.problem_q.is_empty() {
            return Err(WorkflowError::InvalidInput(
                "problem_q must be a non-empty string".to_string(),
            ));
        }
        if self.max_iterations < 1 {
            return Err(WorkflowError::InvalidInput(
                "max_iterations must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

fn parse_iteration_budget(number: &Number) -> Result<u32, WorkflowError> {
    let whole = if let Some(value) = number.as_i64() {
        value
    } else {
        match number.as_f64() {
            Some(value) if value.fract() == 0.0 && value.abs() < i64::MAX as f64 => value as i64,
            _ => {
                return Err(WorkflowError::InvalidInput(format!(
                    "max_iterations must be an integer, got {number}"
                )))
            }
        }
    };
    if whole < 1 {
        return Err(WorkflowError::InvalidInput(
            "max_iterations must be at least 1".to_string(),
        ));
    }
    u32::try_from(whole).map_err(|_| {
        WorkflowError::InvalidInput(format!("max_iterations {whole} is out of range"))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn entry(step_index: u32, verified: &str, answer: &str) -> HistoryEntry {
        HistoryEntry {
            analysis: StepAnalysis {
                is_a_prime_correct: false,
                verification_critique: "c".to_string(),
                newly_generated_answer: answer.to_string(),
            },
            step_index,
            verified_candidate: verified.to_string(),
            timestamp: "2026-01-02T03:04:05.678Z".to_string(),
        }
    }

    #[test]
    fn input_defaults_apply_when_fields_are_absent() {
        let input = IterVfInput::from_value(
            &json!({ "problem_q": "sum" }),
            &WorkflowSettings::default(),
        )
        .expect("input");
        assert_eq!(input.max_iterations, 3);
        assert_eq!(input.initial_answer_a0, "1");
    }

    #[test]
    fn input_rejects_empty_problem_and_bad_budgets() {
        let defaults = WorkflowSettings::default();
        for args in [
            json!({ "problem_q": "" }),
            json!({ "problem_q": "q", "max_iterations": 0 }),
            json!({ "problem_q": "q", "max_iterations": -2 }),
            json!({ "problem_q": "q", "max_iterations": 1.5 }),
            json!({ "problem_q": "q", "max_iterations": "3" }),
            json!({ "max_iterations": 3 }),
            json!("not an object"),
        ] {
            let err = IterVfInput::from_value(&args, &defaults).expect_err("invalid input");
            assert!(matches!(err, WorkflowError::InvalidInput(_)), "{args}");
        }
    }

    #[test]
    fn input_accepts_integral_floats_and_keeps_empty_seed() {
        let input = IterVfInput::from_value(
            &json!({ "problem_q": "q", "max_iterations": 2.0, "initial_answer_a0": "" }),
            &WorkflowSettings::default(),
        )
        .expect("input");
        assert_eq!(input.max_iterations, 2);
        assert_eq!(input.initial_answer_a0, "");
    }

    #[test]
    fn history_entries_serialize_flat() {
        let value = serde_json::to_value(entry(1, "1", "2")).expect("serialize");
        assert_eq!(value["step_index"], 1);
        assert_eq!(value["newly_generated_answer"], "2");
        assert_eq!(value["verified_candidate"], "1");
        assert!(value.get("analysis").is_none());
    }

    #[test]
    fn result_validation_checks_chaining_and_counts() {
        let valid = WorkflowResult {
            final_answer: "3".to_string(),
            total_steps: 2,
            history: vec![entry(1, "1", "2"), entry(2, "2", "3")],
        };
        valid.validate("1").expect("valid");

        let broken_chain = WorkflowResult {
            history: vec![entry(1, "1", "2"), entry(2, "9", "3")],
            ..valid.clone()
        };
        assert!(broken_chain.validate("1").is_err());

        let bad_count = WorkflowResult {
            total_steps: 3,
            ..valid.clone()
        };
        assert!(bad_count.validate("1").is_err());

        let mut bad_time = valid.clone();
        bad_time.history[0].timestamp = "yesterday".to_string();
        assert!(bad_time.validate("1").is_err());

        let empty = WorkflowResult {
            final_answer: "seed".to_string(),
            total_steps: 0,
            history: Vec::new(),
        };
        empty.validate("seed").expect("empty run keeps the seed");
    }
}
