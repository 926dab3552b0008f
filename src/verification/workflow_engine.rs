use crate::config::WorkflowSettings;
use crate::shared::ids::generate_run_id;
use crate::shared::logging::Logger;
use crate::verification::error::WorkflowError;
use crate::verification::step_execution::{StepRequest, StepRunner};
use crate::verification::types::{HistoryEntry, IterVfInput, WorkflowResult};
use chrono::{SecondsFormat, Utc};
use serde_json::{json, Value};

/// Drives the verify-then-refine loop for one run at a time. Runs share no
/// mutable state, so one engine may serve concurrent invocations.
#[derive(Debug, Clone)]
pub struct WorkflowEngine<R> {
    runner: R,
    settings: WorkflowSettings,
    logger: Logger,
}

impl<R: StepRunner> WorkflowEngine<R> {
    pub fn new(runner: R) -> Self {
        Self {
            runner,
            settings: WorkflowSettings::default(),
            logger: Logger::discard(),
        }
    }

    pub fn with_settings(mut self, settings: WorkflowSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn with_logger(mut self, logger: Logger) -> Self {
        self.logger = logger;
        self
    }

    pub fn settings(&self) -> &WorkflowSettings {
        &self.settings
    }

    /// Validates raw tool arguments and runs the workflow.
    pub fn execute(&self, arguments: &Value) -> Result<WorkflowResult, WorkflowError> {
        let input = IterVfInput::from_value(arguments, &self.settings)?;
        self.run(&input)
    }

    pub fn run(&self, input: &IterVfInput) -> Result<WorkflowResult, WorkflowError> {
        input.validate()?;
        let logger = self
            .logger
            .clone()
            .with_field("run_id", generate_run_id(Utc::now().timestamp_millis()));

        let seed = if input.initial_answer_a0.is_empty() {
            logger.warn(
                "vf.workflow.fallback_seed",
                "received empty initial answer; defaulting to fallback",
                &[("fallback", json!(self.settings.fallback_initial_answer))],
            );
            self.settings.fallback_initial_answer.clone()
        } else {
            input.initial_answer_a0.clone()
        };

        logger.info(
            "vf.workflow.started",
            "starting iterative verification workflow",
            &[
                ("problem", json!(input.problem_q)),
                ("budget", json!(input.max_iterations)),
            ],
        );

        let mut candidate = seed.clone();
        let mut history: Vec<HistoryEntry> = Vec::new();
        for step_index in 1..=input.max_iterations {
            logger.debug(
                "vf.workflow.iteration",
                "executing verification iteration",
                &[
                    ("step_index", json!(step_index)),
                    ("candidate", json!(candidate)),
                ],
            );
            let request = StepRequest {
                problem: &input.problem_q,
                candidate: &candidate,
                step_index,
                logger: &logger,
            };
            let analysis = match self.runner.run_step(&request) {
                Ok(analysis) => analysis,
                Err(err) => {
                    logger.error(
                        "vf.workflow.halted",
                        "workflow halted because of a step error",
                        &[
                            ("step_index", json!(step_index)),
                            ("code", json!(err.code())),
                            ("error", json!(err.to_string())),
                        ],
                    );
                    break;
                }
            };

            let next_candidate = analysis.newly_generated_answer.clone();
            history.push(HistoryEntry {
                analysis,
                step_index,
                verified_candidate: std::mem::replace(&mut candidate, next_candidate),
                timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
            });
        }

        let final_answer = history
            .last()
            .map(|entry| entry.analysis.newly_generated_answer.clone())
            .unwrap_or(candidate);
        let total_steps = u32::try_from(history.len()).map_err(|_| {
            WorkflowError::InvalidResult("history length exceeds u32 range".to_string())
        })?;
        let result = WorkflowResult {
            final_answer,
            total_steps,
            history,
        };
        result.validate(&seed)?;

        logger.info(
            "vf.workflow.completed",
            "iterative verification workflow completed",
            &[
                ("total_steps", json!(result.total_steps)),
                ("final_answer", json!(result.final_answer)),
            ],
        );
        Ok(result)
    }
}
