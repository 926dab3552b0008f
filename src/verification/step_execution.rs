use crate::config::SamplingSettings;
use crate::sampling::{
    ContentBlock, CreateMessageRequest, CreateMessageResult, ModelHint, ModelPreferences, Role,
    Sampler, SamplingMessage,
};
use crate::shared::logging::Logger;
use crate::verification::error::VfError;
use crate::verification::prompt_render::render_verification_prompt;
use crate::verification::types::StepAnalysis;
use serde_json::{json, Value};

#[derive(Debug, Clone, Copy)]
pub struct StepRequest<'a> {
    pub problem: &'a str,
    pub candidate: &'a str,
    pub step_index: u32,
    pub logger: &'a Logger,
}

/// One verification attempt. Implementations make a single attempt per call;
/// the workflow engine decides what a failure means for the run.
pub trait StepRunner: Send + Sync {
    fn run_step(&self, request: &StepRequest<'_>) -> Result<StepAnalysis, VfError>;
}

impl<F> StepRunner for F
where
    F: Fn(&StepRequest<'_>) -> Result<StepAnalysis, VfError> + Send + Sync,
{
    fn run_step(&self, request: &StepRequest<'_>) -> Result<StepAnalysis, VfError> {
        self(request)
    }
}

pub fn build_sampling_request(prompt: String, settings: &SamplingSettings) -> CreateMessageRequest {
    CreateMessageRequest {
        messages: vec![SamplingMessage {
            role: Role::User,
            content: ContentBlock::text(prompt),
        }],
        max_tokens: settings.max_tokens,
        temperature: Some(settings.temperature),
        system_prompt: Some(settings.system_prompt.clone()),
        model_preferences: Some(ModelPreferences {
            hints: settings
                .model_hints
                .iter()
                .map(|name| ModelHint { name: name.clone() })
                .collect(),
            intelligence_priority: Some(settings.intelligence_priority),
        }),
    }
}

pub fn extract_step_text(response: &CreateMessageResult) -> Result<&str, VfError> {
    response
        .content_blocks()
        .iter()
        .find_map(ContentBlock::as_text)
        .ok_or_else(|| VfError::sampling("sampling response did not include a text block"))
}

pub fn parse_step_analysis(text: &str) -> Result<StepAnalysis, VfError> {
    let value: Value = serde_json::from_str(text).map_err(|err| {
        VfError::validation("sampling response text is not valid json").with_source(err)
    })?;
    serde_json::from_value(value).map_err(|err| {
        VfError::validation("sampling response does not match the step analysis schema")
            .with_source(err)
    })
}

/// Step runner backed by the host's sampling capability.
#[derive(Debug, Clone)]
pub struct SamplingStepRunner<S> {
    sampler: S,
    settings: SamplingSettings,
}

impl<S: Sampler> SamplingStepRunner<S> {
    pub fn new(sampler: S, settings: SamplingSettings) -> Self {
        Self { sampler, settings }
    }

    pub fn settings(&self) -> &SamplingSettings {
        &self.settings
    }
}

impl<S: Sampler> StepRunner for SamplingStepRunner<S> {
    fn run_step(&self, request: &StepRequest<'_>) -> Result<StepAnalysis, VfError> {
        let logger = request.logger;
        logger.info(
            "vf.step.sampling_requested",
            "requesting sampling for verification step",
            &[
                ("step_index", json!(request.step_index)),
                ("candidate", json!(request.candidate)),
            ],
        );

        let prompt = render_verification_prompt(request.problem, request.candidate);
        let sampling_request = build_sampling_request(prompt, &self.settings);

        let outcome = self
            .sampler
            .create_message(&sampling_request)
            .map_err(|err| {
                VfError::sampling("unable to complete sampling for verification step")
                    .with_source(err)
            })
            .and_then(|response| {
                logger.debug(
                    "vf.step.sampling_completed",
                    "sampling response received",
                    &[
                        ("step_index", json!(request.step_index)),
                        ("model", json!(response.model)),
                        ("content_blocks", json!(response.content_blocks().len())),
                    ],
                );
                extract_step_text(&response).and_then(parse_step_analysis)
            });

        if let Err(err) = &outcome {
            logger.error(
                "vf.step.failed",
                "verification step failed",
                &[
                    ("step_index", json!(request.step_index)),
                    ("code", json!(err.code())),
                    ("error", json!(err.to_string())),
                    ("cause", json!(err.cause().map(|cause| cause.to_string()))),
                ],
            );
        }
        outcome
    }
}
