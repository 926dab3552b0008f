//! Iterative verification-first workflow: a bounded loop that asks the host
//! model to verify and correct a candidate answer, one sampling call per step.

pub mod error;
pub mod prompt_render;
pub mod step_execution;
pub mod types;
pub mod workflow_engine;

pub use error::{BoxError, VfError, VfErrorKind, WorkflowError};
pub use prompt_render::{render_verification_prompt, PROMPT_TEMPLATE};
pub use step_execution::{
    build_sampling_request, extract_step_text, parse_step_analysis, SamplingStepRunner,
    StepRequest, StepRunner,
};
pub use types::{HistoryEntry, IterVfInput, StepAnalysis, WorkflowResult};
pub use workflow_engine::WorkflowEngine;
