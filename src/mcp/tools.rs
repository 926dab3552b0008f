//! MCP tool definitions and handlers

use crate::config::WorkflowSettings;
use crate::mcp::types::{ToolCallParams, ToolDefinition, ToolResult};
use crate::verification::{StepRunner, WorkflowEngine, WorkflowError};
use serde_json::{json, Value};

pub const ITER_VF_TOOL_NAME: &str = "execute_iter_vf_workflow";
pub const ITER_VF_TOOL_DESCRIPTION: &str = "Execute the Iterative Verification-First workflow, refining the answer using host-supplied LLM samples.";

#[derive(Debug, thiserror::Error)]
pub enum ToolCallError {
    #[error("unknown tool `{0}`")]
    UnknownTool(String),
    #[error("{0}")]
    InvalidArguments(String),
    #[error("{0}")]
    Failed(String),
}

impl From<WorkflowError> for ToolCallError {
    fn from(value: WorkflowError) -> Self {
        match value {
            WorkflowError::InvalidInput(_) => Self::InvalidArguments(value.to_string()),
            WorkflowError::InvalidResult(_) => Self::Failed(value.to_string()),
        }
    }
}

pub fn iter_vf_input_schema(defaults: &WorkflowSettings) -> Value {
    json!({
        "type": "object",
        "properties": {
            "problem_q": {
                "type": "string",
                "minLength": 1,
                "description": "The complex logical or computational problem (Q)."
            },
            "max_iterations": {
                "type": "integer",
                "minimum": 1,
                "default": defaults.default_max_iterations,
                "description": "Computation budget (B)."
            },
            "initial_answer_a0": {
                "type": "string",
                "default": defaults.fallback_initial_answer,
                "description": "Starting candidate answer (A0) for verification."
            }
        },
        "required": ["problem_q"]
    })
}

pub fn iter_vf_output_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "final_answer": { "type": "string" },
            "total_steps": { "type": "integer" },
            "history": {
                "type": "array",
                "items": {
                    "type": "object",
                    "properties": {
                        "is_a_prime_correct": {
                            "type": "boolean",
                            "description": "Whether the candidate answer was verified as correct."
                        },
                        "verification_critique": {
                            "type": "string",
                            "description": "Reverse reasoning critique of the candidate answer."
                        },
                        "newly_generated_answer": {
                            "type": "string",
                            "description": "The corrected answer produced by this step."
                        },
                        "step_index": {
                            "type": "integer",
                            "minimum": 1,
                            "description": "Iteration index starting from 1."
                        },
                        "verified_candidate": {
                            "type": "string",
                            "description": "Candidate answer that was inspected in this step."
                        },
                        "timestamp": {
                            "type": "string",
                            "format": "date-time",
                            "description": "ISO-8601 timestamp for when the step completed."
                        }
                    },
                    "required": [
                        "is_a_prime_correct",
                        "verification_critique",
                        "newly_generated_answer",
                        "step_index",
                        "verified_candidate",
                        "timestamp"
                    ]
                }
            }
        },
        "required": ["final_answer", "total_steps", "history"]
    })
}

/// Return all tool definitions for tools/list
pub fn list_tools(defaults: &WorkflowSettings) -> Vec<ToolDefinition> {
    vec![ToolDefinition {
        name: ITER_VF_TOOL_NAME,
        description: ITER_VF_TOOL_DESCRIPTION,
        input_schema: iter_vf_input_schema(defaults),
        output_schema: iter_vf_output_schema(),
    }]
}

pub fn call_tool<R: StepRunner>(
    engine: &WorkflowEngine<R>,
    params: &ToolCallParams,
) -> Result<ToolResult, ToolCallError> {
    if params.name != ITER_VF_TOOL_NAME {
        return Err(ToolCallError::UnknownTool(params.name.clone()));
    }
    let result = engine.execute(&params.arguments)?;
    let structured = serde_json::to_value(&result)
        .map_err(|err| ToolCallError::Failed(format!("failed to encode workflow result: {err}")))?;
    let text = serde_json::to_string_pretty(&structured)
        .map_err(|err| ToolCallError::Failed(format!("failed to encode workflow result: {err}")))?;
    Ok(ToolResult::structured(text, structured))
}
