//! Tool plans: ordered tool calls where each step derives its parameters
//! from the previous step's output.
//!
//! # Example
//!
//! ```ignore
//! let plan = ToolPlan::new("article")
//!     .step(creative_url, |_| Ok(ToolParameters::GenerateText(params)))
//!     .step(storage_url, |prev| upload_from(prev));
//!
//! let run = plan.run(tools.as_ref(), Some(task_id)).await;
//! ```

use relay_common::{ErrorDetail, ToolParameters, ToolStatus};
use relay_tools::ToolInvoker;
use serde::Serialize;
use serde_json::{Map, Value};
use std::time::Instant;
use tracing::{debug, info, warn};

type BuildParams =
    Box<dyn Fn(Option<&Map<String, Value>>) -> Result<ToolParameters, ErrorDetail> + Send + Sync>;

struct PlanStep {
    server_url: String,
    build: BuildParams,
}

/// Record of one executed step, reported back in task results.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StepRecord {
    pub tool: String,
    pub status: ToolStatus,
    pub duration_ms: u64,
}

/// Result of running a plan.
#[derive(Debug, Clone)]
pub struct PlanRun {
    /// Executed steps, including the failing one
    pub steps: Vec<StepRecord>,
    /// Outputs of the successful steps, in order
    pub outputs: Vec<Map<String, Value>>,
    /// `None` when every step succeeded
    pub failure: Option<ErrorDetail>,
}

impl PlanRun {
    pub fn is_success(&self) -> bool {
        self.failure.is_none()
    }

    /// Output of the last step, when the plan succeeded.
    pub fn final_output(&self) -> Option<&Map<String, Value>> {
        if self.is_success() {
            self.outputs.last()
        } else {
            None
        }
    }

    pub fn steps_value(&self) -> Value {
        serde_json::to_value(&self.steps).unwrap_or(Value::Array(Vec::new()))
    }
}

/// An ordered list of tool calls. The run stops at the first failing step.
pub struct ToolPlan {
    name: String,
    steps: Vec<PlanStep>,
}

impl ToolPlan {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            steps: Vec::new(),
        }
    }

    /// Append a step. `build` receives the previous step's output (`None`
    /// for the first step) and returns the parameters for this call, or a
    /// failure when the previous output is unusable.
    pub fn step<F>(mut self, server_url: impl Into<String>, build: F) -> Self
    where
        F: Fn(Option<&Map<String, Value>>) -> Result<ToolParameters, ErrorDetail>
            + Send
            + Sync
            + 'static,
    {
        self.steps.push(PlanStep {
            server_url: server_url.into(),
            build: Box::new(build),
        });
        self
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub async fn run(&self, tools: &dyn ToolInvoker, task_id: Option<&str>) -> PlanRun {
        info!(
            plan = %self.name,
            step_count = self.steps.len(),
            task_id = task_id.unwrap_or("-"),
            "Starting tool plan"
        );

        let mut run = PlanRun {
            steps: Vec::with_capacity(self.steps.len()),
            outputs: Vec::with_capacity(self.steps.len()),
            failure: None,
        };

        for (i, step) in self.steps.iter().enumerate() {
            let parameters = match (step.build)(run.outputs.last()) {
                Ok(p) => p,
                Err(detail) => {
                    warn!(plan = %self.name, step = i + 1, error = %detail, "Step input unusable");
                    run.failure = Some(detail);
                    return run;
                }
            };

            let tool = parameters.tool_name().to_string();
            let call = relay_common::ToolCall::from_parameters(parameters, task_id.map(str::to_string));
            let started = Instant::now();

            debug!(plan = %self.name, step = i + 1, tool = %tool, "Executing plan step");
            let result = tools.invoke(&step.server_url, call).await;

            run.steps.push(StepRecord {
                tool,
                status: result.status,
                duration_ms: started.elapsed().as_millis() as u64,
            });

            if !result.is_success() {
                run.failure = Some(result.error_detail());
                return run;
            }
            run.outputs.push(result.result.unwrap_or_default());
        }

        info!(plan = %self.name, "Tool plan finished");
        run
    }
}

/// Read a non-blank string field from a step output.
pub fn output_str<'a>(output: Option<&'a Map<String, Value>>, key: &str) -> Option<&'a str> {
    output?
        .get(key)?
        .as_str()
        .map(str::trim)
        .filter(|s| !s.is_empty())
}
