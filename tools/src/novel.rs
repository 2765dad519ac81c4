//! Novel-to-script workflow: prose in, screenplay text out.

use hubrun_client::hubrun_types::{ApiKey, JobSpec, NodeParam};
use serde::Deserialize;
use serde_json::{Value, json};

use crate::{ToolError, WorkflowTool, parse_args};

const WORKFLOW_ID: &str = "2014935539987783681";
/// Text input node.
const TEXT_NODE: &str = "8";
/// Optional seed node.
const SEED_NODE: &str = "6";

#[derive(Debug, Deserialize)]
struct NovelArgs {
    text: String,
    #[serde(default)]
    seed: Option<String>,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct NovelToScript;

impl WorkflowTool for NovelToScript {
    fn name(&self) -> &'static str {
        "novel_to_script"
    }

    fn description(&self) -> &'static str {
        "Convert novel prose into a screenplay using the RunningHub novel-to-script \
         workflow. Creates the task, waits for it to finish, and returns the script text."
    }

    fn schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "text": {
                    "type": "string",
                    "description": "Novel text to convert"
                },
                "seed": {
                    "type": "string",
                    "description": "Optional random seed; omit to use the workflow default"
                }
            },
            "required": ["text"]
        })
    }

    fn workflow_id(&self) -> &'static str {
        WORKFLOW_ID
    }

    fn build_spec(&self, args: &Value, api_key: ApiKey) -> Result<JobSpec, ToolError> {
        let args: NovelArgs = parse_args(args)?;
        if args.text.trim().is_empty() {
            return Err(ToolError::BadArgs {
                message: "text must not be empty".to_string(),
            });
        }

        let mut spec = JobSpec::new(api_key, self.workflow_id())
            .with_param(NodeParam::new(TEXT_NODE, "text", args.text));
        if let Some(seed) = args.seed.filter(|s| !s.is_empty()) {
            spec = spec.with_param(NodeParam::new(SEED_NODE, "seed", seed));
        }
        Ok(spec)
    }
}
