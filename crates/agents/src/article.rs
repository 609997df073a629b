//! Article draft agent - writes an article and saves it to cloud storage.

use async_trait::async_trait;
use relay_common::{
    AssignTask, ErrorDetail, GenerateTextParams, Result, ToolParameters, UploadFileParams,
};
use relay_tools::ToolInvoker;
use serde_json::{Map, Value};
use std::sync::Arc;
use tracing::{info, warn};

use crate::agent::{Outcome, TaskAgent};
use crate::planning::{ToolPlan, output_str};

pub const AGENT_ID: &str = "article_draft_agent";
pub const TASK_TYPE: &str = "write_article_draft";
pub const DEFAULT_STYLE: &str = "standard informative";

const ARTICLE_PROMPT: &str = r#"You are a helpful article draft writing assistant.
Write a comprehensive article draft on the following topic: "{topic}"
Write it in a {style} style.
Aim for a length of at least 2500 words, but do not exceed 5000 words.
Write in detail and include technical information where it is relevant.
Respond with the complete article in Markdown and nothing else."#;

pub struct ArticleDraftAgent {
    tools: Arc<dyn ToolInvoker>,
    creative_llm_url: String,
    cloud_storage_url: String,
    bucket_name: Option<String>,
}

impl ArticleDraftAgent {
    pub fn new(
        tools: Arc<dyn ToolInvoker>,
        creative_llm_url: impl Into<String>,
        cloud_storage_url: impl Into<String>,
        bucket_name: Option<String>,
    ) -> Self {
        Self {
            tools,
            creative_llm_url: creative_llm_url.into(),
            cloud_storage_url: cloud_storage_url.into(),
            bucket_name: bucket_name.filter(|b| !b.trim().is_empty()),
        }
    }

    fn build_plan(&self, topic: &str, style: &str, bucket: &str, blob: &str) -> ToolPlan {
        let prompt = ARTICLE_PROMPT
            .replace("{topic}", topic)
            .replace("{style}", style);
        let bucket = bucket.to_string();
        let blob = blob.to_string();

        ToolPlan::new("article_draft")
            .step(self.creative_llm_url.clone(), move |_| {
                Ok(ToolParameters::GenerateText(GenerateTextParams::new(prompt.clone())))
            })
            .step(self.cloud_storage_url.clone(), move |prev| {
                let text = output_str(prev, "generated_text").ok_or_else(|| {
                    ErrorDetail::new(
                        "EMPTY_AGENT_OUTPUT",
                        "Text generation finished, but the output was empty.",
                    )
                })?;
                Ok(ToolParameters::UploadFile(UploadFileParams {
                    bucket_name: bucket.clone(),
                    destination_blob_name: blob.clone(),
                    source_file_content: text.to_string(),
                }))
            })
    }
}

/// URL-safe form of a topic: lowercase ASCII letters, digits, `-` and `_`.
/// Everything else becomes `_`.
pub fn slugify(topic: &str) -> String {
    topic
        .trim()
        .to_lowercase()
        .chars()
        .map(|c| match c {
            'a'..='z' | '0'..='9' | '-' | '_' => c,
            _ => '_',
        })
        .collect()
}

/// `<slug>-<8 hex>.md`
pub fn blob_name(topic: &str) -> String {
    let suffix = uuid::Uuid::new_v4().simple().to_string();
    format!("{}-{}.md", slugify(topic), &suffix[..8])
}

fn is_http_url(s: &str) -> bool {
    s.starts_with("http://") || s.starts_with("https://")
}

#[async_trait]
impl TaskAgent for ArticleDraftAgent {
    fn id(&self) -> &str {
        AGENT_ID
    }

    fn task_type(&self) -> &str {
        TASK_TYPE
    }

    fn required_parameters(&self) -> &[&'static str] {
        &["topic"]
    }

    async fn run(&self, task_id: &str, assignment: &AssignTask) -> Result<Outcome> {
        let topic = assignment.parameter_str("topic").unwrap_or_default();
        let style = assignment.parameter_str("style").unwrap_or(DEFAULT_STYLE);

        let Some(bucket) = self.bucket_name.as_deref() else {
            warn!(task_id = %task_id, "No storage bucket configured");
            return Ok(Outcome::failed(
                "CONFIG_ERROR",
                "Cloud Storage bucket name is not configured.",
            ));
        };

        let blob = blob_name(topic);
        info!(task_id = %task_id, topic = %topic, style = %style, blob = %blob, "Writing article draft");

        let run = self
            .build_plan(topic, style, bucket, &blob)
            .run(self.tools.as_ref(), Some(task_id))
            .await;

        if let Some(failure) = run.failure.clone() {
            return Ok(Outcome::Failed(failure));
        }

        let Some(url) = output_str(run.final_output(), "public_url").filter(|u| is_http_url(u))
        else {
            return Ok(Outcome::failed(
                "URL_NOT_FOUND_IN_OUTPUT",
                "Upload finished, but no public URL was returned.",
            ));
        };

        let mut result = Map::new();
        result.insert("saved_url".into(), Value::String(url.to_string()));
        result.insert("bucket".into(), Value::String(bucket.to_string()));
        result.insert("blob".into(), Value::String(blob));
        result.insert("steps".into(), run.steps_value());
        Ok(Outcome::Completed(result))
    }
}
