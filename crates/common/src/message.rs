//! Task messages exchanged between the coordinator and agents.
//!
//! On the wire a message carries a `message_type` tag next to a `payload`
//! object. In Rust the pair is decoded into [`MessageBody`], a closed sum
//! type with one arm per known message type plus two arms that are always
//! handled explicitly: [`MessageBody::Unknown`] for unrecognized tags and
//! [`MessageBody::Malformed`] for known tags whose payload does not have the
//! expected shape. Decoding a [`TaskMessage`] therefore never fails because
//! of its payload.

use crate::task::ErrorDetail;
use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// Known message type tags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageType {
    AssignTask,
    StatusUpdate,
    TaskResult,
    Error,
}

impl MessageType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AssignTask => "assign_task",
            Self::StatusUpdate => "status_update",
            Self::TaskResult => "task_result",
            Self::Error => "error",
        }
    }

    /// Parse a wire tag. `task_status_update` is accepted as an alias.
    pub fn parse(tag: &str) -> Option<Self> {
        match tag {
            "assign_task" => Some(Self::AssignTask),
            "status_update" | "task_status_update" => Some(Self::StatusUpdate),
            "task_result" => Some(Self::TaskResult),
            "error" => Some(Self::Error),
            _ => None,
        }
    }
}

impl std::fmt::Display for MessageType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Payload of an `assign_task` message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssignTask {
    /// Task type understood by the receiving agent, e.g. `write_article_draft`
    pub task_type: String,

    /// Task-type-specific parameters (e.g. `topic`, `style`)
    #[serde(default)]
    pub parameters: Map<String, Value>,
}

impl AssignTask {
    pub fn new(task_type: impl Into<String>, parameters: Map<String, Value>) -> Self {
        Self {
            task_type: task_type.into(),
            parameters,
        }
    }

    /// Get a string parameter, treating blank values as missing.
    pub fn parameter_str(&self, key: &str) -> Option<&str> {
        self.parameters
            .get(key)
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }
}

/// Payload of a `status_update` message. Informational only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusUpdate {
    pub status: String,
    #[serde(default)]
    pub progress: Option<u8>,
    #[serde(default)]
    pub message: Option<String>,
}

/// Status carried by a `task_result` payload.
///
/// Statuses outside the three terminal values are kept verbatim in
/// [`ResultStatus::Other`] so the coordinator can report them instead of
/// rejecting the message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ResultStatus {
    Completed,
    Failed,
    RequiresClarification,
    Other(String),
}

impl ResultStatus {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::RequiresClarification => "requires_clarification",
            Self::Other(s) => s,
        }
    }
}

impl From<String> for ResultStatus {
    fn from(s: String) -> Self {
        match s.as_str() {
            "completed" => Self::Completed,
            "failed" => Self::Failed,
            "requires_clarification" => Self::RequiresClarification,
            _ => Self::Other(s),
        }
    }
}

impl From<ResultStatus> for String {
    fn from(status: ResultStatus) -> Self {
        match status {
            ResultStatus::Other(s) => s,
            known => known.as_str().to_string(),
        }
    }
}

/// Payload of a `task_result` message.
///
/// Exactly one of `result`, `error` and `question` is meaningful for a given
/// status; the others are `null`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskResultPayload {
    pub status: ResultStatus,
    #[serde(default)]
    pub result: Option<Map<String, Value>>,
    #[serde(default)]
    pub error: Option<ErrorDetail>,
    #[serde(default)]
    pub question: Option<String>,
}

impl TaskResultPayload {
    pub fn completed(result: Map<String, Value>) -> Self {
        Self {
            status: ResultStatus::Completed,
            result: Some(result),
            error: None,
            question: None,
        }
    }

    pub fn failed(error: ErrorDetail) -> Self {
        Self {
            status: ResultStatus::Failed,
            result: None,
            error: Some(error),
            question: None,
        }
    }

    pub fn requires_clarification(question: impl Into<String>) -> Self {
        Self {
            status: ResultStatus::RequiresClarification,
            result: None,
            error: None,
            question: Some(question.into()),
        }
    }
}

/// Typed message payload, keyed by the wire `message_type`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "RawBody", into = "RawBody")]
pub enum MessageBody {
    AssignTask(AssignTask),
    StatusUpdate(StatusUpdate),
    TaskResult(TaskResultPayload),
    Error(Map<String, Value>),
    /// A `message_type` tag this protocol does not define.
    Unknown { message_type: String, payload: Value },
    /// A known tag whose payload failed shape validation.
    Malformed {
        message_type: MessageType,
        payload: Value,
        reason: String,
    },
}

impl MessageBody {
    /// The known message type, if any.
    pub fn message_type(&self) -> Option<MessageType> {
        match self {
            Self::AssignTask(_) => Some(MessageType::AssignTask),
            Self::StatusUpdate(_) => Some(MessageType::StatusUpdate),
            Self::TaskResult(_) => Some(MessageType::TaskResult),
            Self::Error(_) => Some(MessageType::Error),
            Self::Unknown { .. } => None,
            Self::Malformed { message_type, .. } => Some(*message_type),
        }
    }

    /// The wire tag, including unknown ones.
    pub fn type_tag(&self) -> &str {
        match self {
            Self::Unknown { message_type, .. } => message_type,
            other => other.message_type().map(|t| t.as_str()).unwrap_or_default(),
        }
    }
}

/// Wire shape of the `message_type` / `payload` pair.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct RawBody {
    #[serde(default)]
    message_type: String,
    #[serde(default = "empty_object")]
    payload: Value,
}

fn empty_object() -> Value {
    Value::Object(Map::new())
}

impl From<RawBody> for MessageBody {
    fn from(raw: RawBody) -> Self {
        let Some(kind) = MessageType::parse(&raw.message_type) else {
            return MessageBody::Unknown {
                message_type: raw.message_type,
                payload: raw.payload,
            };
        };

        let decoded = match kind {
            MessageType::AssignTask => {
                serde_json::from_value(raw.payload.clone()).map(MessageBody::AssignTask)
            }
            MessageType::StatusUpdate => {
                serde_json::from_value(raw.payload.clone()).map(MessageBody::StatusUpdate)
            }
            MessageType::TaskResult => {
                serde_json::from_value(raw.payload.clone()).map(MessageBody::TaskResult)
            }
            MessageType::Error => serde_json::from_value(raw.payload.clone()).map(MessageBody::Error),
        };

        decoded.unwrap_or_else(|e| MessageBody::Malformed {
            message_type: kind,
            payload: raw.payload,
            reason: e.to_string(),
        })
    }
}

impl From<MessageBody> for RawBody {
    fn from(body: MessageBody) -> Self {
        let message_type = body.type_tag().to_string();
        let payload = match body {
            MessageBody::AssignTask(p) => serde_json::to_value(p).unwrap_or_default(),
            MessageBody::StatusUpdate(p) => serde_json::to_value(p).unwrap_or_default(),
            MessageBody::TaskResult(p) => serde_json::to_value(p).unwrap_or_default(),
            MessageBody::Error(map) => Value::Object(map),
            MessageBody::Unknown { payload, .. } | MessageBody::Malformed { payload, .. } => payload,
        };
        RawBody {
            message_type,
            payload,
        }
    }
}

/// Envelope exchanged between the coordinator and agents.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskMessage {
    /// Identifier of the logical task. Empty when the sender omitted it or sent `null`.
    #[serde(default, deserialize_with = "null_as_empty")]
    pub task_id: String,

    /// Identifier of this message instance
    #[serde(default, deserialize_with = "null_as_empty")]
    pub message_id: String,

    #[serde(default, alias = "sender_agent_id", deserialize_with = "null_as_empty")]
    pub sender_id: String,

    #[serde(default, alias = "receiver_agent_id", deserialize_with = "null_as_empty")]
    pub receiver_id: String,

    /// Creation time, informational only. Offset-less timestamps are read as
    /// UTC; anything unparseable is replaced by the receive time.
    #[serde(default = "Utc::now", deserialize_with = "lenient_timestamp")]
    pub timestamp: DateTime<Utc>,

    #[serde(flatten)]
    pub body: MessageBody,

    /// Opaque auxiliary data, passed through unchanged
    #[serde(default)]
    pub context: Map<String, Value>,
}

fn null_as_empty<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

fn lenient_timestamp<'de, D: Deserializer<'de>>(deserializer: D) -> Result<DateTime<Utc>, D::Error> {
    let raw = Value::deserialize(deserializer)?;
    Ok(raw.as_str().and_then(parse_timestamp).unwrap_or_else(Utc::now))
}

fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    s.parse::<NaiveDateTime>().ok().map(|naive| naive.and_utc())
}

impl TaskMessage {
    pub fn new(
        task_id: impl Into<String>,
        sender_id: impl Into<String>,
        receiver_id: impl Into<String>,
        body: MessageBody,
    ) -> Self {
        Self {
            task_id: task_id.into(),
            message_id: crate::new_id(),
            sender_id: sender_id.into(),
            receiver_id: receiver_id.into(),
            timestamp: Utc::now(),
            body,
            context: Map::new(),
        }
    }

    pub fn assign(
        task_id: impl Into<String>,
        sender_id: impl Into<String>,
        receiver_id: impl Into<String>,
        assignment: AssignTask,
    ) -> Self {
        Self::new(task_id, sender_id, receiver_id, MessageBody::AssignTask(assignment))
    }

    pub fn result(
        task_id: impl Into<String>,
        sender_id: impl Into<String>,
        receiver_id: impl Into<String>,
        payload: TaskResultPayload,
    ) -> Self {
        Self::new(task_id, sender_id, receiver_id, MessageBody::TaskResult(payload))
    }

    pub fn with_context(mut self, context: Map<String, Value>) -> Self {
        self.context = context;
        self
    }

    /// Whether the message names a task.
    pub fn has_task_id(&self) -> bool {
        !self.task_id.trim().is_empty()
    }
}
