//! Memory writer. The model may record session notes and hypotheses; the
//! stable layer is rejected before the store is touched.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use edupilot_core::error::ToolError;
use edupilot_core::tool::{Tool, ToolName, ToolResult};
use edupilot_core::{DomainEvent, EventBus, LearnerStore, MemoryLayer, MemoryRecord, RunContext};
use serde_json::json;
use tracing::{info, warn};

use crate::opt_str;

pub struct WriteMemoryTool {
    store: Arc<dyn LearnerStore>,
    events: Option<Arc<EventBus>>,
}

impl WriteMemoryTool {
    pub fn new(store: Arc<dyn LearnerStore>) -> Self {
        Self { store, events: None }
    }

    pub fn with_events(mut self, events: Arc<EventBus>) -> Self {
        self.events = Some(events);
        self
    }
}

#[async_trait]
impl Tool for WriteMemoryTool {
    fn id(&self) -> ToolName {
        ToolName::WriteMemory
    }

    fn description(&self) -> &str {
        "Remember something about the learner. Use layer 'ephemeral' for notes about this \
         session and 'hypothesis' for tentative beliefs (e.g. 'seems tired in the evening'). \
         Writing the same key again replaces the old value. The 'stable' layer is read-only."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        json!({
            "type": "object",
            "properties": {
                "key": {
                    "type": "string",
                    "description": "Short snake_case identifier"
                },
                "value": {
                    "description": "What to remember (any JSON value)"
                },
                "layer": {
                    "type": "string",
                    "enum": ["ephemeral", "hypothesis"],
                    "description": "Memory layer (default: hypothesis)"
                },
                "confidence": {
                    "type": "number",
                    "minimum": 0,
                    "maximum": 1,
                    "description": "How sure you are (default 0.5)"
                }
            },
            "required": ["key", "value"]
        })
    }

    async fn execute(&self, arguments: serde_json::Value, ctx: &RunContext) -> Result<ToolResult, ToolError> {
        let layer: MemoryLayer = opt_str(&arguments, "layer")
            .unwrap_or("hypothesis")
            .parse()
            .map_err(ToolError::InvalidArguments)?;
        if !layer.is_model_writable() {
            return Err(ToolError::InvalidLayer {
                layer: layer.to_string(),
            });
        }

        let key = opt_str(&arguments, "key")
            .ok_or_else(|| ToolError::InvalidArguments("Missing 'key' argument".into()))?
            .to_string();
        let value = arguments
            .get("value")
            .filter(|v| !v.is_null())
            .cloned()
            .ok_or_else(|| ToolError::InvalidArguments("Missing 'value' argument".into()))?;

        let mut record = MemoryRecord::new(key.clone(), value, layer);
        if let Some(confidence) = arguments.get("confidence").and_then(|c| c.as_f64()) {
            record = record.with_confidence(confidence);
        }

        if let Err(e) = self.store.upsert_memory(&ctx.child_id, record).await {
            warn!(child_id = %ctx.child_id, key = %key, error = %e, "Memory write failed");
            return Ok(ToolResult::failure(format!("Memory write failed: {e}")));
        }

        info!(child_id = %ctx.child_id, layer = %layer, key = %key, "Memory written");
        if let Some(events) = &self.events {
            events.publish(DomainEvent::MemoryWritten {
                child_id: ctx.child_id.clone(),
                layer: layer.to_string(),
                key: key.clone(),
                timestamp: Utc::now(),
            });
        }

        Ok(ToolResult::ok(json!({
            "written": true,
            "layer": layer.as_str(),
            "key": key,
        })))
    }
}
