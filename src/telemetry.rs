//! Chat-aware telemetry.
//!
//! Provides structured tracing spans carrying chat-specific context, so
//! logs from the pipeline and façade can be correlated by session, sender,
//! and receiver without threading those fields through every log call
//! site by hand.

use tracing::{Level, Span, span};

/// Structured context for a single frame moving through the pipeline.
#[derive(Debug, Clone, Default)]
pub struct FrameTraceContext {
    pub frame_type: Option<&'static str>,
    pub session_id: Option<String>,
    pub sender_id: Option<String>,
    pub receiver_id: Option<String>,
    pub recipients: Option<usize>,
}

impl FrameTraceContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_frame_type(mut self, frame_type: &'static str) -> Self {
        self.frame_type = Some(frame_type);
        self
    }

    pub fn with_sender(mut self, sender_id: impl Into<String>) -> Self {
        self.sender_id = Some(sender_id.into());
        self
    }

    pub fn with_receiver(mut self, receiver_id: impl Into<String>) -> Self {
        self.receiver_id = Some(receiver_id.into());
        self
    }

    pub fn with_recipients(mut self, recipients: usize) -> Self {
        self.recipients = Some(recipients);
        self
    }

    pub fn into_span(self) -> Span {
        span!(
            Level::DEBUG,
            "chat.frame",
            frame_type = self.frame_type.unwrap_or("unknown"),
            sender_id = self.sender_id.as_deref(),
            receiver_id = self.receiver_id.as_deref(),
            recipients = self.recipients,
        )
    }
}

/// Create a span for a façade operation.
pub fn create_service_span(service: &str, operation: &str) -> Span {
    span!(Level::INFO, "chat.service", service = service, operation = operation)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_sets_fields() {
        let ctx = FrameTraceContext::new()
            .with_frame_type("TEXT")
            .with_sender("Uaaa")
            .with_receiver("Ubbb")
            .with_recipients(2);
        assert_eq!(ctx.frame_type, Some("TEXT"));
        assert_eq!(ctx.sender_id.as_deref(), Some("Uaaa"));
        assert_eq!(ctx.recipients, Some(2));
    }
}
