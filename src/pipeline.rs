//! Message pipeline: the single consumer task bridging the log broker, the
//! store, and the connection registry (spec.md §4.F).

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::broker::BrokerConsumer;
use crate::cache::Cache;
use crate::cache::keys;
use crate::db::Database;
use crate::db::entities::MessageType;
use crate::db::NewMessage;
use crate::ids::{ReceiverKind, classify_receiver};
use crate::metrics;
use crate::registry::ConnectionRegistry;
use crate::telemetry::FrameTraceContext;
use crate::wire::{
    AvData, DURABLE_AV_MESSAGE_ID, DURABLE_AV_TYPES, EgressEnvelope, FrameType, IngressFrame,
    normalize_avatar,
};

pub struct Pipeline {
    consumer: BrokerConsumer,
    db: Database,
    cache: Cache,
    registry: Arc<ConnectionRegistry>,
}

impl Pipeline {
    pub fn new(
        consumer: BrokerConsumer,
        db: Database,
        cache: Cache,
        registry: Arc<ConnectionRegistry>,
    ) -> Self {
        Self { consumer, db, cache, registry }
    }

    /// Run until `token` is cancelled, at which point the loop exits
    /// cleanly (spec.md §4.F step 1).
    pub async fn run(&self, token: CancellationToken) {
        while let Some((_key, raw)) = self.consumer.recv_with_backoff(&token).await {
            self.process_frame(&raw).await;
        }
        debug!("pipeline consumer exiting on cancellation");
    }

    async fn process_frame(&self, raw: &[u8]) {
        let mut frame: IngressFrame = match serde_json::from_slice(raw) {
            Ok(frame) => frame,
            Err(e) => {
                warn!(error = %e, "dropping malformed frame");
                metrics::FRAMES_DROPPED.inc();
                return;
            }
        };

        frame.send_avatar = normalize_avatar(&frame.send_avatar);

        let span = FrameTraceContext::new()
            .with_frame_type(match frame.frame_type {
                FrameType::Text => "TEXT",
                FrameType::File => "FILE",
                FrameType::Av => "AV",
            })
            .with_sender(frame.send_id.clone())
            .with_receiver(frame.receive_id.clone())
            .into_span();
        let _enter = span.enter();

        let persisted = match frame.frame_type {
            FrameType::Text | FrameType::File => self.persist_text_or_file(&frame).await,
            FrameType::Av => self.persist_av(&frame).await,
        };

        let message_id = match persisted {
            Ok(id) => id,
            Err(e) => {
                warn!(error = %e, "failed to persist frame");
                return;
            }
        };

        let skip_echo = frame.frame_type == FrameType::Av;
        let recipients = self.resolve_recipients(&frame, skip_echo).await;
        self.fan_out(&frame, message_id.as_deref(), &recipients).await;

        if let Some(ReceiverKind::Group) = classify_receiver(&frame.receive_id) {
            self.cache
                .delete(&keys::group_messagelist(&frame.receive_id))
                .await;
        }
    }

    async fn persist_text_or_file(&self, frame: &IngressFrame) -> Result<Option<String>, crate::error::AppError> {
        let session_id = frame.session_id.clone().unwrap_or_default();
        let message_type = match frame.frame_type {
            FrameType::Text => MessageType::Text,
            FrameType::File => MessageType::File,
            FrameType::Av => unreachable!(),
        };
        let message = self
            .db
            .messages()
            .insert(NewMessage {
                session_id: &session_id,
                message_type,
                content: frame.content.as_deref(),
                url: frame.url.as_deref(),
                sender_id: &frame.send_id,
                sender_name: &frame.send_name,
                sender_avatar: &frame.send_avatar,
                receiver_id: &frame.receive_id,
                file_size: frame.file_size,
                file_type: frame.file_type.as_deref(),
                file_name: frame.file_name.as_deref(),
                av_data: None,
            })
            .await?;
        Ok(Some(message.uuid))
    }

    /// Only persist AV signals keyed to the `"PROXY"` sentinel and the three
    /// durable sub-types; other AV chatter is transient (spec.md §4.F step 4).
    async fn persist_av(&self, frame: &IngressFrame) -> Result<Option<String>, crate::error::AppError> {
        let Some(raw) = frame.avdata.as_deref() else {
            return Ok(None);
        };
        let Ok(av) = serde_json::from_str::<AvData>(raw) else {
            warn!("dropping AV frame with unparseable avdata");
            return Ok(None);
        };
        if av.message_id != DURABLE_AV_MESSAGE_ID || !DURABLE_AV_TYPES.contains(&av.av_type.as_str()) {
            return Ok(None);
        }

        let session_id = frame.session_id.clone().unwrap_or_default();
        let message = self
            .db
            .messages()
            .insert(NewMessage {
                session_id: &session_id,
                message_type: MessageType::Av,
                content: None,
                url: None,
                sender_id: &frame.send_id,
                sender_name: &frame.send_name,
                sender_avatar: &frame.send_avatar,
                receiver_id: &frame.receive_id,
                file_size: None,
                file_type: None,
                file_name: None,
                av_data: Some(raw),
            })
            .await?;
        Ok(Some(message.uuid))
    }

    /// Resolve the recipient set by receiver-id prefix (spec.md §4.F step 5).
    async fn resolve_recipients(&self, frame: &IngressFrame, skip_echo: bool) -> Vec<String> {
        match classify_receiver(&frame.receive_id) {
            Some(ReceiverKind::User) => {
                if skip_echo {
                    vec![frame.receive_id.clone()]
                } else {
                    vec![frame.receive_id.clone(), frame.send_id.clone()]
                }
            }
            Some(ReceiverKind::Group) => self
                .db
                .group_members()
                .member_ids(&frame.receive_id)
                .await
                .unwrap_or_default(),
            None => {
                warn!(receiver_id = %frame.receive_id, "frame addressed to unrecognized receiver prefix");
                Vec::new()
            }
        }
    }

    /// Copy recipient pointers under a shared lookup, then enqueue to each
    /// (spec.md §9: DashMap gives this for free, no exclusive-lock
    /// layering needed since `get` never races a concurrent mutation of the
    /// entry itself).
    async fn fan_out(&self, frame: &IngressFrame, message_id: Option<&str>, recipients: &[String]) {
        let envelope = EgressEnvelope {
            frame_type: frame.frame_type as u8,
            session_id: frame.session_id.clone(),
            send_id: frame.send_id.clone(),
            send_name: frame.send_name.clone(),
            send_avatar: frame.send_avatar.clone(),
            receive_id: frame.receive_id.clone(),
            content: frame.content.clone(),
            url: frame.url.clone(),
            file_size: frame.file_size,
            file_type: frame.file_type.clone(),
            file_name: frame.file_name.clone(),
            created_at: chrono::Utc::now().format("%Y-%m-%d %H:%M:%S").to_string(),
            avdata: frame.avdata.clone(),
            message_id: message_id.map(str::to_string),
        };

        let mut delivered = 0usize;
        for recipient in recipients {
            if let Some(handle) = self.registry.get(recipient) {
                if handle.enqueue(envelope.clone()).await.is_ok() {
                    delivered += 1;
                    metrics::MESSAGES_FANNED_OUT.inc();
                    continue;
                }
            }
            metrics::MESSAGES_UNDELIVERED.inc();
        }
        debug!(recipients = recipients.len(), delivered, "frame fanned out");
    }
}
