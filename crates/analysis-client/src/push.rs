//! Push channel pump
//!
//! The socket itself lives outside this crate. Whatever transport the host
//! application uses hands its connection events and text frames over as a
//! stream of [`PushMessage`]s, and the pump folds them into the session.

use crate::session::Shared;
use analysis_core::{Channel, ControlFrame, Disposition, InboundFrame};
use futures::{Stream, StreamExt};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// One item delivered by the push transport
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PushMessage {
    Connected,
    Disconnected,
    /// Raw text frame
    Frame(String),
}

/// Drain `messages` into the session until the stream ends
pub(crate) async fn pump<S>(shared: Arc<Shared>, messages: S)
where
    S: Stream<Item = PushMessage> + Send,
{
    let mut messages = std::pin::pin!(messages);

    while let Some(message) = messages.next().await {
        match message {
            PushMessage::Connected => {
                info!("push channel connected");
                shared.update(|store| store.set_push_connected(true)).await;
            }
            PushMessage::Disconnected => {
                warn!("push channel disconnected, relying on polling");
                shared.update(|store| store.set_push_connected(false)).await;
            }
            PushMessage::Frame(text) => handle_frame(&shared, &text).await,
        }
    }

    debug!("push stream ended");
    shared.update(|store| store.set_push_connected(false)).await;
}

async fn handle_frame(shared: &Shared, text: &str) {
    let frame = match InboundFrame::decode(text) {
        Ok(frame) => frame,
        Err(err) => {
            warn!(error = %err, "dropping push frame");
            return;
        }
    };

    match frame {
        InboundFrame::Control(ControlFrame::Connected { client_id }) => {
            debug!(?client_id, "push handshake received");
        }
        InboundFrame::Control(ControlFrame::Subscribed { job_id }) => {
            debug!(%job_id, "push subscription confirmed");
        }
        InboundFrame::Update(event) => {
            let job_id = event.job_id().clone();
            let kind = event.kind();
            let disposition = shared
                .update(|store| store.apply_event(event, Channel::Push))
                .await;
            if disposition == Disposition::Stale {
                debug!(%job_id, kind, "push event for untracked job");
            }
        }
    }
}
