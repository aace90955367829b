use super::messages::{parse_reply, PredictionEntry, StreamFrame, StreamReply};
use crate::capture::Sample;
use crate::session::Modality;
use futures_util::{SinkExt, StreamExt};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, error, info, warn};

#[derive(Debug, Error)]
pub enum ChannelError {
    #[error("failed to connect to {endpoint}: {source}")]
    Connect {
        endpoint: String,
        source: tokio_tungstenite::tungstenite::Error,
    },
}

/// Connection-lifecycle and prediction events surfaced by a channel
#[derive(Debug)]
pub enum ChannelEvent {
    /// Predictions in the order the backend emitted them; no reordering or
    /// deduplication happens here
    Prediction(Vec<PredictionEntry>),
    /// Transport failure or backend error frame; the channel stays closed
    Error(String),
    Closed,
}

/// One bidirectional message channel per modality to the inference backend
///
/// Samples go out as `StreamFrame`s through a send task; replies come back
/// through a receive task as `ChannelEvent`s. Delivery is at-most-once per
/// sample: nothing is retried or replayed after a failure, and `send` on a
/// channel that is no longer open is a counted no-op.
pub struct StreamingChannel {
    modality: Modality,
    out_tx: std::sync::Mutex<Option<mpsc::Sender<Sample>>>,
    open: Arc<AtomicBool>,
    discarded: Arc<AtomicUsize>,
    send_task: std::sync::Mutex<Option<JoinHandle<()>>>,
    recv_task: std::sync::Mutex<Option<JoinHandle<()>>>,
}

impl StreamingChannel {
    /// Open a channel to `endpoint` for one modality. Returns the channel
    /// and the event receiver.
    pub async fn open(
        endpoint: &str,
        modality: Modality,
        capacity: usize,
    ) -> Result<(Self, mpsc::Receiver<ChannelEvent>), ChannelError> {
        let (ws_stream, _) = tokio_tungstenite::connect_async(endpoint)
            .await
            .map_err(|source| ChannelError::Connect {
                endpoint: endpoint.to_string(),
                source,
            })?;

        info!(modality = modality.as_str(), endpoint, "streaming channel open");

        let (mut write, mut read) = ws_stream.split();
        let (out_tx, mut out_rx) = mpsc::channel::<Sample>(capacity.max(1));
        let (evt_tx, evt_rx) = mpsc::channel::<ChannelEvent>(capacity.max(1));

        let open = Arc::new(AtomicBool::new(true));

        let send_open = Arc::clone(&open);
        let send_evt = evt_tx.clone();
        let send_task = tokio::spawn(async move {
            while let Some(sample) = out_rx.recv().await {
                let frame = StreamFrame::new(modality, &sample.bytes);
                let text = match serde_json::to_string(&frame) {
                    Ok(text) => text,
                    Err(e) => {
                        error!("failed to serialize stream frame: {}", e);
                        continue;
                    }
                };
                if let Err(e) = write.send(Message::Text(text)).await {
                    error!(modality = modality.as_str(), "failed to send sample: {}", e);
                    send_open.store(false, Ordering::SeqCst);
                    let _ = send_evt.send(ChannelEvent::Error(e.to_string())).await;
                    break;
                }
            }
            // Channel handle dropped its sender or the socket failed; say
            // goodbye if the transport is still up.
            let _ = write.send(Message::Close(None)).await;
        });

        let recv_open = Arc::clone(&open);
        let recv_task = tokio::spawn(async move {
            while let Some(message) = read.next().await {
                let message = match message {
                    Ok(message) => message,
                    Err(e) => {
                        error!(modality = modality.as_str(), "failed to read message: {}", e);
                        recv_open.store(false, Ordering::SeqCst);
                        let _ = evt_tx.send(ChannelEvent::Error(e.to_string())).await;
                        return;
                    }
                };
                match message {
                    Message::Text(text) => match parse_reply(modality, &text) {
                        Ok(StreamReply::Predictions(entries)) => {
                            if evt_tx.send(ChannelEvent::Prediction(entries)).await.is_err() {
                                // Event consumer gone, nothing left to do.
                                return;
                            }
                        }
                        Ok(StreamReply::BackendError(message)) => {
                            warn!(
                                modality = modality.as_str(),
                                "backend error frame: {}", message
                            );
                            recv_open.store(false, Ordering::SeqCst);
                            let _ = evt_tx.send(ChannelEvent::Error(message)).await;
                            return;
                        }
                        Ok(StreamReply::Empty) => {}
                        Err(e) => {
                            // Malformed payloads are logged and skipped,
                            // never fatal to the channel.
                            warn!(
                                modality = modality.as_str(),
                                "unparseable reply ({}): {:?}", e, text
                            );
                        }
                    },
                    Message::Binary(bin) => {
                        warn!(modality = modality.as_str(), "unexpected binary message: {} bytes", bin.len());
                    }
                    Message::Close(reason) => {
                        info!(modality = modality.as_str(), "connection closed: {:?}", reason);
                        break;
                    }
                    _ => {}
                }
            }
            recv_open.store(false, Ordering::SeqCst);
            let _ = evt_tx.send(ChannelEvent::Closed).await;
        });

        Ok((
            Self {
                modality,
                out_tx: std::sync::Mutex::new(Some(out_tx)),
                open,
                discarded: Arc::new(AtomicUsize::new(0)),
                send_task: std::sync::Mutex::new(Some(send_task)),
                recv_task: std::sync::Mutex::new(Some(recv_task)),
            },
            evt_rx,
        ))
    }

    pub fn modality(&self) -> Modality {
        self.modality
    }

    pub fn is_open(&self) -> bool {
        self.open.load(Ordering::SeqCst)
    }

    /// Samples discarded because the channel was closed or backed up
    pub fn discarded(&self) -> usize {
        self.discarded.load(Ordering::SeqCst)
    }

    /// Queue a sample for transmission. On a closed or congested channel
    /// this is a no-op with a reported discard, never a failure.
    pub async fn send(&self, sample: Sample) {
        if !self.is_open() {
            self.discarded.fetch_add(1, Ordering::SeqCst);
            debug!(
                modality = self.modality.as_str(),
                "channel closed, discarding sample"
            );
            return;
        }
        let tx = match self.out_tx.lock() {
            Ok(guard) => guard.clone(),
            Err(_) => None,
        };
        match tx {
            Some(tx) => {
                if tx.try_send(sample).is_err() {
                    self.discarded.fetch_add(1, Ordering::SeqCst);
                    warn!(
                        modality = self.modality.as_str(),
                        "send queue full or closed, discarding sample"
                    );
                }
            }
            None => {
                self.discarded.fetch_add(1, Ordering::SeqCst);
            }
        }
    }

    /// Close the channel. Pending unsent samples are abandoned; there is no
    /// cleanup handshake with the backend beyond the close frame.
    pub fn close(&self) {
        self.open.store(false, Ordering::SeqCst);
        // Dropping the sender ends the send task, which emits the close
        // frame; the receive task then winds down on the peer's close.
        if let Ok(mut guard) = self.out_tx.lock() {
            guard.take();
        }
        // Send task exits on its own once the queue drains and emits the
        // close frame, so it is left to finish; the receive task is torn
        // down directly.
        if let Ok(mut guard) = self.send_task.lock() {
            guard.take();
        }
        if let Ok(mut guard) = self.recv_task.lock() {
            if let Some(task) = guard.take() {
                task.abort();
            }
        }
    }
}

impl Drop for StreamingChannel {
    fn drop(&mut self) {
        self.close();
    }
}
