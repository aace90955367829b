//! Streaming channels to the emotion-inference backend
//!
//! One WebSocket per modality: encoded samples out, prediction frames back.
//! Channels never retry or replay; a transport failure leaves the channel
//! closed and the caller may open a fresh one.

mod channel;
mod messages;

pub use channel::{ChannelError, ChannelEvent, StreamingChannel};
pub use messages::{parse_reply, PredictionEntry, StreamFrame, StreamReply};
