//! The realtime capability: per-topic pub/sub used to push live events to
//! active sessions without polling. Topics are created lazily on first
//! subscribe and torn down when their last subscriber leaves.

mod channels;
mod error;

pub use channels::{Channels, Subscriber, Subscription};
pub use error::{ChannelError, RecvError};
