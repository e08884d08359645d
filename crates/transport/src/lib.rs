pub mod backoff;
pub mod channel;
pub mod correlator;

pub use backoff::{Backoff, BackoffPolicy};
pub use channel::{ChannelSender, ChannelState, DriverChannel};
pub use correlator::{Correlator, PendingReply, Reply};
