pub mod config;
pub mod envelope;
pub mod error;
pub mod paths;

pub use config::Config;
pub use envelope::{AgentRequest, InboundFrame, OutboundFrame, RequestId, PROTOCOL_VERSION};
pub use error::{Error, Result};
pub use paths::Paths;
