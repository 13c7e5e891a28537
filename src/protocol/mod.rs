//! Wire types exchanged with the remote realtime session.

pub mod envelope;
pub mod result;
pub mod schema;

pub use envelope::{Envelope, InboundMessage, OutboundEnvelope, OutboundMessage, timestamp};
pub use result::ToolResult;
pub use schema::{ParamSpec, ParamType, ParameterSchema, ToolDescriptorDict};
