//! Tool registry, dispatch and the realtime session that serves them.

mod builder;
mod dispatcher;
mod service;
mod session;
mod tools;
mod transport;

pub use builder::{Bridge, BridgeBuilder};
pub use dispatcher::Dispatcher;
pub use service::ToolBridge;
pub use session::{LoopExit, RealtimeSession, RetryPolicy, SessionState};
pub use tools::{Params, ToolDescriptor, ToolFuture, ToolRegistry, ToolSpec};
pub use transport::{BoxFuture, Connector, Transport, WsConnector};
