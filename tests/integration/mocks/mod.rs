//! Test doubles shared by the integration tests.

mod clients;
mod transports;

pub use clients::MockBlockChainClient;
pub use transports::MockJsonRpcTransport;
pub use ws_server::{SubscribeReply, TestWsServer};
