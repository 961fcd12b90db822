//! Client-side access layer for blockchain nodes.
//!
//! Exposes one capability contract, [`services::blockchain::BlockChainClient`], implemented over
//! JSON-RPC, REST and WebSocket transports, plus a failover client that spreads operations over
//! several prioritized endpoints.

pub mod bootstrap;
pub mod models;
pub mod services;
pub mod utils;
