//! Core services of the access layer.

pub mod blockchain;
