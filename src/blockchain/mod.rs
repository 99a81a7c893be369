// src/blockchain/mod.rs
//! Read-only access to an EVM JSON-RPC endpoint.

pub mod evm_client;
