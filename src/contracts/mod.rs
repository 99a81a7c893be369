// src/contracts/mod.rs
//! Bindings for on-chain identity contracts.

pub mod identity_registry;
pub mod memory;
