// src/services/mod.rs
//! Validation services: key authorization, trust chains, policy, orchestration.

pub mod authorization;
pub mod organisation;
pub mod policy;
pub mod trust_chain;
pub mod verifier;
