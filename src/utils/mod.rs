// src/utils/mod.rs
//! Helper functions shared by the services.

pub mod crypto;
pub mod serialization;
