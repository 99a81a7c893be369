// src/wallet/mod.rs
//! Signing facility and signature recovery.

pub mod key_management;
pub mod signature;
