// src/models/mod.rs
//! Data structures exchanged between holders, issuers and relying parties.

pub mod challenge;
pub mod claim;
pub mod credential;
pub mod credential_object;
pub mod did;
pub mod requested;
pub mod verdict;
