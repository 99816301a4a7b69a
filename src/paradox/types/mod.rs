//! Shared type definitions: models, errors, and the format family.

pub mod error;
pub mod filetypes;
pub mod models;
