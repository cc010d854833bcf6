//! Farmie backend services.
//!
//! HTTP client for the crop classification, family lookup, recommendation and
//! farm listing endpoints.

pub mod backend;
pub mod client;
pub mod types;

pub use backend::{CropBackend, CropCatalog};
pub use client::FarmieClient;
pub use types::{Classification, CultivatedCrop, FarmRecord, ImageRef};
