//! Message registry, message layouts and the signal catalog
//!
//! The registry maps CAN identifiers to layouts, the layouts turn payload bytes
//! into signal values, and the catalog describes every signal a layout emits.

pub mod catalog;
pub mod layout;
pub mod registry;

// Re-export key types for convenience
pub use catalog::{SignalDescriptor, StatusBits};
pub use layout::{Field, Layout, Source};
pub use registry::{MessageDescriptor, MessageRegistry, RegistryStats};
