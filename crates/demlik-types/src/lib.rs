//! Common types module for the demlik order system.
//!
//! This module defines the core data types and structures used throughout
//! the order system. It provides a centralized location for shared types
//! to ensure consistency across all components.

/// API types for HTTP endpoints and request/response structures.
pub mod api;
/// Change-feed event types for table-level notifications.
pub mod events;
/// Order types including statuses, line items, and the transition table.
pub mod order;
/// Registry trait for self-registering implementations.
pub mod registry;
/// Shop-level types: products, profiles, roles, system settings.
pub mod shop;
/// Configuration validation types for ensuring type-safe configurations.
pub mod validation;

// Re-export all types for convenient access
pub use api::*;
pub use events::*;
pub use order::*;
pub use registry::*;
pub use shop::*;
pub use validation::*;
