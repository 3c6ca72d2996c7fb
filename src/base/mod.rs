//! Foundation types for the Land toolchain.
//!
//! This module provides fundamental types used throughout the crate:
//! - [`PointLocation`], [`SegmentLocation`] - Source positions and spans
//! - [`Message`], [`MessageKind`] - Diagnostics accumulated in logs
//! - Well-known symbol names ([`constants`])
//!
//! This module has NO dependencies on other land modules.

pub mod constants;
mod location;
mod message;

pub use location::{PointLocation, SegmentLocation};
pub use message::{Message, MessageKind, has_errors};
