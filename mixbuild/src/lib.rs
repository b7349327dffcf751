//! Mixed-build assembler library.
//!
//! This crate combines a generic system image with a device-specific vendor
//! image set. It verifies interface compatibility in both directions,
//! optionally patches the system image for a legacy vendor ABI, and publishes
//! the device build with a recomposed image archive. It is used by the
//! `mixbuild` CLI binary and can be driven programmatically for testing.
//!
//! # Modules
//!
//! - [`archive`] - Member extraction and deterministic archive packaging
//! - [`cli`] - Command-line argument definitions
//! - [`composer`] - Overlay of system images onto the device image set
//! - [`config`] - Validated run configuration
//! - [`error`] - Error types for every pipeline stage
//! - [`exec`] - External tool invocation with explicit search paths
//! - [`interrupt`] - SIGINT and SIGTERM handling
//! - [`layout`] - Fixed archive member names and artifact patterns
//! - [`locator`] - Artifact lookup inside build directories
//! - [`output`] - Progress and summary formatting
//! - [`patcher`] - Legacy ABI patching of the system image
//! - [`pipeline`] - Stage orchestration
//! - [`publisher`] - Publication into the distribution directory
//! - [`scratch`] - Per-run temporary workspace
//! - [`spl`] - Security patch level comparison
//! - [`verifier`] - Bidirectional compatibility checks

pub mod archive;
pub mod cli;
pub mod composer;
pub mod config;
pub mod error;
pub mod exec;
pub mod interrupt;
pub mod layout;
pub mod locator;
pub mod output;
pub mod patcher;
pub mod pipeline;
pub mod publisher;
pub mod scratch;
pub mod spl;
#[cfg(any(test, feature = "test-support"))]
pub mod test_utils;
pub mod verifier;
