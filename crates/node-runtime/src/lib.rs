//! # Node Runtime Library
//!
//! This library exposes the node wiring for testing.
//! The main entry point is the `main.rs` binary.
//!
//! ## Modules
//!
//! - `container/` - Configuration and component wiring
//! - `runtime` - Start and graceful shutdown of a wired node

pub mod container;
pub mod runtime;

pub use container::{ConfigError, NodeConfig, NodeContainer};
pub use runtime::NodeRuntime;
