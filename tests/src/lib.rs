//! # Quantum-Vault Test Suite
//!
//! Whole-node scenarios run against real TCP listeners on loopback and
//! on-disk blob stores in temporary directories.
//!
//! ## Structure
//!
//! ```text
//! tests/
//! ├── benches/          # Criterion benchmarks
//! └── src/
//!     ├── fixtures.rs   # TestNode / cluster helpers
//!     └── integration/
//!         ├── replication.rs  # Store fan-out
//!         ├── retrieval.rs    # Local hits, remote fetch, NotFound
//!         └── resilience.rs   # Peer loss and restarts
//! ```
//!
//! ## Running Tests
//!
//! ```bash
//! # All tests
//! cargo test -p qv-tests
//!
//! # By category
//! cargo test -p qv-tests integration::retrieval::
//!
//! # Benchmarks
//! cargo bench -p qv-tests
//! ```

pub mod fixtures;
pub mod integration;
