//! # Integration Scenarios
//!
//! Multi-node flows over loopback TCP:
//!
//! 1. **Replication**: a store on one node lands on every connected peer
//! 2. **Retrieval**: local hits, remote fetches and misses
//! 3. **Resilience**: peers leaving, restarts, misconfigured keys

pub mod replication;
pub mod resilience;
pub mod retrieval;
