//! # Integration Tests Crate
//!
//! End-to-end scenarios for the overlay services engine: real BEEF
//! envelopes flowing through submission, graph maintenance, lookup
//! hydration and proof back-fill, over the in-memory storage adapter.
//!
//! ## Structure
//!
//! ```text
//! integration-tests/
//! └── src/
//!     ├── lib.rs        # This file
//!     ├── fixtures.rs   # Transaction builders and plug-in stubs
//!     └── scenarios.rs  # The end-to-end scenarios
//! ```

pub mod fixtures;

#[cfg(test)]
mod scenarios;
