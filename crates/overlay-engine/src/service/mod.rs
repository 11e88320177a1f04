//! # Overlay Engine Service
//!
//! `OverlayEngine` orchestrates the outbound ports behind the
//! `OverlayApi` inbound port.

// Semantic submodules
mod advertisements;
mod api;
mod core;
mod gossip;
mod graph;
mod lookup;
mod submit;

pub use core::{EngineConfig, OverlayEngine, OverlayEngineBuilder};
