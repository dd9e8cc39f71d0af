//! State module for tracking pagination progress
//!
//! # Components
//!
//! - `PagePhase`: the lifecycle of one listing page, with its transition table

mod page_phase;

pub use page_phase::PagePhase;
