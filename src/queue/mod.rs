//! Ordered reassembly of out-of-order results
//!
//! Each listing page owns one [`ReorderBuffer`]. Child responses are inserted
//! at the position their link held on the page and are released to the sink
//! in that same order.

mod reorder;

pub use reorder::{BufferError, Drain, ReorderBuffer};
