//! Metric derivation and driver ranking.
//!
//! Normalized session records flow through the enrichment [`stages`] (composed
//! by [`pipeline`]) and are grouped into ranked driver summaries by
//! [`aggregate`]. [`analyzer`] wires these to files on disk.

pub mod aggregate;
pub mod analyzer;
pub mod pipeline;
pub mod stages;
pub mod types;
pub mod utility;
