pub mod analyzers;
pub mod config;
pub mod error;
pub mod fetch;
pub mod normalize;
pub mod output;
pub mod parser;

pub use analyzers::aggregate::{SummaryOptions, summarize, unique_drivers};
pub use analyzers::pipeline::{Pipeline, enrich};
pub use analyzers::types::{DriverSummary, SessionFilter, SessionResult, SessionTable};
pub use error::AnalysisError;
