mod compute;
mod ingest;
mod messages;
mod scheduler;

pub use compute::ComputationEngine;
pub use ingest::IngestionCoordinator;
pub use messages::{
    ComputeOutcome, CycleReport, IngestOutcome, MarketReport, PipelineError, SkipReason,
    SkippedCandle,
};
pub use scheduler::CycleScheduler;
