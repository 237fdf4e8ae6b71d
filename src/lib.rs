pub mod attribution;
pub mod classify;
pub mod config;
pub mod employees;
pub mod enrichment;
pub mod error;
pub mod grid;
pub mod logging;
pub mod model;
pub mod pipeline;
pub mod report;
pub mod utils;
pub mod weeks;

pub use config::{CliArgs, LookupSource, SummaryFormat, TimecardConfig};
pub use employees::{Employee, EmployeeId, Shift};
pub use enrichment::{DistributionLookup, DistributionRecord, LookupScalar, SqliteLookup, StaticLookup};
pub use error::{ErrorCode, TimecardError, TimecardResult};
pub use grid::Grid;
pub use logging::{LoggingConfig, init_logging};
pub use model::{RunWarning, WarningKind};
pub use pipeline::{RunSummary, TimecardRun, generate, run};
pub use report::TimecardReport;
