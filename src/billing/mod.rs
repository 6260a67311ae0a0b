pub mod batch;
pub mod period;

pub use batch::{BatchError, BatchOutcome, BatchPlan, MonthlyBatchGenerator};
pub use period::PeriodLabel;
