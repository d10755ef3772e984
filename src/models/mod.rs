pub mod instance;
pub mod observation;
pub mod run;

pub use instance::{FailureReason, Instance, InstanceState};
pub use observation::{ProbeReport, ProcessStatus};
pub use run::{InstanceOutcome, RunRecord};
