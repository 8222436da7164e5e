// The job pipeline: sequencing, polling, and failure mapping for one
// end-to-end video generation request.

pub mod job;
pub mod poller;
pub mod providers;
pub mod runner;

pub use job::{Job, JobMode, JobStatus, Stage};
pub use poller::PollPolicy;
pub use providers::Providers;
pub use runner::{JobRequest, Pipeline};
