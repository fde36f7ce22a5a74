pub mod builtin;
pub mod fork;
pub mod job;
pub mod job_process;
pub mod process;
pub mod redirect;
pub mod registry;
pub mod signal;
pub mod state;
pub mod wait;

pub use builtin::BuiltinProcess;
pub use job::Job;
pub use job_process::JobProcess;
pub use process::Process;
pub use redirect::Redirect;
pub use registry::{JobId, JobRegistry};
pub use state::ProcessState;
pub use wait::{is_job_completed, is_job_stopped};
