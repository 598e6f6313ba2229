pub mod attempt_ctx;
pub mod submission;

pub use attempt_ctx::AttemptCtx;
pub use submission::{
    classify_browser_error, SubmissionController, SubmissionOutcome, SubmissionState, SubmissionTiming,
};
