//! Wire protocol shared by the gateway and its clients
//!
//! Interrupt descriptors, replies, the response envelope, and the request and
//! rejection bodies exchanged over HTTP.

mod envelope;
mod interrupt;
mod outcome;
mod reply;
mod request;

pub use envelope::{Envelope, EnvelopeError};
pub use interrupt::{Choice, Interrupt, InterruptError, InterruptKind, TaskHandle};
pub use outcome::{Failure, WorkflowOutcome};
pub use reply::{Reply, ReplyError, ResolvedReply, AFFIRMATIVE, NEGATIVE};
pub use request::{ErrorCode, Rejection, ResetResponse, ResumeRequest, StartRequest};
