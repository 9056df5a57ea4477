//! HTTP API for the resume gateway

mod handlers;
mod types;

pub use handlers::create_router;
pub use types::HealthResponse;

use crate::dispatcher::ResumeDispatcher;
use crate::workflow::Workflow;
use std::sync::Arc;

/// Dispatcher over whichever workflow the server was built with
pub type SharedDispatcher = ResumeDispatcher<Arc<dyn Workflow>>;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub dispatcher: Arc<SharedDispatcher>,
}

impl AppState {
    pub fn new(workflow: Arc<dyn Workflow>) -> Self {
        Self {
            dispatcher: Arc::new(ResumeDispatcher::new(workflow)),
        }
    }
}
