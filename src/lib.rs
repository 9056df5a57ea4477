//! Resume gateway
//!
//! Interrupt/resume protocol between chat clients and long-running workflows
//! that pause for human input. The server half maps sessions to their one
//! pending task and routes replies back into the suspended workflow; the
//! client half tracks what each session is waiting for and shapes user input
//! accordingly.

pub mod api;
pub mod client;
pub mod config;
pub mod dispatcher;
pub mod protocol;
pub mod session;
pub mod workflow;
