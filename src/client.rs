//! Client interaction controller
//!
//! Tracks, per session, whether the user is starting a task or answering a
//! suspended one, and routes their input to the right call. Implements the
//! Elm Architecture pattern: a pure [`transition`] plus an effect-running
//! [`InteractionController`].

mod affordance;
mod controller;
mod effect;
mod event;
mod state;
mod transition;
mod transport;

#[cfg(test)]
mod proptests;

pub use affordance::InputAffordance;
pub use controller::{ClientError, InteractionController, Update};
pub use effect::Effect;
pub use event::ClientEvent;
pub use state::ControllerState;
pub use transition::{transition, TransitionError, TransitionResult};
pub use transport::{HttpTransport, LocalTransport, Transport, TransportError};
