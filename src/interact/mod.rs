//! Hit testing and the interaction state machine

pub mod hit;
pub mod state;

pub use hit::{HitCandidate, HitTarget, HitTester};
pub use state::{InteractionState, Operation};
