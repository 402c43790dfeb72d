//! State module for tracking walk progress
//!
//! - `VisitState`: lifecycle of a single category visit

mod visit_state;

pub use visit_state::VisitState;
