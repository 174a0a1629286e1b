//! prestasi-workflow: the achievement lifecycle engine.
//!
//! [`WorkflowEngine`] ties the content store, the reference store and the
//! directory together. It owns the status state machine, advisor
//! authorization, the create-time dual write, and the status-log side effect
//! of every transition.

mod admin;
mod content;
mod engine;
mod error;
mod views;

pub use content::Upload;
pub use engine::{CreatedAchievement, WorkflowEngine};
pub use error::WorkflowError;
