//! # pagerduty-workflow
//!
//! Step tree model and generated-input reconciliation for PagerDuty incident
//! workflows.
//!
//! The PagerDuty API fills in default values for action inputs the user did
//! not declare. This crate keeps those defaults from showing up as drift:
//!
//! - [`extract_memo`] records which inputs the user declared, from the last
//!   applied configuration.
//! - [`reconcile`] tags every input of a server-returned tree as
//!   user-specified or server-generated using that memo.
//! - [`restore_generated_inputs`] keeps a plan from proposing the removal of
//!   server-generated inputs.
//! - [`outbound_steps`] strips server-generated inputs before a tree is sent
//!   back to the API.
//!
//! Everything operates on the typed [`Step`] tree; [`steps_from_attributes`]
//! and [`steps_to_attributes`] convert at the schema boundary.
//!
//! ## Example
//!
//! ```
//! use pagerduty_workflow::{Input, Step, extract_memo, reconcile};
//!
//! let configured = vec![
//!     Step::new("Notify", "pagerduty.com:incident-workflows:send-status-update:1")
//!         .with_id("PSTEP1")
//!         .with_input(Input::new("Message", "Investigating")),
//! ];
//! let memo = extract_memo(&configured);
//!
//! let observed = vec![
//!     Step::new("Notify", "pagerduty.com:incident-workflows:send-status-update:1")
//!         .with_id("PSTEP1")
//!         .with_input(Input::new("Message", "Investigating"))
//!         .with_input(Input::new("Audience", "internal")),
//! ];
//!
//! let annotated = reconcile(&observed, Some(&memo), false);
//! assert!(!annotated[0].inputs[0].is_generated());
//! assert!(annotated[0].inputs[1].is_generated());
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod attributes;
mod diff;
mod error;
mod memo;
mod reconcile;
mod step;

pub use attributes::{
    STEP_KEY, splice_restored_inputs, steps_from_attributes, steps_to_attributes,
};
pub use diff::{DiffCustomization, RestoredInput, restore_generated_inputs};
pub use error::MalformedStateError;
pub use memo::{SpecifiedStep, SpecifiedStepMemo, extract_memo};
pub use reconcile::{outbound_steps, reconcile};
pub use step::{InlineInputGroup, Input, Provenance, Step};
