//! Conversions between configuration trees and Streamdal messages.
//!
//! Each builder has a forward direction (configuration or state into a
//! request message) and a reverse direction (message into canonical state).
//! Plan runs configuration through both so that defaults are filled in and
//! enum names are normalized before anything is diffed.

pub mod notification;
pub mod pipeline;

pub use notification::{build_notification, notification_to_state};
pub use pipeline::{build_pipeline, pipeline_to_state, StepKind};
