//! scorestack-observe: dashboards, alarms and ticketing.
//!
//! Builders hand this crate metric names and physical resource names; it
//! returns dashboards and [`AlarmDef`]s, and declares them into stacks with
//! the target's ticket routing applied.
//!
//! # Architecture
//!
//! ```text
//! catalog   CUSTOM_METRICS (application metrics + alarm thresholds)
//! sets      queue_alarms / function_alarms / endpoint_alarms → AlarmDef
//! alarm     declare(stack, AlarmDef, &Ticketing) → AlarmRef
//! panels    function / table / endpoint dashboards
//! monitor   custom metric dashboard, custom alarms, alarm overview
//! ```

pub mod alarm;
pub mod catalog;
pub mod dashboard;
pub mod monitor;
pub mod panels;
pub mod sets;
pub mod ticketing;

pub use alarm::{AlarmDef, AlarmRef};
pub use catalog::{AlarmSpec, CUSTOM_METRICS};
pub use dashboard::{Dashboard, Widget};
pub use ticketing::{Severity, Ticketing};
