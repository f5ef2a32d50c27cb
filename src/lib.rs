//! LT Grid Guard
//!
//! Fault detection, localization and isolation for low-tension distribution
//! networks. Field events flow through the [`evidence`] store, the edge
//! [`scoring`] pass and the [`cases`] manager, which plans isolation via the
//! [`isolation`] planner and switches devices through the [`dispatch`] layer.

pub mod api;
pub mod cases;
pub mod config;
pub mod controller;
pub mod dispatch;
pub mod domain;
pub mod error;
pub mod evidence;
pub mod isolation;
pub mod notify;
pub mod repo;
pub mod scoring;
pub mod simulation;
pub mod telemetry;
pub mod topology;

pub use error::{GridError, Result};
