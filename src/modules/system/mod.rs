//! Permission sync and catalog inspection.

pub mod controller;
pub mod router;
pub mod service;
