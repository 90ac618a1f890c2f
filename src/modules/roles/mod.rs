//! Role and permission administration.

pub mod controller;
pub mod router;
pub mod service;
