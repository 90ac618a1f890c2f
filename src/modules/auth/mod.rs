//! Session endpoints: login, logout and what the caller may see.

pub mod controller;
pub mod router;
pub mod service;
