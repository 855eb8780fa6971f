//! Library exports for the tinylink application
//!
//! This module exposes internal components for testing and potential library usage.

pub mod handler;
pub mod id;
pub mod middleware;
pub mod model;
pub mod password;
pub mod route;
pub mod store;
