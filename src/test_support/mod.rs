//! Shared helpers for the in-crate test suites.

pub mod socket_guard;
