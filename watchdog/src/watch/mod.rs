//! Deployment reconciliation from filesystem events

pub mod classify;
pub mod events;
pub mod handler;
pub mod lifecycle;
pub mod mutation;
pub mod navoceano;
