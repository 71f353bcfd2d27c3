//! Motorpool - car pool lease service
//!
//! HTTP and event-stream surface over [`motorpool_core::LeaseRegistry`].

#![forbid(unsafe_code)]

pub mod api;
pub mod cli;
pub mod middleware;
pub mod server;
pub mod websocket;
