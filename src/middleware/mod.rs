//! Request extractors for the HTTP server

pub mod identity;

pub use identity::HolderIdentity;
