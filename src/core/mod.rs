//! Domain types, configuration and the collection registry.

pub mod capabilities;
pub mod config;
pub mod models;
pub mod registry;
