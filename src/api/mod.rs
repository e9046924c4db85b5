// Entry points for embedding hosts: tracing setup and viewer construction.

pub mod simple;
pub mod viewer_api;
