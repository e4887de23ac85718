// Package model provides the service descriptor shared by discovery and probing.

pub mod service;

// Re-export main types
pub use service::Service;
