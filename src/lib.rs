#[cfg(test)]
mod tests;

#[cfg(test)]
pub use tests::support;

pub mod config;
pub mod discovery;
pub mod model;
pub mod readiness;
pub mod report;
