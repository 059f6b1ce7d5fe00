//! Command implementations

pub mod catalog;
pub mod instances;
pub mod lifecycle;

#[cfg(test)]
pub mod fake;
