//! Command implementations

pub mod versionup;
