//! CLI command implementations.

pub mod archs;
pub mod common;
pub mod inspect;
pub mod route;
pub mod version;
