//! Public library modules for the CLI crate
pub mod find;
pub mod render;
