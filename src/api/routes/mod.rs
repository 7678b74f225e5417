//! API route modules.

pub mod favorites;
pub mod studio;
