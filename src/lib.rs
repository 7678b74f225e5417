pub mod api;
pub mod app;
pub mod audio;
pub mod cli;
pub mod config;
pub mod favorites;
pub mod global;
pub mod studio;
