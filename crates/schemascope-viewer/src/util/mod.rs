pub mod cli;
pub mod colors;
pub mod config;
