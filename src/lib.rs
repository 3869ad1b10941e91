pub mod cli;
pub mod color;
pub mod command;
pub mod config;
pub mod error;
pub mod extract;
pub mod fetch;
pub mod github;
pub mod http;
pub mod install;
pub mod path;
pub mod pipeline;
pub mod platform;
