pub mod app;
pub mod cli;
pub mod config;
pub mod gateway;
pub mod modal;
pub mod model;
pub mod orchestrator;
pub mod output;
pub mod render;
pub mod surface;

#[cfg(test)]
mod tests;
