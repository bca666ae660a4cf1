pub mod archive;
pub mod commands;
pub mod config;
pub mod converter;
pub mod coordinator;
pub mod enumerate;
pub mod error;
pub mod job;
pub mod progress;
pub mod queue;
pub mod report;
pub mod retry;
