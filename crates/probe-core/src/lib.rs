//! Core probe library (backend client, stream accumulator, config, reports).

pub mod accumulator;
pub mod backend;
pub mod config;
pub mod error;
pub mod images;
pub mod logging;
pub mod report;
