pub mod app;
pub mod catalog;
pub mod config;
pub mod logging;
pub mod media;
pub mod model;
pub mod player;
pub mod probe;
pub mod queue;
pub mod service;
