pub mod charts;
pub mod config;
pub mod controls;
pub mod filters;
pub mod loader;
pub mod logging;
pub mod manager;
pub mod model;
pub mod page;
pub mod plot;
