pub mod config;
pub mod model;
pub mod patterns;
pub mod runtime;

// Live state detection
pub mod probe;
pub mod reconcile;
pub mod poller;

// Grids and cursor movement
pub mod quick_actions;
pub mod grid;
pub mod project_grid;
pub mod navigation;
