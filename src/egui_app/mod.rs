//! egui application shell: UI state, controller, and renderer.

pub mod controller;
pub mod state;
pub mod ui;
