//! Pokedex TUI
//!
//! This library exposes the app's modules for testing.

pub mod action;
pub mod api;
pub mod effect;
pub mod reducer;
pub mod sprite;
pub mod state;
pub mod ui;
