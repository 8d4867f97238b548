//! Property price prediction service.
//!
//! Loads a pre-trained regressor once at startup and serves
//! `POST /api/predict`, mapping a property's features to an estimated price.

pub mod config;
pub mod handlers;
pub mod models;
pub mod services;
pub mod startup;

pub use startup::{AppState, Application};
