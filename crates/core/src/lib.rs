//! Core business logic for foodgram.

pub mod pdf;
pub mod services;
pub mod views;

pub use services::*;
pub use views::*;
