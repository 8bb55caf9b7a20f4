//! Common utilities and shared types for foodgram.
//!
//! This crate provides foundational components used across all foodgram crates:
//!
//! - **Configuration**: Application settings via [`Config`]
//! - **Error handling**: Unified error types via [`AppError`] and [`AppResult`]
//! - **ID Generation**: ULID-based identifiers and opaque tokens via [`IdGenerator`]
//! - **Passwords**: Pluggable strength rules via [`PasswordPolicy`]
//! - **Storage**: Recipe image storage and `data:` URL decoding
//!
//! # Example
//!
//! ```no_run
//! use foodgram_common::{Config, IdGenerator, AppResult};
//!
//! fn example() -> AppResult<()> {
//!     let config = Config::load()?;
//!     let id_gen = IdGenerator::new();
//!     let id = id_gen.generate();
//!     println!("Generated ID: {} for {}", id, config.server.url);
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod id;
pub mod password;
pub mod storage;

pub use config::{Config, DatabaseConfig, MediaConfig, PaginationConfig, ServerConfig};
pub use error::{AppError, AppResult};
pub use id::IdGenerator;
pub use password::{DefaultPasswordPolicy, PasswordContext, PasswordPolicy};
pub use storage::{
    DecodedImage, LocalStorage, StorageBackend, UploadedFile, decode_image_data_url,
    generate_storage_key,
};
