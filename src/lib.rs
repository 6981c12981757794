//! montage - Sprite sheet and stylesheet generator
//!
//! A library for stacking groups of images into vertical sprite sheets,
//! rebuilding only what changed and emitting SCSS that positions each image.

pub mod cache;
pub mod cli;
pub mod discovery;
pub mod error;
pub mod optimise;
pub mod output;
pub mod render;
pub mod sprite;
pub mod stylesheet;

pub use cache::{Cache, CacheEntry, CacheStore, Namespace, CACHE_VERSION};
pub use discovery::{Manifest, Pattern, Project, SpriteDefinition, SpriteEntry, SpriteOptions};
pub use error::{MontageError, Result};
pub use optimise::{Backend, Capabilities, Optimised, Optimiser, Progress};
pub use render::{compose, write_png};
pub use sprite::{sha256_hex, SourceImage, Sprite};
