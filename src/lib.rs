#![doc = include_str!("../README.md")]
#![warn(missing_docs)]

pub mod bundler;
pub mod config;
pub mod discover;
pub mod error;
pub mod extract;
pub mod matcher;
pub mod models;
pub mod packer;
pub mod paths;
pub mod project;
pub mod registry;
pub mod resolve;
pub mod rewrite;

pub use config::PackConfig;
pub use error::{PackError, Result};
pub use models::{PackReport, PathPattern, SourceUnit};
pub use packer::Packer;
pub use project::PackLayout;
pub use registry::DependencyRegistry;
