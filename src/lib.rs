#![warn(unused_extern_crates)]
//! Isosurface extraction and sculpting over a cubic grid of scalar samples.
//!
//! A [`ValueGrid`] holds the samples, a [`marcher::Marcher`] turns it into an
//! indexed [`Mesh`] with marching cubes, and an [`EditSession`] ties the two
//! together for brush edits.

pub use glam;

mod error;
pub use error::*;

mod config;
pub use config::*;

mod interpolate;
pub use interpolate::*;

mod grid;
pub use grid::*;

pub mod polygonize;

mod dedup;
pub use dedup::*;

mod mesh;
pub use mesh::*;

mod session;
pub use session::*;

pub mod tables;
pub mod tool;
pub mod marcher;
pub mod utils;
