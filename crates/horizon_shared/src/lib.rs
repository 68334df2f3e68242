//! # HORIZON Shared
//!
//! Common value types used by every HORIZON crate.
//!
//! ## CRITICAL RULE
//!
//! This crate must NEVER depend on:
//! - a rendering or physics engine
//! - threading or channel crates
//!
//! It holds plain `Copy` math types only.

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod math;

pub use math::{Bounds2, Vec2, Vec3};
