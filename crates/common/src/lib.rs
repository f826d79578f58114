//! Common utilities shared across Token Gate components.

#![warn(clippy::pedantic)]

/// Module for JWT utilities (size limits, header decoding, key material)
pub mod jwt;
