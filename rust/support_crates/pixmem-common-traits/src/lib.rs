//! Traits and definitions used throughout the pixmem ecosystem.
//!
//! This crate provides the common traits shared between the memory providers
//! (allocators, pools) and the buffer group core.
//!
//! # Modules
//!
//! - [`segment_owner`]: Traits for types that own one contiguous segment of a
//!   buffer group, and the classification of their backing memory

pub mod segment_owner;
