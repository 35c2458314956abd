//! File format parsing layer for Pinnacle exports.
//!
//! This module provides the mid-level parsing layer that bridges between
//! raw file contents and the high-level readers in [`reader`](crate::pinnacle::reader).
//!
//! # Module Organization
//!
//! - [`header`]: Flat `key = value;` image headers
//! - [`block`]: The nested `key = { ... };` grammar of trial files
//! - [`roi`]: Structure sections, contours and point lists of `.roi` files
//! - [`volume`]: Raw image volumes and per-slice dose buffers
//!
//! # Architecture
//!
//! ```text
//! Patient directory:
//! ┌─────────────────┐
//! │  ImageSet.header│ ← header::parse()
//! │  ImageSet.img   │ ← volume::decode()
//! ├─────────────────┤
//! │  plan.roi       │ ← roi::parse()
//! ├─────────────────┤
//! │  plan.Trial     │ ← block::parse()
//! │  plan.binary.NNN│ ← volume::read_dose_volume()
//! └─────────────────┘
//! ```

pub mod block;
pub mod header;
pub mod roi;
pub mod volume;
