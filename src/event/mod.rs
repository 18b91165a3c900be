//! Multicast callback registry
//!
//! A `Multicast<T>` is the one-to-many seam every producer in the crate
//! reports through: transports invoke it with received bytes, and
//! applications hang decoding or publishing closures off it.

pub mod multicast;

pub use multicast::{Handler, Multicast};
