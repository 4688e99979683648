//! `ar_core`
//!
//! Core libraries for an augmented-reality session: vector/matrix math,
//! GPS-to-local coordinate conversion, buffered motion, the virtual camera,
//! and the geo-referenced waypoint graph.
//!
//! Design goals:
//! - Deterministic, synchronous compute driven by external per-frame ticks.
//! - Clear separation of concerns (math, geo, motion, camera, graph, events).
//! - Traits at the host-platform seams (location service, path highlighting).
//! - No `unsafe`.

pub mod camera;
pub mod config;
pub mod events;
pub mod geo;
pub mod graph;
pub mod math;
pub mod motion;

pub mod prelude {
    //! Commonly used exports.

    pub use crate::camera::*;
    pub use crate::config::*;
    pub use crate::events::*;
    pub use crate::geo::*;
    pub use crate::graph::*;
    pub use crate::math::*;
    pub use crate::motion::*;
}
