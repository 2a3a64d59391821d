#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Spatial indices for the Bastion simulation.
//!
//! Static structures live in a [`Quadtree`] that is rebuilt wholesale when the
//! structure set changes. Moving bodies live in one [`HashGrid`] per
//! [`MobileClass`](bastion_core::MobileClass) and are updated incrementally.
//! [`SpatialIndex`] owns all of them and is the only code that mutates index
//! internals; everything else reads query results.

pub mod hash_grid;
pub mod index;
pub mod pool;
pub mod quadtree;

pub use hash_grid::HashGrid;
pub use index::{SpatialIndex, SpatialStats};
pub use pool::VecPool;
pub use quadtree::{Quadtree, QuadtreeConfig};
