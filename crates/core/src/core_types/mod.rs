//! Core types and utilities

pub mod component_data;
pub mod handle;
pub mod spatial;
pub mod vec3;

pub use component_data::{BurnStage, ComponentData, ComponentDataRegistry};
pub use handle::{HandleAllocator, ObjectHandle};
pub use spatial::{LinearScan, SpatialIndex, SpatialLookup};
pub use vec3::Vec3;
