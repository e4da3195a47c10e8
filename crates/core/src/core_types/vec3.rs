//! Vector type alias for 3D positions.

use nalgebra::Vector3;

/// 3D vector type for world positions.
///
/// This is a simple alias for `nalgebra::Vector3<f32>`, used for record
/// positions, spatial queries and debug line endpoints.
pub type Vec3 = Vector3<f32>;
