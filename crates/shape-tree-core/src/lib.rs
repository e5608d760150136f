//! Core domain types shared across the shape-tree workspace.
//!
//! The growth engine never renders anything itself. It talks to a scene
//! through the narrow [`SceneBackend`] trait: create a primitive solid, wire
//! visual parents, apply local transforms, and flag objects for deferred
//! teardown. [`SceneRecorder`] is an in-memory backend that keeps every call
//! observable for tools and tests.

use std::fmt;
use std::ops::{Add, Mul, Neg};

use serde::{Deserialize, Serialize};

mod scene;

pub use scene::{SceneObject, SceneRecorder, SceneStats};

// =============================================================================
// Math
// =============================================================================

/// A plain three-component vector used for sizes, pivots and transforms.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Vec3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Vec3 {
    /// All zeros.
    pub const ZERO: Vec3 = Vec3::new(0.0, 0.0, 0.0);

    /// All ones.
    pub const ONE: Vec3 = Vec3::new(1.0, 1.0, 1.0);

    /// Create a vector from its components.
    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    /// Same value in every component.
    pub const fn splat(v: f32) -> Self {
        Self::new(v, v, v)
    }

    /// Components as an array.
    pub fn to_array(self) -> [f32; 3] {
        [self.x, self.y, self.z]
    }
}

impl From<[f32; 3]> for Vec3 {
    fn from([x, y, z]: [f32; 3]) -> Self {
        Self::new(x, y, z)
    }
}

impl From<Vec3> for [f32; 3] {
    fn from(v: Vec3) -> Self {
        v.to_array()
    }
}

impl Add for Vec3 {
    type Output = Vec3;

    fn add(self, rhs: Vec3) -> Vec3 {
        Vec3::new(self.x + rhs.x, self.y + rhs.y, self.z + rhs.z)
    }
}

impl Mul<f32> for Vec3 {
    type Output = Vec3;

    fn mul(self, rhs: f32) -> Vec3 {
        Vec3::new(self.x * rhs, self.y * rhs, self.z * rhs)
    }
}

impl Neg for Vec3 {
    type Output = Vec3;

    fn neg(self) -> Vec3 {
        Vec3::new(-self.x, -self.y, -self.z)
    }
}

impl fmt::Display for Vec3 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}, {})", self.x, self.y, self.z)
    }
}

// =============================================================================
// Backend Interface
// =============================================================================

/// Opaque reference to a renderable object owned by a [`SceneBackend`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct VisualHandle(pub u64);

impl fmt::Display for VisualHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// The scene a shape tree draws into.
///
/// Implementations own the actual renderables. The engine only ever holds
/// [`VisualHandle`]s and never frees anything: `mark_for_destruction` asks the
/// backend to tear the object down on its own schedule.
pub trait SceneBackend {
    /// Create a primitive solid of `size`, anchored at `pivot` (in half-extent
    /// units, so `[0, -1, 0]` puts the origin at the bottom face).
    fn create_visual(&mut self, size: Vec3, pivot: Vec3) -> VisualHandle;

    /// Make `parent` the visual parent of `child`.
    fn set_visual_parent(&mut self, child: VisualHandle, parent: VisualHandle);

    /// Rotate in local space by euler angles, in degrees.
    fn rotate_local(&mut self, handle: VisualHandle, euler_degrees: Vec3);

    /// Translate in local space.
    fn translate_local(&mut self, handle: VisualHandle, displacement: Vec3);

    /// Replace the local scale.
    fn set_local_scale(&mut self, handle: VisualHandle, scale: Vec3);

    /// Flag an object for deferred teardown.
    fn mark_for_destruction(&mut self, handle: VisualHandle);

    /// Register (or clear) the visual that roots the generated object.
    fn set_root_visual(&mut self, handle: Option<VisualHandle>);
}

impl<B: SceneBackend + ?Sized> SceneBackend for &mut B {
    fn create_visual(&mut self, size: Vec3, pivot: Vec3) -> VisualHandle {
        (**self).create_visual(size, pivot)
    }

    fn set_visual_parent(&mut self, child: VisualHandle, parent: VisualHandle) {
        (**self).set_visual_parent(child, parent)
    }

    fn rotate_local(&mut self, handle: VisualHandle, euler_degrees: Vec3) {
        (**self).rotate_local(handle, euler_degrees)
    }

    fn translate_local(&mut self, handle: VisualHandle, displacement: Vec3) {
        (**self).translate_local(handle, displacement)
    }

    fn set_local_scale(&mut self, handle: VisualHandle, scale: Vec3) {
        (**self).set_local_scale(handle, scale)
    }

    fn mark_for_destruction(&mut self, handle: VisualHandle) {
        (**self).mark_for_destruction(handle)
    }

    fn set_root_visual(&mut self, handle: Option<VisualHandle>) {
        (**self).set_root_visual(handle)
    }
}
