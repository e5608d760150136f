//! In-memory scene backend.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::{SceneBackend, Vec3, VisualHandle};

/// A primitive solid as recorded by [`SceneRecorder`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SceneObject {
    /// Handle returned to the caller.
    pub handle: VisualHandle,
    /// Full extents of the solid.
    pub size: Vec3,
    /// Anchor point, in half-extent units.
    pub pivot: Vec3,
    /// Accumulated local translation.
    pub translation: Vec3,
    /// Accumulated local euler rotation, in degrees.
    pub rotation: Vec3,
    /// Local scale (last write wins).
    pub scale: Vec3,
    /// Visual parent, if any.
    pub parent: Option<VisualHandle>,
    /// Set by `mark_for_destruction`; cleared only by removal.
    pub should_die: bool,
}

impl SceneObject {
    fn new(handle: VisualHandle, size: Vec3, pivot: Vec3) -> Self {
        Self {
            handle,
            size,
            pivot,
            translation: Vec3::ZERO,
            rotation: Vec3::ZERO,
            scale: Vec3::ONE,
            parent: None,
            should_die: false,
        }
    }
}

/// Counts describing the recorder's current contents.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SceneStats {
    /// Objects still alive (not flagged).
    pub live: usize,
    /// Objects flagged but not yet collected.
    pub pending_destruction: usize,
    /// Objects ever created.
    pub created: u64,
}

/// A [`SceneBackend`] that stores every object and transform in memory.
///
/// Destruction is deferred exactly like a game engine's "should die" flag:
/// flagged objects stay queryable until [`SceneRecorder::collect_garbage`].
#[derive(Debug, Clone, Default)]
pub struct SceneRecorder {
    objects: BTreeMap<VisualHandle, SceneObject>,
    root: Option<VisualHandle>,
    next_handle: u64,
}

impl SceneRecorder {
    /// Create an empty scene.
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up an object by handle.
    pub fn get(&self, handle: VisualHandle) -> Option<&SceneObject> {
        self.objects.get(&handle)
    }

    /// Iterate over all recorded objects (flagged ones included), by handle.
    pub fn objects(&self) -> impl Iterator<Item = &SceneObject> {
        self.objects.values()
    }

    /// Iterate over objects not flagged for destruction.
    pub fn live_objects(&self) -> impl Iterator<Item = &SceneObject> {
        self.objects.values().filter(|o| !o.should_die)
    }

    /// Direct visual children of `handle`, in creation order.
    pub fn children_of(&self, handle: VisualHandle) -> Vec<VisualHandle> {
        self.objects
            .values()
            .filter(|o| o.parent == Some(handle))
            .map(|o| o.handle)
            .collect()
    }

    /// The registered root visual.
    pub fn root(&self) -> Option<VisualHandle> {
        self.root
    }

    /// Current counts.
    pub fn stats(&self) -> SceneStats {
        let pending = self.objects.values().filter(|o| o.should_die).count();
        SceneStats {
            live: self.objects.len() - pending,
            pending_destruction: pending,
            created: self.next_handle,
        }
    }

    /// Remove every flagged object, returning how many were dropped.
    ///
    /// Surviving objects whose parent was removed lose their parent link.
    pub fn collect_garbage(&mut self) -> usize {
        let before = self.objects.len();
        self.objects.retain(|_, o| !o.should_die);
        let removed = before - self.objects.len();

        let alive: Vec<VisualHandle> = self.objects.keys().copied().collect();
        for object in self.objects.values_mut() {
            if let Some(parent) = object.parent {
                if alive.binary_search(&parent).is_err() {
                    object.parent = None;
                }
            }
        }
        if let Some(root) = self.root {
            if !self.objects.contains_key(&root) {
                self.root = None;
            }
        }
        removed
    }
}

impl SceneBackend for SceneRecorder {
    fn create_visual(&mut self, size: Vec3, pivot: Vec3) -> VisualHandle {
        let handle = VisualHandle(self.next_handle);
        self.next_handle += 1;
        self.objects
            .insert(handle, SceneObject::new(handle, size, pivot));
        handle
    }

    fn set_visual_parent(&mut self, child: VisualHandle, parent: VisualHandle) {
        if let Some(object) = self.objects.get_mut(&child) {
            object.parent = Some(parent);
        }
    }

    fn rotate_local(&mut self, handle: VisualHandle, euler_degrees: Vec3) {
        if let Some(object) = self.objects.get_mut(&handle) {
            object.rotation = object.rotation + euler_degrees;
        }
    }

    fn translate_local(&mut self, handle: VisualHandle, displacement: Vec3) {
        if let Some(object) = self.objects.get_mut(&handle) {
            object.translation = object.translation + displacement;
        }
    }

    fn set_local_scale(&mut self, handle: VisualHandle, scale: Vec3) {
        if let Some(object) = self.objects.get_mut(&handle) {
            object.scale = scale;
        }
    }

    fn mark_for_destruction(&mut self, handle: VisualHandle) {
        if let Some(object) = self.objects.get_mut(&handle) {
            object.should_die = true;
        }
    }

    fn set_root_visual(&mut self, handle: Option<VisualHandle>) {
        self.root = handle;
    }
}
