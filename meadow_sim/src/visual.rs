// Opaque visual handles.
//
// Growth states create, adjust and destroy visual instances (seed
// placeholders, leaf models) so a renderer can draw the meadow. The
// simulation never reads these records back to make a decision; they are
// pure output.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::types::{IdCounter, Position, VisualHandle};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum VisualKind {
    SeedModel,
    LeafModel,
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct VisualInstance {
    pub kind: VisualKind,
    pub position: Position,
    pub scale: f32,
    /// Tint from the shadow factor at creation time.
    pub shade: f32,
    /// 0 = fresh, 1 = fully decayed.
    pub decay: f32,
    /// Rotation about the vertical axis, radians.
    pub yaw: f32,
}

impl VisualInstance {
    pub fn new(kind: VisualKind, position: Position) -> Self {
        Self {
            kind,
            position,
            scale: 1.0,
            shade: 0.0,
            decay: 0.0,
            yaw: 0.0,
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct VisualRegistry {
    ids: IdCounter,
    live: BTreeMap<VisualHandle, VisualInstance>,
}

impl VisualRegistry {
    pub fn create(&mut self, instance: VisualInstance) -> VisualHandle {
        let handle = VisualHandle(self.ids.next_raw());
        self.live.insert(handle, instance);
        handle
    }

    /// Destroying an unknown or already destroyed handle is a no-op.
    pub fn destroy(&mut self, handle: VisualHandle) -> Option<VisualInstance> {
        self.live.remove(&handle)
    }

    pub fn get(&self, handle: VisualHandle) -> Option<&VisualInstance> {
        self.live.get(&handle)
    }

    pub fn get_mut(&mut self, handle: VisualHandle) -> Option<&mut VisualInstance> {
        self.live.get_mut(&handle)
    }

    pub fn len(&self) -> usize {
        self.live.len()
    }

    pub fn is_empty(&self) -> bool {
        self.live.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (VisualHandle, &VisualInstance)> {
        self.live.iter().map(|(h, v)| (*h, v))
    }
}
