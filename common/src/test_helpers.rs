use std::collections::HashMap;

use crate::render::{RenderHandle, RenderPose, Renderer};

/// Keeps the last submission for every render object.
#[derive(Default)]
pub struct RecordingRenderer {
    next_handle: u32,
    pub assets: HashMap<RenderHandle, String>,
    pub transforms: HashMap<RenderHandle, RenderPose>,
    pub visible: HashMap<RenderHandle, bool>,
    pub removed: Vec<RenderHandle>,
}

impl Renderer for RecordingRenderer {
    fn add_object(&mut self, asset: &str, pose: &RenderPose) -> RenderHandle {
        let handle = RenderHandle(self.next_handle);
        self.next_handle += 1;
        self.assets.insert(handle, asset.to_string());
        self.transforms.insert(handle, *pose);
        handle
    }

    fn set_transform(&mut self, handle: RenderHandle, pose: &RenderPose) {
        self.transforms.insert(handle, *pose);
    }

    fn set_visible(&mut self, handle: RenderHandle, visible: bool) {
        self.visible.insert(handle, visible);
    }

    fn remove_object(&mut self, handle: RenderHandle) {
        self.assets.remove(&handle);
        self.transforms.remove(&handle);
        self.visible.remove(&handle);
        self.removed.push(handle);
    }
}
