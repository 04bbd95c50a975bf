use std::collections::{HashMap, VecDeque};

use common::{
    net::AppChannel,
    protocol::{self, ServerMessage},
    render::{RenderHandle, RenderPose, Renderer},
};

use crate::{net::NetworkHandle, render::LOCAL_ASSET};

pub struct MockNetwork {
    pub connected: bool,
    pub rtt: f64,
    pub sent: Vec<(AppChannel, Vec<u8>)>,
    incoming: HashMap<AppChannel, VecDeque<Vec<u8>>>,
}

impl MockNetwork {
    pub fn new() -> Self {
        Self {
            connected: true,
            rtt: 0.0,
            sent: Vec::new(),
            incoming: HashMap::new(),
        }
    }

    pub fn queue_raw(&mut self, channel: AppChannel, bytes: Vec<u8>) {
        self.incoming.entry(channel).or_default().push_back(bytes);
    }

    pub fn queue_message(&mut self, channel: AppChannel, message: &ServerMessage) {
        let bytes = protocol::encode(message).expect("failed to encode test message");
        self.queue_raw(channel, bytes);
    }
}

impl NetworkHandle for MockNetwork {
    fn is_connected(&self) -> bool {
        self.connected
    }

    fn is_disconnected(&self) -> bool {
        !self.connected
    }

    fn get_disconnect_reason(&self) -> String {
        "mock disconnect".to_string()
    }

    fn rtt(&self) -> f64 {
        self.rtt
    }

    fn send_message(&mut self, channel: AppChannel, message: Vec<u8>) {
        self.sent.push((channel, message));
    }

    fn receive_message(&mut self, channel: AppChannel) -> Option<Vec<u8>> {
        self.incoming.get_mut(&channel)?.pop_front()
    }
}

#[derive(Default)]
pub struct MockRenderer {
    next_handle: u32,
    pub objects: HashMap<RenderHandle, (String, RenderPose, bool)>,
}

impl MockRenderer {
    pub fn local_objects(&self) -> usize {
        self.objects
            .values()
            .filter(|(asset, _, _)| asset == LOCAL_ASSET)
            .count()
    }

    pub fn visible_objects(&self) -> usize {
        self.objects.values().filter(|(_, _, visible)| *visible).count()
    }
}

impl Renderer for MockRenderer {
    fn add_object(&mut self, asset: &str, pose: &RenderPose) -> RenderHandle {
        let handle = RenderHandle(self.next_handle);
        self.next_handle += 1;
        self.objects.insert(handle, (asset.to_string(), *pose, true));
        handle
    }

    fn set_transform(&mut self, handle: RenderHandle, pose: &RenderPose) {
        if let Some(object) = self.objects.get_mut(&handle) {
            object.1 = *pose;
        }
    }

    fn set_visible(&mut self, handle: RenderHandle, visible: bool) {
        if let Some(object) = self.objects.get_mut(&handle) {
            object.2 = visible;
        }
    }

    fn remove_object(&mut self, handle: RenderHandle) {
        self.objects.remove(&handle);
    }
}
