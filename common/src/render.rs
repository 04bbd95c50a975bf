use std::f32::consts::PI;

use glam::{Mat4, Quat, Vec3};

use crate::{config::ShipConfig, input::ShipInput, ship::Ship, time::Clock};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RenderHandle(pub u32);

/// Presentation state for one frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RenderPose {
    pub translation: Vec3,
    pub yaw: f32,
    pub scale: f32,
}

impl RenderPose {
    /// The hull faces sideways and banks a quarter turn towards the strafe
    /// direction.
    pub fn new(translation: Vec3, input: ShipInput, scale: f32) -> Self {
        let left = if input.left { 1.0 } else { 0.0 };
        let right = if input.right { 1.0 } else { 0.0 };

        Self {
            translation,
            yaw: PI * (0.5 + 0.25 * left - 0.25 * right),
            scale,
        }
    }

    pub fn matrix(&self) -> Mat4 {
        Mat4::from_scale_rotation_translation(
            Vec3::splat(self.scale),
            Quat::from_rotation_y(self.yaw),
            self.translation,
        )
    }
}

pub trait Renderer {
    fn add_object(&mut self, asset: &str, pose: &RenderPose) -> RenderHandle;
    fn set_transform(&mut self, handle: RenderHandle, pose: &RenderPose);
    fn set_visible(&mut self, handle: RenderHandle, visible: bool);
    fn remove_object(&mut self, handle: RenderHandle);
}

/// A ship paired with the render object that presents it.
pub struct RenderedShip<C: Clock> {
    pub ship: Ship<C>,
    handle: RenderHandle,
}

impl<C: Clock> RenderedShip<C> {
    /// The render object starts hidden until the first `update` says otherwise.
    pub fn create(
        start: Vec3,
        asset: &str,
        config: ShipConfig,
        clock: C,
        renderer: &mut dyn Renderer,
    ) -> Self {
        let ship = Ship::new(start, config, clock);
        let pose = ship.pose();
        let handle = renderer.add_object(asset, &pose);
        renderer.set_visible(handle, false);

        Self { ship, handle }
    }

    pub fn handle(&self) -> RenderHandle {
        self.handle
    }

    /// Advances one frame and submits the result. Returns where a shot
    /// should spawn, if one was fired.
    pub fn update(&mut self, dt: f64, visible: bool, renderer: &mut dyn Renderer) -> Option<Vec3> {
        let frame = self.ship.tick(dt, visible);
        renderer.set_visible(self.handle, frame.visible);
        renderer.set_transform(self.handle, &frame.pose);
        frame.fire_position
    }

    pub fn destroy(self, renderer: &mut dyn Renderer) {
        renderer.remove_object(self.handle);
    }
}
