use std::{collections::HashMap, io::Write};

use crossterm::{
    QueueableCommand,
    cursor::MoveTo,
    style::{Color, Print, ResetColor, SetForegroundColor},
    terminal::{Clear, ClearType},
};

use common::render::{RenderHandle, RenderPose, Renderer};

pub const LOCAL_ASSET: &str = "ship.local";
pub const REMOTE_ASSET: &str = "ship.remote";

const STRIP_WIDTH: usize = 80;
/// World units either side of the centre that fit on the strip.
const HALF_EXTENT: f32 = 600.0;

#[derive(Debug, Clone)]
struct Sprite {
    local: bool,
    pose: RenderPose,
    visible: bool,
}

/// Draws every visible ship on a single terminal row, by x coordinate.
#[derive(Debug, Default)]
pub struct TerminalRenderer {
    next_handle: u32,
    sprites: HashMap<RenderHandle, Sprite>,
    shots: Vec<f32>,
}

impl TerminalRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.sprites.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sprites.is_empty()
    }

    /// Marks a shot for the next strip only.
    pub fn flash_shot(&mut self, x: f32) {
        self.shots.push(x);
    }

    /// Builds the strip: `@` for the local ship, `A` for others, `*` for
    /// shots. The glyph banks to `<` or `>` while strafing.
    pub fn strip(&self) -> Vec<(char, Option<Color>)> {
        let mut cells = vec![('.', None); STRIP_WIDTH];

        for x in &self.shots {
            if let Some(column) = column_for(*x) {
                cells[column] = ('*', Some(Color::Red));
            }
        }

        let mut sprites: Vec<&Sprite> = self.sprites.values().filter(|s| s.visible).collect();
        // Local ship last so it stays on top.
        sprites.sort_by_key(|s| s.local);
        for sprite in sprites {
            let Some(column) = column_for(sprite.pose.translation.x) else {
                continue;
            };
            cells[column] = (glyph(sprite), Some(colour(sprite)));
        }

        cells
    }

    pub fn draw(&mut self, out: &mut impl Write, row: u16) -> std::io::Result<()> {
        out.queue(MoveTo(0, row))?;
        out.queue(Clear(ClearType::CurrentLine))?;
        for (glyph, colour) in self.strip() {
            match colour {
                Some(colour) => {
                    out.queue(SetForegroundColor(colour))?;
                    out.queue(Print(glyph))?;
                    out.queue(ResetColor)?;
                }
                None => {
                    out.queue(Print(glyph))?;
                }
            }
        }
        out.flush()?;
        self.shots.clear();
        Ok(())
    }
}

impl Renderer for TerminalRenderer {
    fn add_object(&mut self, asset: &str, pose: &RenderPose) -> RenderHandle {
        let handle = RenderHandle(self.next_handle);
        self.next_handle += 1;
        self.sprites.insert(
            handle,
            Sprite {
                local: asset == LOCAL_ASSET,
                pose: *pose,
                visible: true,
            },
        );
        handle
    }

    fn set_transform(&mut self, handle: RenderHandle, pose: &RenderPose) {
        if let Some(sprite) = self.sprites.get_mut(&handle) {
            sprite.pose = *pose;
        }
    }

    fn set_visible(&mut self, handle: RenderHandle, visible: bool) {
        if let Some(sprite) = self.sprites.get_mut(&handle) {
            sprite.visible = visible;
        }
    }

    fn remove_object(&mut self, handle: RenderHandle) {
        self.sprites.remove(&handle);
    }
}

fn column_for(x: f32) -> Option<usize> {
    if !(-HALF_EXTENT..=HALF_EXTENT).contains(&x) {
        return None;
    }
    let fraction = (x + HALF_EXTENT) / (2.0 * HALF_EXTENT);
    Some(((fraction * (STRIP_WIDTH - 1) as f32).round() as usize).min(STRIP_WIDTH - 1))
}

fn glyph(sprite: &Sprite) -> char {
    let bank = sprite.pose.yaw - std::f32::consts::FRAC_PI_2;
    if bank > 0.1 {
        '<'
    } else if bank < -0.1 {
        '>'
    } else if sprite.local {
        '@'
    } else {
        'A'
    }
}

fn colour(sprite: &Sprite) -> Color {
    if sprite.local {
        Color::Cyan
    } else {
        Color::Yellow
    }
}
