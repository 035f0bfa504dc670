//! The game loop: room loading and transition, the per-frame phase order,
//! and the depth-sorted draw walk.

use std::collections::BTreeSet;
use std::path::PathBuf;
use std::rc::Rc;
use std::time::Duration;

use tracing::{debug, error};

use crate::assets::GameData;
use crate::error::Result;
use crate::events;
use crate::input::{keys, InputRecording};
use crate::instance::{
    PATH_ACTION_CONTINUE, PATH_ACTION_RESTART, PATH_ACTION_REVERSE, PATH_ACTION_STOP,
};
use crate::render::{Blend, Renderer};
use crate::runtime::{RoomTarget, Runtime};

/// Startup configuration assembled by the shell layer.
pub struct GameOptions {
    pub seed: u32,
    /// Override for the start room (ROOM table index).
    pub start_room: Option<u32>,
    /// Frame-pacing multiplier (`--speed`).
    pub speed_multiplier: f64,
    /// Headless: no pacing, no present.
    pub headless: bool,
    /// Debug keybindings enabled.
    pub debug: bool,
    /// Screenshot path pattern with `%s` for the frame number.
    pub screenshot_pattern: Option<String>,
    /// Frames to capture; in headless mode the loop stops after the last.
    pub screenshot_frames: BTreeSet<u64>,
    pub record_path: Option<PathBuf>,
    pub playback: Option<InputRecording>,
}

impl Default for GameOptions {
    fn default() -> Self {
        Self {
            seed: 0,
            start_room: None,
            speed_multiplier: 1.0,
            headless: false,
            debug: false,
            screenshot_pattern: None,
            screenshot_frames: BTreeSet::new(),
            record_path: None,
            playback: None,
        }
    }
}

/// The running game: runtime state plus loop bookkeeping.
pub struct Game {
    pub rt: Runtime,
    options: GameOptions,
    recording: InputRecording,
    paused: bool,
    started: bool,
}

impl Game {
    pub fn new(data: Rc<GameData>, renderer: Box<dyn Renderer>, options: GameOptions) -> Self {
        let rt = Runtime::new(data, renderer, options.seed);
        Self {
            rt,
            options,
            recording: InputRecording::default(),
            paused: false,
            started: false,
        }
    }

    /// Load the start room and fire the startup events.
    pub fn start(&mut self) -> Result<()> {
        let start_room = self
            .options
            .start_room
            .or_else(|| self.rt.data.room_order.first().copied())
            .unwrap_or(0);
        self.load_room(start_room, true)?;
        self.started = true;
        Ok(())
    }

    /// Run frames until the game ends (or, in headless capture mode, the
    /// last requested screenshot is written).
    pub fn run(&mut self) -> Result<()> {
        if !self.started {
            self.start()?;
        }
        let last_capture = self.options.screenshot_frames.iter().next_back().copied();

        loop {
            if self.paused {
                // The frame loop is stalled, so latch transitions here to
                // keep the debug keys edge-triggered.
                self.rt.input.latch();
                self.handle_debug_keys();
            } else {
                if self.options.debug {
                    self.handle_debug_keys();
                }
                self.step_frame()?;
            }

            if self.rt.game_end_requested {
                break;
            }
            if let Some(last) = last_capture {
                if self.options.headless && self.rt.frame > last {
                    break;
                }
            }
            if !self.options.headless {
                let fps = self.rt.room.speed.max(1) as f64 * self.options.speed_multiplier;
                std::thread::sleep(Duration::from_secs_f64(1.0 / fps.max(1.0)));
            }
        }

        if let Some(path) = self.options.record_path.take() {
            self.recording.save(&path)?;
        }
        Ok(())
    }

    /// One full frame, in the authoritative phase order.
    pub fn step_frame(&mut self) -> Result<()> {
        let frame = self.rt.frame;

        // 1. Input snapshot.
        if let Some(playback) = &self.options.playback {
            let keys = playback.keys_for(frame).to_vec();
            self.rt.input.feed_frame(&keys);
        }
        self.rt.input.latch();
        if self.options.record_path.is_some() {
            self.recording.record(frame, self.rt.input.held_keys());
        }

        // 2. Begin Step.
        for id in self.rt.instances.ids() {
            self.rt
                .dispatch_event(id, id, events::STEP, events::STEP_BEGIN)?;
        }

        // 3. Alarms: decrement active counters; 1 -> 0 fires, with the
        // counter reset to -1 before the handler runs.
        for id in self.rt.instances.ids() {
            for k in 0..12u32 {
                let fired = {
                    let Some(inst) = self.rt.instances.get_mut(id) else {
                        break;
                    };
                    if inst.destroyed {
                        break;
                    }
                    let slot = &mut inst.alarms[k as usize];
                    if *slot > 0 {
                        *slot -= 1;
                        if *slot == 0 {
                            *slot = -1;
                            true
                        } else {
                            false
                        }
                    } else {
                        false
                    }
                };
                if fired {
                    self.rt.dispatch_event(id, id, events::ALARM, k)?;
                }
            }
        }

        // 4. Keyboard events.
        self.keyboard_phase()?;

        // 5. Step, then motion integration and path advance.
        for id in self.rt.instances.ids() {
            self.rt
                .dispatch_event(id, id, events::STEP, events::STEP_NORMAL)?;
        }
        self.motion_phase()?;

        // 6. Collisions.
        self.collision_phase()?;

        // 7. End Step.
        for id in self.rt.instances.ids() {
            self.rt
                .dispatch_event(id, id, events::STEP, events::STEP_END)?;
        }

        // 8. Flush boundary: deferred creations, then destructions, then a
        // latched room change.
        self.flush_boundary()?;
        if let Some(target) = self.rt.pending_room.take() {
            let index = match target {
                RoomTarget::Index(i) => i,
                RoomTarget::Restart => self.rt.room.index.max(0) as u32,
            };
            self.load_room(index, false)?;
        }

        // 9. Advance animation.
        self.animation_phase()?;

        // 10. Draw walk.
        self.draw_walk()?;
        if let Some(pattern) = self.options.screenshot_pattern.clone() {
            if self.options.screenshot_frames.contains(&(frame + 1)) {
                self.save_screenshot(&pattern, frame + 1);
            }
        }

        self.rt.frame += 1;
        Ok(())
    }

    fn keyboard_phase(&mut self) -> Result<()> {
        let pressed = self.rt.input.pressed_keys();
        let held = self.rt.input.held_keys();
        let released = self.rt.input.released_keys();
        let any_held = !held.is_empty();

        for id in self.rt.instances.ids() {
            for &key in &pressed {
                self.rt.dispatch_event(id, id, events::KEY_PRESS, key)?;
            }
            for &key in &held {
                self.rt.dispatch_event(id, id, events::KEYBOARD, key)?;
            }
            if any_held {
                self.rt
                    .dispatch_event(id, id, events::KEYBOARD, keys::VK_ANYKEY)?;
            } else {
                self.rt
                    .dispatch_event(id, id, events::KEYBOARD, keys::VK_NOKEY)?;
            }
            for &key in &released {
                self.rt.dispatch_event(id, id, events::KEY_RELEASE, key)?;
            }
        }
        Ok(())
    }

    fn motion_phase(&mut self) -> Result<()> {
        let data = self.rt.data.clone();
        let room_speed = self.rt.room.speed.max(1) as f64;
        let mut path_end: Vec<u32> = Vec::new();

        for id in self.rt.instances.ids() {
            let Some(inst) = self.rt.instances.get_mut(id) else {
                continue;
            };
            inst.xprevious = inst.x;
            inst.yprevious = inst.y;
            inst.integrate_motion();

            // Paths advance by path_speed / room_speed.
            if inst.path.index >= 0 {
                let Some(path) = data.paths.get(inst.path.index as usize) else {
                    inst.path = Default::default();
                    continue;
                };
                inst.path.position += inst.path.speed / room_speed;
                let mut ended = false;
                if inst.path.position >= 1.0 {
                    ended = true;
                    match inst.path.end_action {
                        PATH_ACTION_RESTART | PATH_ACTION_CONTINUE => {
                            inst.path.position -= 1.0;
                        }
                        PATH_ACTION_REVERSE => {
                            inst.path.position = 1.0;
                            inst.path.speed = -inst.path.speed;
                        }
                        _ => {
                            inst.path.position = 1.0;
                        }
                    }
                } else if inst.path.position < 0.0 {
                    ended = true;
                    if inst.path.end_action == PATH_ACTION_REVERSE {
                        inst.path.position = 0.0;
                        inst.path.speed = -inst.path.speed;
                    } else {
                        inst.path.position = 0.0;
                    }
                }
                let (px, py) = path.point_at(inst.path.position);
                inst.x = px + inst.path.offset_x;
                inst.y = py + inst.path.offset_y;
                if ended {
                    if inst.path.end_action == PATH_ACTION_STOP {
                        inst.path.index = -1;
                    }
                    path_end.push(id);
                }
            }
        }

        for id in path_end {
            self.rt
                .dispatch_event(id, id, events::OTHER, events::OTHER_PATH_END)?;
        }
        Ok(())
    }

    fn collision_phase(&mut self) -> Result<()> {
        let data = self.rt.data.clone();
        let ids = self.rt.instances.ids();
        for (i, &a) in ids.iter().enumerate() {
            for &b in &ids[i + 1..] {
                if !self.rt.bbox_overlap(a, b) {
                    continue;
                }
                let a_obj = self.rt.object_of(a);
                let b_obj = self.rt.object_of(b);
                if let Some(subtype) = find_collision_subtype(&data, a_obj, b_obj) {
                    self.rt.dispatch_event(a, b, events::COLLISION, subtype)?;
                }
                if let Some(subtype) = find_collision_subtype(&data, b_obj, a_obj) {
                    self.rt.dispatch_event(b, a, events::COLLISION, subtype)?;
                }
            }
        }
        Ok(())
    }

    /// Process deferred creations (Create events in id order), then deferred
    /// destructions (Destroy, then removal). Loops until both queues drain,
    /// since handlers may enqueue more.
    fn flush_boundary(&mut self) -> Result<()> {
        while !self.rt.pending_create.is_empty() || !self.rt.pending_destroy.is_empty() {
            let mut created = std::mem::take(&mut self.rt.pending_create);
            created.sort_unstable();
            for id in created {
                let alive = self
                    .rt
                    .instances
                    .get(id)
                    .map(|i| !i.destroyed)
                    .unwrap_or(false);
                if alive {
                    self.rt.dispatch_event(id, id, events::CREATE, 0)?;
                }
            }

            let mut destroyed = std::mem::take(&mut self.rt.pending_destroy);
            destroyed.sort_unstable();
            for id in destroyed {
                if self.rt.instances.contains(id) {
                    self.rt.dispatch_event(id, id, events::DESTROY, 0)?;
                    self.rt.instances.remove(id);
                }
            }
        }
        Ok(())
    }

    fn animation_phase(&mut self) -> Result<()> {
        let data = self.rt.data.clone();
        let mut anim_end: Vec<u32> = Vec::new();
        for id in self.rt.instances.ids() {
            let Some(inst) = self.rt.instances.get_mut(id) else {
                continue;
            };
            let Some(sprite) = usize::try_from(inst.sprite_index)
                .ok()
                .and_then(|i| data.sprites.get(i))
            else {
                continue;
            };
            let count = sprite.frames.len() as f64;
            if count == 0.0 {
                continue;
            }
            inst.image_index += inst.image_speed;
            if inst.image_index >= count {
                inst.image_index -= count;
                anim_end.push(id);
            } else if inst.image_index < 0.0 {
                inst.image_index += count;
            }
        }
        for id in anim_end {
            self.rt
                .dispatch_event(id, id, events::OTHER, events::OTHER_ANIMATION_END)?;
        }
        Ok(())
    }

    /// Room transition. `initial` marks program start (fires Game Start).
    pub fn load_room(&mut self, index: u32, initial: bool) -> Result<()> {
        let data = self.rt.data.clone();
        let room = data
            .rooms
            .get(index as usize)
            .ok_or(crate::error::RuntimeError::AssetRef {
                context: "room index",
                index: index as i64,
            })?;
        debug!(room = %room.name, index, "room transition");

        // Room End fires on each non-persistent instance, which is then
        // removed without a Destroy event. Persistent instances carry over.
        if !initial {
            for id in self.rt.instances.ids() {
                let persistent = self
                    .rt
                    .instances
                    .get(id)
                    .map(|i| i.persistent)
                    .unwrap_or(false);
                if !persistent {
                    self.rt
                        .dispatch_event(id, id, events::OTHER, events::OTHER_ROOM_END)?;
                }
            }
            let ids = self.rt.instances.all_ids();
            for id in ids {
                let keep = self
                    .rt
                    .instances
                    .get(id)
                    .map(|i| i.persistent && !i.destroyed)
                    .unwrap_or(false);
                if !keep {
                    self.rt.instances.remove(id);
                }
            }
        }
        self.rt.pending_create.clear();
        self.rt.pending_destroy.clear();

        self.rt.room = crate::runtime::RoomState {
            index: index as i32,
            order_pos: data.room_order.iter().position(|&r| r == index),
            width: room.width,
            height: room.height,
            speed: room.speed.max(1),
            caption: room.caption.clone(),
            background_color: room.background_color,
            draw_background_color: room.draw_background_color,
            views_enabled: room.views_enabled,
            views: room.views.clone(),
            backgrounds: room.backgrounds.clone(),
            tiles: room.tiles.clone(),
        };

        // Static instances get fresh runtime ids, in instance-list order.
        let mut created: Vec<(u32, i32)> = Vec::new();
        for placed in &room.instances {
            if placed.object_index < 0 || placed.object_index as usize >= data.objects.len() {
                error!(object = placed.object_index, "room references missing object");
                continue;
            }
            let id = self.rt.instances.alloc(
                placed.object_index,
                placed.x as f64,
                placed.y as f64,
                &data,
            );
            if let Some(inst) = self.rt.instances.get_mut(id) {
                inst.image_xscale = placed.scale_x as f64;
                inst.image_yscale = placed.scale_y as f64;
                inst.image_angle = placed.rotation as f64;
                inst.image_blend = placed.color & 0xFF_FFFF;
            }
            created.push((id, placed.creation_code));
        }

        // Per-instance creation code, then Create, in instance-list order.
        for &(id, creation_code) in &created {
            if creation_code >= 0 {
                crate::vm::execute_code(&mut self.rt, creation_code as u32, id as i32, id as i32, &[])?;
            }
            self.rt.dispatch_event(id, id, events::CREATE, 0)?;
        }

        if initial {
            for id in self.rt.instances.ids() {
                self.rt
                    .dispatch_event(id, id, events::OTHER, events::OTHER_GAME_START)?;
            }
        }

        // Room creation code runs without a self instance.
        if room.creation_code >= 0 {
            crate::vm::execute_code(&mut self.rt, room.creation_code as u32, -1, -1, &[])?;
        }

        for id in self.rt.instances.ids() {
            self.rt
                .dispatch_event(id, id, events::OTHER, events::OTHER_ROOM_START)?;
        }

        // Creations/destructions during the startup events flush now.
        self.flush_boundary()?;
        Ok(())
    }

    /// The deterministic draw walk (§ renderer contract).
    pub fn draw_walk(&mut self) -> Result<()> {
        let data = self.rt.data.clone();

        if self.rt.room.draw_background_color {
            self.rt
                .renderer
                .clear(Blend::from_gml(self.rt.room.background_color, 1.0));
        } else {
            self.rt.renderer.clear(Blend::from_gml(0, 1.0));
        }

        let views: Vec<crate::assets::RoomView> = if self.rt.room.views_enabled {
            self.rt.room.views.iter().filter(|v| v.enabled).cloned().collect()
        } else {
            vec![full_room_view(&self.rt)]
        };

        for view in &views {
            self.rt.renderer.set_view(
                view.view_x as f32,
                view.view_y as f32,
                view.view_width as f32,
                view.view_height as f32,
                view.port_x,
                view.port_y,
                view.port_width,
                view.port_height,
            );

            // Non-foreground background layers.
            for bg in self.rt.room.backgrounds.clone() {
                if bg.enabled && !bg.foreground && bg.background_index >= 0 {
                    crate::drawing::draw_background(
                        &mut self.rt,
                        bg.background_index,
                        bg.x as f64,
                        bg.y as f64,
                        bg.tile_x,
                        bg.tile_y,
                    );
                }
            }

            // Static tiles by depth, descending; stable within a depth.
            let mut tiles = self.rt.room.tiles.clone();
            tiles.sort_by_key(|t| std::cmp::Reverse(t.depth));
            for tile in &tiles {
                let Some(bg) = usize::try_from(tile.background_index)
                    .ok()
                    .and_then(|i| data.backgrounds.get(i))
                else {
                    continue;
                };
                let Some(region) = data.regions.get(bg.region as usize) else {
                    continue;
                };
                crate::drawing::ensure_page(&mut self.rt, region.texture_page as u32);
                self.rt.renderer.draw_quad(&crate::render::Quad {
                    page: region.texture_page as u32,
                    src_x: (region.source_x as u32 + tile.source_x) as f32,
                    src_y: (region.source_y as u32 + tile.source_y) as f32,
                    src_w: tile.width as f32,
                    src_h: tile.height as f32,
                    x: tile.x as f32,
                    y: tile.y as f32,
                    xscale: tile.scale_x,
                    yscale: tile.scale_y,
                    angle: 0.0,
                    pivot_x: tile.x as f32,
                    pivot_y: tile.y as f32,
                    blend: Blend::WHITE,
                });
            }

            // Visible instances by depth descending, stable by id.
            let mut drawable: Vec<(f64, u32)> = self
                .rt
                .instances
                .iter()
                .filter(|i| !i.destroyed && i.visible)
                .map(|i| (i.depth, i.id))
                .collect();
            drawable.sort_by(|a, b| {
                b.0.partial_cmp(&a.0)
                    .unwrap_or(std::cmp::Ordering::Equal)
                    .then(a.1.cmp(&b.1))
            });

            for (_, id) in drawable {
                let object_index = self.rt.object_of(id);
                if data
                    .resolve_event(object_index, events::DRAW, events::DRAW_NORMAL)
                    .is_some()
                {
                    self.rt
                        .dispatch_event(id, id, events::DRAW, events::DRAW_NORMAL)?;
                } else {
                    self.default_draw(id);
                }
            }

            // Foreground background layers.
            for bg in self.rt.room.backgrounds.clone() {
                if bg.enabled && bg.foreground && bg.background_index >= 0 {
                    crate::drawing::draw_background(
                        &mut self.rt,
                        bg.background_index,
                        bg.x as f64,
                        bg.y as f64,
                        bg.tile_x,
                        bg.tile_y,
                    );
                }
            }
        }

        // Draw GUI pass, projected to the window.
        let (ww, wh) = (data.window_width as i32, data.window_height as i32);
        self.rt
            .renderer
            .set_view(0.0, 0.0, ww as f32, wh as f32, 0, 0, ww, wh);
        for id in self.rt.instances.ids() {
            let object_index = self.rt.object_of(id);
            let visible = self
                .rt
                .instances
                .get(id)
                .map(|i| i.visible)
                .unwrap_or(false);
            if visible
                && data
                    .resolve_event(object_index, events::DRAW, events::DRAW_GUI)
                    .is_some()
            {
                self.rt
                    .dispatch_event(id, id, events::DRAW, events::DRAW_GUI)?;
            }
        }

        if !self.options.headless {
            self.rt.renderer.present();
        }
        Ok(())
    }

    /// Default draw for instances without a Draw handler.
    fn default_draw(&mut self, id: u32) {
        let Some(inst) = self.rt.instances.get(id) else {
            return;
        };
        if inst.sprite_index < 0 {
            return;
        }
        let (sprite, frame, x, y, xs, ys, ang, col, alpha) = (
            inst.sprite_index,
            inst.image_index.floor() as i64,
            inst.x,
            inst.y,
            inst.image_xscale,
            inst.image_yscale,
            inst.image_angle,
            inst.image_blend,
            inst.image_alpha,
        );
        crate::drawing::draw_sprite(&mut self.rt, sprite, frame, x, y, xs, ys, ang, col, alpha);
    }

    fn handle_debug_keys(&mut self) {
        let input = &self.rt.input;
        if input.is_pressed(keys::VK_PAGEUP) {
            if let Some(prev) = self.rt.next_room_in_order(-1) {
                self.rt.pending_room = Some(RoomTarget::Index(prev));
            }
        } else if input.is_pressed(keys::VK_PAGEDOWN) {
            if let Some(next) = self.rt.next_room_in_order(1) {
                self.rt.pending_room = Some(RoomTarget::Index(next));
            }
        } else if input.is_pressed(b'P' as u32) {
            self.paused = !self.paused;
        } else if self.paused && input.is_pressed(b'O' as u32) {
            // Single-step one frame while paused.
            if let Err(e) = self.step_frame() {
                error!(error = %e, "single-step failed");
            }
        }
    }

    fn save_screenshot(&mut self, pattern: &str, frame: u64) {
        let captured = self
            .rt
            .renderer
            .framebuffer()
            .map(|(pixels, w, h)| (pixels.to_vec(), w, h));
        let Some((pixels, width, height)) = captured else {
            self.rt
                .warn_once("screenshot", "renderer has no framebuffer".into());
            return;
        };
        let path = pattern.replace("%s", &frame.to_string());
        // Screenshot IO failures never stop the loop.
        if let Err(e) = write_png(&path, &pixels, width, height) {
            let msg = e.to_string();
            self.rt.warn_once("screenshot", msg);
        }
    }
}

fn full_room_view(rt: &Runtime) -> crate::assets::RoomView {
    let (w, h) = (rt.data.window_width as i32, rt.data.window_height as i32);
    crate::assets::RoomView {
        enabled: true,
        view_x: 0,
        view_y: 0,
        view_width: rt.room.width as i32,
        view_height: rt.room.height as i32,
        port_x: 0,
        port_y: 0,
        port_width: w,
        port_height: h,
        border_x: 0,
        border_y: 0,
        speed_x: -1,
        speed_y: -1,
        follow_object: -1,
    }
}

/// Find the collision subtype on `a_obj`'s chain matching `b_obj` (the
/// subtype names `b_obj` or one of its ancestors).
fn find_collision_subtype(data: &GameData, a_obj: i32, b_obj: i32) -> Option<u32> {
    let mut cur = a_obj;
    let mut hops = 0;
    while cur >= 0 && hops <= data.objects.len() {
        let obj = data.objects.get(cur as usize)?;
        // Lowest matching subtype wins, keeping pair processing
        // deterministic when several handlers apply.
        let found = obj
            .events
            .keys()
            .filter(|&&(kind, subtype)| {
                kind == events::COLLISION && data.object_is_ancestor(b_obj, subtype as i32)
            })
            .map(|&(_, subtype)| subtype)
            .min();
        if found.is_some() {
            return found;
        }
        cur = obj.parent_index;
        hops += 1;
    }
    None
}

fn write_png(path: &str, pixels: &[u8], width: u32, height: u32) -> std::io::Result<()> {
    let file = std::fs::File::create(path)?;
    let mut encoder = png::Encoder::new(std::io::BufWriter::new(file), width, height);
    encoder.set_color(png::ColorType::Rgba);
    encoder.set_depth(png::BitDepth::Eight);
    let mut writer = encoder
        .write_header()
        .map_err(|e| std::io::Error::other(e.to_string()))?;
    writer
        .write_image_data(pixels)
        .map_err(|e| std::io::Error::other(e.to_string()))?;
    Ok(())
}
