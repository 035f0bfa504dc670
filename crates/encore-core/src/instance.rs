use std::collections::{BTreeMap, HashMap};

use crate::assets::GameData;
use crate::value::Value;

/// Instance ids assigned at runtime start here; editor-placed instances get
/// fresh runtime ids too, so ids never repeat within one program run.
pub const FIRST_INSTANCE_ID: u32 = 100001;

/// Path end actions.
pub const PATH_ACTION_STOP: i32 = 0;
pub const PATH_ACTION_RESTART: i32 = 1;
pub const PATH_ACTION_CONTINUE: i32 = 2;
pub const PATH_ACTION_REVERSE: i32 = 3;

/// Path-follower state on an instance.
#[derive(Debug, Clone)]
pub struct PathFollower {
    /// PATH asset index, or -1 when not following.
    pub index: i32,
    /// Normalized position along the path, 0..=1.
    pub position: f64,
    /// Speed in path-position units per second.
    pub speed: f64,
    /// What happens at the end of the path.
    pub end_action: i32,
    /// Room-space offset added to path points (relative path starts).
    pub offset_x: f64,
    pub offset_y: f64,
}

impl Default for PathFollower {
    fn default() -> Self {
        Self {
            index: -1,
            position: 0.0,
            speed: 0.0,
            end_action: PATH_ACTION_STOP,
            offset_x: 0.0,
            offset_y: 0.0,
        }
    }
}

/// A live entity in a room, derived from an object definition.
#[derive(Debug, Clone)]
pub struct Instance {
    pub id: u32,
    pub object_index: i32,

    pub x: f64,
    pub y: f64,
    pub xprevious: f64,
    pub yprevious: f64,
    pub xstart: f64,
    pub ystart: f64,

    pub sprite_index: i32,
    pub image_index: f64,
    pub image_speed: f64,
    pub image_xscale: f64,
    pub image_yscale: f64,
    pub image_angle: f64,
    /// Blend color, BGR as GML color values.
    pub image_blend: u32,
    pub image_alpha: f64,
    pub mask_index: i32,

    pub depth: f64,
    pub visible: bool,
    pub solid: bool,
    pub persistent: bool,

    pub direction: f64,
    pub speed: f64,
    pub hspeed: f64,
    pub vspeed: f64,
    pub gravity: f64,
    pub gravity_direction: f64,
    pub friction: f64,

    /// 12 alarm down-counters; -1 = inactive.
    pub alarms: [i32; 12],

    pub path: PathFollower,

    /// Slot id → value for non-built-in instance variables.
    pub vars: HashMap<u32, Value>,

    /// Marked destroyed; stays addressable until the next flush boundary.
    pub destroyed: bool,
}

impl Instance {
    pub fn new(id: u32, object_index: i32, x: f64, y: f64, data: &GameData) -> Self {
        let obj = &data.objects[object_index as usize];
        Self {
            id,
            object_index,
            x,
            y,
            xprevious: x,
            yprevious: y,
            xstart: x,
            ystart: y,
            sprite_index: obj.sprite_index,
            image_index: 0.0,
            image_speed: 1.0,
            image_xscale: 1.0,
            image_yscale: 1.0,
            image_angle: 0.0,
            image_blend: 0xFF_FFFF,
            image_alpha: 1.0,
            mask_index: obj.mask_index,
            depth: obj.depth as f64,
            visible: obj.visible,
            solid: obj.solid,
            persistent: obj.persistent,
            direction: 0.0,
            speed: 0.0,
            hspeed: 0.0,
            vspeed: 0.0,
            gravity: 0.0,
            gravity_direction: 270.0,
            friction: 0.0,
            alarms: [-1; 12],
            path: PathFollower::default(),
            vars: HashMap::new(),
            destroyed: false,
        }
    }

    /// Recompute hspeed/vspeed from speed/direction.
    pub fn apply_polar(&mut self) {
        let rad = self.direction.to_radians();
        self.hspeed = self.speed * rad.cos();
        self.vspeed = -self.speed * rad.sin();
    }

    /// Recompute speed/direction from hspeed/vspeed.
    pub fn apply_cartesian(&mut self) {
        self.speed = self.hspeed.hypot(self.vspeed);
        if self.hspeed != 0.0 || self.vspeed != 0.0 {
            let mut dir = (-self.vspeed).atan2(self.hspeed).to_degrees();
            if dir < 0.0 {
                dir += 360.0;
            }
            self.direction = dir;
        }
    }

    /// One step of motion integration: movement, then friction toward zero,
    /// then gravity along gravity_direction.
    pub fn integrate_motion(&mut self) {
        self.x += self.hspeed;
        self.y += self.vspeed;

        if self.friction != 0.0 && self.speed != 0.0 {
            let new_speed = if self.speed.abs() <= self.friction.abs() {
                0.0
            } else {
                self.speed - self.friction * self.speed.signum()
            };
            self.speed = new_speed;
            self.apply_polar();
        }

        if self.gravity != 0.0 {
            let rad = self.gravity_direction.to_radians();
            self.hspeed += self.gravity * rad.cos();
            self.vspeed -= self.gravity * rad.sin();
            self.apply_cartesian();
        }
    }

    /// Sprite used for collision checks (mask_index overrides sprite_index).
    pub fn collision_sprite(&self) -> i32 {
        if self.mask_index >= 0 {
            self.mask_index
        } else {
            self.sprite_index
        }
    }

    /// Axis-aligned bounding box in room coordinates: (left, top, right,
    /// bottom), inclusive. None when the instance has no usable sprite.
    pub fn bbox(&self, data: &GameData) -> Option<(f64, f64, f64, f64)> {
        let sprite = data.sprites.get(usize::try_from(self.collision_sprite()).ok()?)?;
        let sx = self.image_xscale;
        let sy = self.image_yscale;
        let l = self.x + (sprite.bbox_left - sprite.origin_x) as f64 * sx;
        let r = self.x + (sprite.bbox_right + 1 - sprite.origin_x) as f64 * sx;
        let t = self.y + (sprite.bbox_top - sprite.origin_y) as f64 * sy;
        let b = self.y + (sprite.bbox_bottom + 1 - sprite.origin_y) as f64 * sy;
        Some((l.min(r), t.min(b), l.max(r), t.max(b)))
    }

    /// Current animation frame: floor(image_index) wrapped into frame count
    /// (negative indices wrap positively).
    pub fn current_frame(&self, data: &GameData) -> Option<u32> {
        let sprite = data.sprites.get(usize::try_from(self.sprite_index).ok()?)?;
        let count = sprite.frames.len() as i64;
        if count == 0 {
            return None;
        }
        let frame = (self.image_index.floor() as i64).rem_euclid(count);
        Some(sprite.frames[frame as usize])
    }
}

/// Arena of live instances keyed by stable id. Iteration order is ascending
/// id; phase snapshots are taken from `ids()` so deferred mutations never
/// perturb in-phase ordering.
#[derive(Default)]
pub struct InstanceArena {
    map: BTreeMap<u32, Instance>,
    next_id: u32,
}

impl InstanceArena {
    pub fn new() -> Self {
        Self {
            map: BTreeMap::new(),
            next_id: FIRST_INSTANCE_ID,
        }
    }

    /// Allocate an instance with the next id.
    pub fn alloc(&mut self, object_index: i32, x: f64, y: f64, data: &GameData) -> u32 {
        let id = self.next_id;
        self.next_id += 1;
        self.map.insert(id, Instance::new(id, object_index, x, y, data));
        id
    }

    pub fn get(&self, id: u32) -> Option<&Instance> {
        self.map.get(&id)
    }

    pub fn get_mut(&mut self, id: u32) -> Option<&mut Instance> {
        self.map.get_mut(&id)
    }

    pub fn remove(&mut self, id: u32) -> Option<Instance> {
        self.map.remove(&id)
    }

    pub fn contains(&self, id: u32) -> bool {
        self.map.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// Snapshot of live (non-destroyed) ids in ascending order.
    pub fn ids(&self) -> Vec<u32> {
        self.map
            .values()
            .filter(|i| !i.destroyed)
            .map(|i| i.id)
            .collect()
    }

    /// Snapshot of all ids including destroyed-but-unflushed ones.
    pub fn all_ids(&self) -> Vec<u32> {
        self.map.keys().copied().collect()
    }

    /// Live ids whose object is `object_index` or a descendant of it.
    pub fn ids_of_object(&self, object_index: i32, data: &GameData) -> Vec<u32> {
        self.map
            .values()
            .filter(|i| !i.destroyed && data.object_is_ancestor(i.object_index, object_index))
            .map(|i| i.id)
            .collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Instance> {
        self.map.values()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn polar_cartesian_coupling() {
        let mut inst = Instance {
            id: 1,
            object_index: 0,
            x: 0.0,
            y: 0.0,
            xprevious: 0.0,
            yprevious: 0.0,
            xstart: 0.0,
            ystart: 0.0,
            sprite_index: -1,
            image_index: 0.0,
            image_speed: 1.0,
            image_xscale: 1.0,
            image_yscale: 1.0,
            image_angle: 0.0,
            image_blend: 0xFF_FFFF,
            image_alpha: 1.0,
            mask_index: -1,
            depth: 0.0,
            visible: true,
            solid: false,
            persistent: false,
            direction: 0.0,
            speed: 0.0,
            hspeed: 0.0,
            vspeed: 0.0,
            gravity: 0.0,
            gravity_direction: 270.0,
            friction: 0.0,
            alarms: [-1; 12],
            path: PathFollower::default(),
            vars: HashMap::new(),
            destroyed: false,
        };

        inst.speed = 2.0;
        inst.direction = 90.0;
        inst.apply_polar();
        assert!(inst.hspeed.abs() < 1e-9);
        assert!((inst.vspeed + 2.0).abs() < 1e-9);

        inst.hspeed = 3.0;
        inst.vspeed = 0.0;
        inst.apply_cartesian();
        assert!((inst.speed - 3.0).abs() < 1e-9);
        assert!(inst.direction.abs() < 1e-9);
    }
}
