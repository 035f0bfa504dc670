use std::collections::{HashMap, HashSet};
use std::rc::Rc;

use tracing::warn;

use crate::assets::GameData;
use crate::error::{Result, RuntimeError};
use crate::events;
use crate::input::KeyboardState;
use crate::instance::InstanceArena;
use crate::render::{DrawState, Renderer};
use crate::rng::Rng;
use crate::value::Value;
use crate::vm;

/// Key for ds_map entries: reals hash by bit pattern, strings lexically.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum DsKey {
    Real(u64),
    Str(String),
}

impl DsKey {
    pub fn from_value(v: &Value) -> Self {
        match v {
            Value::Str(s) => DsKey::Str(s.to_string()),
            other => DsKey::Real(other.as_real().unwrap_or(0.0).to_bits()),
        }
    }
}

/// Integer-handle arenas for ds_map and ds_list structures.
#[derive(Default)]
pub struct DsStore {
    pub maps: Vec<Option<HashMap<DsKey, Value>>>,
    pub lists: Vec<Option<Vec<Value>>>,
}

impl DsStore {
    pub fn create_map(&mut self) -> i32 {
        self.maps.push(Some(HashMap::new()));
        (self.maps.len() - 1) as i32
    }

    pub fn create_list(&mut self) -> i32 {
        self.lists.push(Some(Vec::new()));
        (self.lists.len() - 1) as i32
    }

    pub fn map(&mut self, handle: i32) -> Option<&mut HashMap<DsKey, Value>> {
        self.maps.get_mut(usize::try_from(handle).ok()?)?.as_mut()
    }

    pub fn list(&mut self, handle: i32) -> Option<&mut Vec<Value>> {
        self.lists.get_mut(usize::try_from(handle).ok()?)?.as_mut()
    }
}

/// Trace filter for `--trace-*` flags.
#[derive(Debug, Clone, Default)]
pub enum TraceFilter {
    #[default]
    Off,
    All,
    Named(HashSet<String>),
}

impl TraceFilter {
    /// Build from repeatable `<name|*>` flag values.
    pub fn from_args(values: &[String]) -> Self {
        if values.is_empty() {
            TraceFilter::Off
        } else if values.iter().any(|v| v == "*") {
            TraceFilter::All
        } else {
            TraceFilter::Named(values.iter().cloned().collect())
        }
    }

    pub fn matches(&self, name: &str) -> bool {
        match self {
            TraceFilter::Off => false,
            TraceFilter::All => true,
            TraceFilter::Named(set) => set.contains(name),
        }
    }
}

/// Diagnostics configuration.
#[derive(Debug, Clone, Default)]
pub struct TraceConfig {
    pub calls: TraceFilter,
    pub ignore_calls: HashSet<String>,
    pub events: TraceFilter,
    pub instructions: TraceFilter,
    /// Object names whose instances log event dispatch.
    pub debug_objects: HashSet<String>,
}

/// Mutable per-room state (a working copy of the room definition; creation
/// code and built-ins may change it).
#[derive(Debug, Clone)]
pub struct RoomState {
    /// ROOM table index, or -1 before the first room loads.
    pub index: i32,
    /// Position within GEN8 room order, when the current room is in it.
    pub order_pos: Option<usize>,
    pub width: u32,
    pub height: u32,
    pub speed: u32,
    pub caption: String,
    pub background_color: u32,
    pub draw_background_color: bool,
    pub views_enabled: bool,
    pub views: Vec<crate::assets::RoomView>,
    pub backgrounds: Vec<crate::assets::RoomBackground>,
    pub tiles: Vec<crate::assets::RoomTile>,
}

impl Default for RoomState {
    fn default() -> Self {
        Self {
            index: -1,
            order_pos: None,
            width: 0,
            height: 0,
            speed: 30,
            caption: String::new(),
            background_color: 0,
            draw_background_color: true,
            views_enabled: false,
            views: Vec::new(),
            backgrounds: Vec::new(),
            tiles: Vec::new(),
        }
    }
}

/// A pending room change, latched until the flush boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoomTarget {
    Index(u32),
    Restart,
}

/// Event currently being dispatched (for `event_inherited` and diagnostics).
#[derive(Debug, Clone, Copy)]
pub struct EventCtx {
    pub kind: u32,
    pub subtype: u32,
    /// Object index whose handler is running (the chain level in progress).
    pub object_index: i32,
}

/// The whole simulation state. Owned and mutated only by the main loop;
/// every built-in and VM operation receives `&mut Runtime`.
pub struct Runtime {
    pub data: Rc<GameData>,
    pub instances: InstanceArena,
    /// Slot-keyed user globals (`global.foo`).
    pub globals: HashMap<u32, Value>,
    /// Built-in-scope fallback storage, keyed by name.
    pub named_globals: HashMap<String, Value>,
    pub score: f64,
    pub lives: f64,
    pub health: f64,
    pub ds: DsStore,
    pub rng: Rng,
    pub input: KeyboardState,
    pub draw: DrawState,
    pub renderer: Box<dyn Renderer>,
    pub room: RoomState,
    pub pending_room: Option<RoomTarget>,
    /// Instances created this phase whose Create event is deferred.
    pub pending_create: Vec<u32>,
    /// Instances marked destroyed, awaiting the flush boundary.
    pub pending_destroy: Vec<u32>,
    pub game_end_requested: bool,
    pub frame: u64,
    pub trace: TraceConfig,
    pub event_stack: Vec<EventCtx>,
    /// Decoded-instruction cache, keyed by CODE entry index.
    pub code_cache: HashMap<u32, Rc<vm::DecodedCode>>,
    /// Rate limit: warn once per (site, detail).
    warned: HashSet<(&'static str, String)>,
}

impl Runtime {
    pub fn new(data: Rc<GameData>, renderer: Box<dyn Renderer>, seed: u32) -> Self {
        Self {
            data,
            instances: InstanceArena::new(),
            globals: HashMap::new(),
            named_globals: HashMap::new(),
            score: 0.0,
            lives: -1.0,
            health: 100.0,
            ds: DsStore::default(),
            rng: Rng::new(seed),
            input: KeyboardState::new(),
            draw: DrawState::default(),
            renderer,
            room: RoomState::default(),
            pending_room: None,
            pending_create: Vec::new(),
            pending_destroy: Vec::new(),
            game_end_requested: false,
            frame: 0,
            trace: TraceConfig::default(),
            event_stack: Vec::new(),
            code_cache: HashMap::new(),
            warned: HashSet::new(),
        }
    }

    /// Log a runtime warning once per (site, detail) pair.
    pub fn warn_once(&mut self, site: &'static str, detail: String) {
        if self.warned.insert((site, detail.clone())) {
            warn!(site, detail = %detail, "runtime warning");
        }
    }

    /// Create an instance now; its Create event is deferred to the next
    /// flush boundary.
    pub fn create_instance(&mut self, object_index: i32, x: f64, y: f64) -> Result<u32> {
        if object_index < 0 || object_index as usize >= self.data.objects.len() {
            return Err(RuntimeError::AssetRef {
                context: "instance_create object",
                index: object_index as i64,
            });
        }
        let data = self.data.clone();
        let id = self.instances.alloc(object_index, x, y, &data);
        self.pending_create.push(id);
        Ok(id)
    }

    /// Mark an instance destroyed. It stays addressable until the flush
    /// boundary, where it emits its Destroy event exactly once.
    pub fn destroy_instance(&mut self, id: u32) {
        if let Some(inst) = self.instances.get_mut(id) {
            if !inst.destroyed {
                inst.destroyed = true;
                self.pending_destroy.push(id);
            }
        }
    }

    /// Object index of an instance, or -1.
    pub fn object_of(&self, id: u32) -> i32 {
        self.instances.get(id).map(|i| i.object_index).unwrap_or(-1)
    }

    /// Dispatch an event on an instance, walking the parent chain for a
    /// handler. Absent handlers are a logged warning, never fatal.
    pub fn dispatch_event(
        &mut self,
        inst_id: u32,
        other_id: u32,
        kind: u32,
        subtype: u32,
    ) -> Result<()> {
        let object_index = self.object_of(inst_id);
        if object_index < 0 {
            return Ok(());
        }
        let data = self.data.clone();
        let Some((codes, found_on)) = data.resolve_event(object_index, kind, subtype) else {
            return Ok(());
        };

        if self.trace.events.matches(&data.objects[object_index as usize].name)
            || self
                .trace
                .debug_objects
                .contains(&data.objects[object_index as usize].name)
        {
            tracing::debug!(
                object = %data.objects[object_index as usize].name,
                event = %events::event_name(kind, subtype),
                instance = inst_id,
                "event"
            );
        }

        self.event_stack.push(EventCtx {
            kind,
            subtype,
            object_index: found_on,
        });
        let result: Result<()> = (|| {
            for &code_id in codes {
                vm::execute_code(self, code_id, inst_id as i32, other_id as i32, &[])?;
            }
            Ok(())
        })();
        self.event_stack.pop();
        result
    }

    /// Re-dispatch the event in progress one level above the chain level
    /// currently running (`event_inherited`).
    pub fn dispatch_inherited(&mut self, inst_id: u32, other_id: u32) -> Result<()> {
        let Some(ctx) = self.event_stack.last().copied() else {
            self.warn_once("event_inherited", "called outside an event".into());
            return Ok(());
        };
        let data = self.data.clone();
        let parent = match data.objects.get(ctx.object_index as usize) {
            Some(obj) => obj.parent_index,
            None => return Ok(()),
        };
        if parent < 0 {
            return Ok(());
        }
        let Some((codes, found_on)) = data.resolve_event(parent, ctx.kind, ctx.subtype) else {
            return Ok(());
        };
        self.event_stack.push(EventCtx {
            kind: ctx.kind,
            subtype: ctx.subtype,
            object_index: found_on,
        });
        let result: Result<()> = (|| {
            for &code_id in codes {
                vm::execute_code(self, code_id, inst_id as i32, other_id as i32, &[])?;
            }
            Ok(())
        })();
        self.event_stack.pop();
        result
    }

    /// ROOM index `delta` steps away in the GEN8 room order, if any.
    pub fn next_room_in_order(&self, delta: i32) -> Option<u32> {
        let pos = self.room.order_pos.or_else(|| {
            self.data
                .room_order
                .iter()
                .position(|&r| r as i32 == self.room.index)
        })?;
        let next = pos as i32 + delta;
        if next < 0 {
            return None;
        }
        self.data.room_order.get(next as usize).copied()
    }

    /// Whether two instances' bounding boxes intersect.
    pub fn bbox_overlap(&self, a: u32, b: u32) -> bool {
        let data = &self.data;
        let (Some(ia), Some(ib)) = (self.instances.get(a), self.instances.get(b)) else {
            return false;
        };
        let (Some(ba), Some(bb)) = (ia.bbox(data), ib.bbox(data)) else {
            return false;
        };
        ba.0 < bb.2 && bb.0 < ba.2 && ba.1 < bb.3 && bb.1 < ba.3
    }

    /// Whether an instance's bbox placed at (x, y) overlaps any live
    /// instance of `object_index` (or any solid instance when
    /// `object_index` is the "all solids" convention, -3).
    pub fn place_meeting(&self, id: u32, x: f64, y: f64, object_index: i32) -> bool {
        let data = &self.data;
        let Some(inst) = self.instances.get(id) else {
            return false;
        };
        let Some((l, t, r, b)) = inst.bbox(data) else {
            return false;
        };
        let (dl, dt, dr, db) = (
            l + (x - inst.x),
            t + (y - inst.y),
            r + (x - inst.x),
            b + (y - inst.y),
        );
        for other in self.instances.iter() {
            if other.id == id || other.destroyed {
                continue;
            }
            let matches = if object_index == -3 {
                true
            } else {
                data.object_is_ancestor(other.object_index, object_index)
            };
            if !matches {
                continue;
            }
            if let Some((ol, ot, or_, ob)) = other.bbox(data) {
                if dl < or_ && ol < dr && dt < ob && ot < db {
                    return true;
                }
            }
        }
        false
    }
}
