use std::collections::{BTreeMap, HashSet};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// GameMaker virtual key codes (Windows VK numbering).
pub mod keys {
    pub const VK_NOKEY: u32 = 0;
    pub const VK_ANYKEY: u32 = 1;
    pub const VK_BACKSPACE: u32 = 8;
    pub const VK_TAB: u32 = 9;
    pub const VK_ENTER: u32 = 13;
    pub const VK_SHIFT: u32 = 16;
    pub const VK_CONTROL: u32 = 17;
    pub const VK_ALT: u32 = 18;
    pub const VK_PAUSE: u32 = 19;
    pub const VK_ESCAPE: u32 = 27;
    pub const VK_SPACE: u32 = 32;
    pub const VK_PAGEUP: u32 = 33;
    pub const VK_PAGEDOWN: u32 = 34;
    pub const VK_END: u32 = 35;
    pub const VK_HOME: u32 = 36;
    pub const VK_LEFT: u32 = 37;
    pub const VK_UP: u32 = 38;
    pub const VK_RIGHT: u32 = 39;
    pub const VK_DOWN: u32 = 40;
    pub const VK_INSERT: u32 = 45;
    pub const VK_DELETE: u32 = 46;
    pub const VK_F1: u32 = 112;
    pub const VK_F12: u32 = 123;
}

/// Edge-triggered keyboard state.
///
/// Raw key transitions accumulate between frames; `latch` snapshots them once
/// per frame so that down/pressed/released are stable for the whole frame.
#[derive(Debug, Default)]
pub struct KeyboardState {
    /// Keys physically down right now (live feed).
    raw: HashSet<u32>,
    /// Snapshot: keys down this frame.
    held: HashSet<u32>,
    /// Snapshot: keys that went down this frame.
    pressed: HashSet<u32>,
    /// Snapshot: keys that went up this frame.
    released: HashSet<u32>,
}

impl KeyboardState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed a key-down transition (from the window layer or playback).
    pub fn feed_down(&mut self, key: u32) {
        self.raw.insert(key);
    }

    /// Feed a key-up transition.
    pub fn feed_up(&mut self, key: u32) {
        self.raw.remove(&key);
    }

    /// Replace the live set wholesale (playback: keys not listed for a frame
    /// are released).
    pub fn feed_frame(&mut self, keys: &[u32]) {
        self.raw = keys.iter().copied().collect();
    }

    /// Latch transitions for the coming frame.
    pub fn latch(&mut self) {
        self.pressed = self.raw.difference(&self.held).copied().collect();
        self.released = self.held.difference(&self.raw).copied().collect();
        self.held = self.raw.clone();
    }

    pub fn is_down(&self, key: u32) -> bool {
        match key {
            keys::VK_NOKEY => self.held.is_empty(),
            keys::VK_ANYKEY => !self.held.is_empty(),
            k => self.held.contains(&k),
        }
    }

    pub fn is_pressed(&self, key: u32) -> bool {
        match key {
            keys::VK_NOKEY => self.held.is_empty() && !self.released.is_empty(),
            keys::VK_ANYKEY => !self.pressed.is_empty(),
            k => self.pressed.contains(&k),
        }
    }

    pub fn is_released(&self, key: u32) -> bool {
        match key {
            keys::VK_ANYKEY => !self.released.is_empty(),
            k => self.released.contains(&k),
        }
    }

    /// Keys down this frame, ascending.
    pub fn held_keys(&self) -> Vec<u32> {
        let mut v: Vec<u32> = self.held.iter().copied().collect();
        v.sort_unstable();
        v
    }

    /// Keys pressed this frame, ascending.
    pub fn pressed_keys(&self) -> Vec<u32> {
        let mut v: Vec<u32> = self.pressed.iter().copied().collect();
        v.sort_unstable();
        v
    }

    /// Keys released this frame, ascending.
    pub fn released_keys(&self) -> Vec<u32> {
        let mut v: Vec<u32> = self.released.iter().copied().collect();
        v.sort_unstable();
        v
    }

    /// Drop all key state (io_clear).
    pub fn clear(&mut self) {
        self.raw.clear();
        self.held.clear();
        self.pressed.clear();
        self.released.clear();
    }
}

/// On-disk input recording: frame number → keys held that frame.
/// Keys not listed for a frame are released.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct InputRecording {
    pub events: BTreeMap<u64, Vec<u32>>,
}

impl InputRecording {
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&text)?)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let text = serde_json::to_string_pretty(self)?;
        std::fs::write(path, text)?;
        Ok(())
    }

    /// Record the held set for a frame. Empty sets are omitted to keep the
    /// file sparse.
    pub fn record(&mut self, frame: u64, keys: Vec<u32>) {
        if !keys.is_empty() {
            self.events.insert(frame, keys);
        }
    }

    /// Keys held at a frame (empty when unlisted).
    pub fn keys_for(&self, frame: u64) -> &[u32] {
        self.events.get(&frame).map(|v| v.as_slice()).unwrap_or(&[])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn latch_computes_edges() {
        let mut kb = KeyboardState::new();
        kb.feed_down(keys::VK_ENTER);
        kb.latch();
        assert!(kb.is_down(keys::VK_ENTER));
        assert!(kb.is_pressed(keys::VK_ENTER));
        assert!(!kb.is_released(keys::VK_ENTER));

        kb.latch();
        assert!(kb.is_down(keys::VK_ENTER));
        assert!(!kb.is_pressed(keys::VK_ENTER));

        kb.feed_up(keys::VK_ENTER);
        kb.latch();
        assert!(!kb.is_down(keys::VK_ENTER));
        assert!(kb.is_released(keys::VK_ENTER));
    }

    #[test]
    fn anykey_and_nokey() {
        let mut kb = KeyboardState::new();
        kb.latch();
        assert!(kb.is_down(keys::VK_NOKEY));
        assert!(!kb.is_down(keys::VK_ANYKEY));
        kb.feed_down(65);
        kb.latch();
        assert!(kb.is_down(keys::VK_ANYKEY));
        assert!(!kb.is_down(keys::VK_NOKEY));
    }

    #[test]
    fn recording_round_trips_through_json() {
        let mut rec = InputRecording::default();
        rec.record(60, vec![13]);
        rec.record(61, vec![13, 37]);
        rec.record(62, vec![]);
        let json = serde_json::to_string(&rec).unwrap();
        let back: InputRecording = serde_json::from_str(&json).unwrap();
        assert_eq!(back.keys_for(60), &[13]);
        assert_eq!(back.keys_for(61), &[13, 37]);
        assert_eq!(back.keys_for(62), &[] as &[u32]);
    }
}
