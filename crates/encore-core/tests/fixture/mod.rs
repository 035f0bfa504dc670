//! Synthetic container builder: assembles a minimal but structurally
//! complete `game.unx` in memory, with a tiny bytecode assembler for test
//! scripts and event handlers.
#![allow(dead_code)]

use datawin::cursor::Writer;

/// An object definition in the fixture.
pub struct FxObject {
    pub name: String,
    pub sprite_index: i32,
    pub persistent: bool,
    pub parent_index: i32,
    /// (event kind, subtype, code id)
    pub events: Vec<(u32, u32, u32)>,
}

impl FxObject {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.into(),
            sprite_index: -1,
            persistent: false,
            parent_index: -100,
            events: Vec::new(),
        }
    }
}

/// An instance placed in the fixture's room.
pub struct FxInstance {
    pub x: i32,
    pub y: i32,
    pub object_index: i32,
}

/// Builds the FORM container.
pub struct GameBuilder {
    strings: Vec<String>,
    pub objects: Vec<FxObject>,
    pub instances: Vec<FxInstance>,
    /// (name, bytecode)
    code: Vec<(String, Vec<u8>)>,
    /// (name, scope)
    variables: Vec<(String, i32)>,
    functions: Vec<String>,
    /// (name, code id)
    scripts: Vec<(String, u32)>,
    pub room_name: String,
    pub room_speed: u32,
    pub room_size: (u32, u32),
    pub background_color: u32,
    pub window_size: (u32, u32),
}

impl GameBuilder {
    pub fn new() -> Self {
        Self {
            strings: Vec::new(),
            objects: Vec::new(),
            instances: Vec::new(),
            code: Vec::new(),
            variables: Vec::new(),
            functions: Vec::new(),
            scripts: Vec::new(),
            room_name: "room_test".into(),
            room_speed: 30,
            room_size: (64, 48),
            background_color: 0x00_0000,
            window_size: (64, 48),
        }
    }

    fn intern(&mut self, s: &str) -> usize {
        if let Some(i) = self.strings.iter().position(|x| x == s) {
            return i;
        }
        self.strings.push(s.to_string());
        self.strings.len() - 1
    }

    /// Register a variable slot; returns the slot id instructions carry.
    pub fn variable(&mut self, name: &str, scope: i32) -> u32 {
        if let Some(i) = self
            .variables
            .iter()
            .position(|(n, s)| n == name && *s == scope)
        {
            return i as u32;
        }
        self.variables.push((name.into(), scope));
        (self.variables.len() - 1) as u32
    }

    /// Register a callable name; returns the FUNC id `call` carries.
    pub fn function(&mut self, name: &str) -> u32 {
        if let Some(i) = self.functions.iter().position(|n| n == name) {
            return i as u32;
        }
        self.functions.push(name.into());
        (self.functions.len() - 1) as u32
    }

    /// Add a code entry; returns its CODE id.
    pub fn code(&mut self, name: &str, bytecode: Vec<u8>) -> u32 {
        self.code.push((name.into(), bytecode));
        (self.code.len() - 1) as u32
    }

    /// Add a script bound to a code entry; returns the script index.
    pub fn script(&mut self, name: &str, code_id: u32) -> u32 {
        self.scripts.push((name.into(), code_id));
        (self.scripts.len() - 1) as u32
    }

    pub fn object(&mut self, obj: FxObject) -> i32 {
        self.objects.push(obj);
        (self.objects.len() - 1) as i32
    }

    pub fn place(&mut self, object_index: i32, x: i32, y: i32) {
        self.instances.push(FxInstance { x, y, object_index });
    }

    /// Serialize the container.
    pub fn build(mut self) -> Vec<u8> {
        // Intern every name referenced by chunks before laying out STRG.
        let room_name = self.room_name.clone();
        self.intern("fixture");
        self.intern(&room_name);
        for i in 0..self.objects.len() {
            let name = self.objects[i].name.clone();
            self.intern(&name);
        }
        for i in 0..self.code.len() {
            let name = self.code[i].0.clone();
            self.intern(&name);
        }
        for i in 0..self.variables.len() {
            let name = self.variables[i].0.clone();
            self.intern(&name);
        }
        for i in 0..self.functions.len() {
            let name = self.functions[i].clone();
            self.intern(&name);
        }
        for i in 0..self.scripts.len() {
            let name = self.scripts[i].0.clone();
            self.intern(&name);
        }

        let mut w = Writer::new();
        w.write_magic(b"FORM");
        w.write_u32(0); // patched at the end

        // STRG first so every other chunk knows the absolute offsets.
        let strg_payload_start = w.position() + 8;
        let entries_start = strg_payload_start + 4 + self.strings.len() * 4;
        let mut offsets = Vec::with_capacity(self.strings.len());
        let mut cursor = entries_start;
        for s in &self.strings {
            offsets.push(cursor as u32);
            cursor += 4 + s.len() + 1;
        }
        let strg_size = cursor - strg_payload_start;
        w.write_magic(b"STRG");
        w.write_u32(strg_size as u32);
        w.write_u32(self.strings.len() as u32);
        for &off in &offsets {
            w.write_u32(off);
        }
        for s in &self.strings {
            w.write_gm_string(s);
        }
        // Inline references point at the character data.
        let strref = |b: &GameBuilder, s: &str| -> u32 {
            let i = b.strings.iter().position(|x| x == s).expect("interned");
            offsets[i] + 4
        };

        // GEN8.
        {
            let mut p = Writer::new();
            p.write_u8(1); // debug disabled
            p.write_u8(16); // bytecode version
            p.write_u16(0);
            p.write_u32(strref(&self, "fixture")); // filename
            p.write_u32(strref(&self, "fixture")); // config
            p.write_u32(self.objects.len() as u32);
            p.write_u32(0);
            p.write_u32(1);
            p.write_bytes(&[0u8; 16]); // guid
            p.write_u32(strref(&self, "fixture"));
            p.write_u32(1);
            p.write_u32(4);
            p.write_u32(0);
            p.write_u32(0);
            p.write_u32(self.window_size.0);
            p.write_u32(self.window_size.1);
            p.write_u32(0); // info
            p.write_u32(0); // crc
            p.write_bytes(&[0u8; 16]); // md5
            p.write_u64(0); // timestamp
            p.write_u32(strref(&self, "fixture")); // display name
            p.write_u64(0);
            p.write_u64(0);
            p.write_i32(0); // steam app id
            p.write_u32(0); // debugger port
            p.write_u32(1); // room order
            p.write_u32(0);
            write_chunk(&mut w, b"GEN8", p.into_bytes());
        }

        // Empty asset chunks the loader requires.
        for magic in [b"TXTR", b"TPAG", b"SPRT", b"BGND", b"FONT", b"PATH"] {
            let mut p = Writer::new();
            p.write_u32(0);
            write_chunk(&mut w, magic, p.into_bytes());
        }

        // OBJT. Record layout: 132-byte fixed head (8 fields, physics
        // block, kind count, 12 kind-list pointers) followed by the 12 kind
        // blocks; each event entry is 48 bytes (subtype + action pointer
        // list + one 9-word action record).
        {
            let base = w.position() + 8;
            let header = 4 + self.objects.len() * 4;
            let sizes: Vec<usize> = self
                .objects
                .iter()
                .map(|o| 180 + 52 * o.events.len())
                .collect();
            let mut p = Writer::new();
            p.write_u32(self.objects.len() as u32);
            let mut at = base + header;
            let mut starts = Vec::new();
            for size in &sizes {
                p.write_u32(at as u32);
                starts.push(at);
                at += size;
            }
            for (oi, o) in self.objects.iter().enumerate() {
                let rec = starts[oi];
                p.write_u32(strref(&self, &o.name));
                p.write_i32(o.sprite_index);
                p.write_u32(1); // visible
                p.write_u32(0); // solid
                p.write_i32(0); // depth
                p.write_u32(o.persistent as u32);
                p.write_i32(o.parent_index);
                p.write_i32(-1); // mask
                for _ in 0..8 {
                    p.write_u32(0); // physics head
                }
                p.write_u32(0); // vertex count
                for _ in 0..3 {
                    p.write_u32(0); // physics tail
                }
                p.write_u32(12);
                let mut kind_offsets = [0usize; 12];
                let mut kind_at = rec + 132;
                for (k, slot) in kind_offsets.iter_mut().enumerate() {
                    *slot = kind_at;
                    let n = count_events(&o.events, k);
                    kind_at += 4 + n * 4 + n * 48;
                }
                for off in kind_offsets {
                    p.write_u32(off as u32);
                }
                for k in 0..12u32 {
                    let evs: Vec<&(u32, u32, u32)> =
                        o.events.iter().filter(|e| e.0 == k).collect();
                    p.write_u32(evs.len() as u32);
                    let entries_base = kind_offsets[k as usize] + 4 + evs.len() * 4;
                    for i in 0..evs.len() {
                        p.write_u32((entries_base + i * 48) as u32);
                    }
                    for (i, ev) in evs.iter().enumerate() {
                        let entry_at = entries_base + i * 48;
                        p.write_u32(ev.1); // subtype
                        p.write_u32(1); // one action
                        p.write_u32((entry_at + 12) as u32); // action ptr
                        for _ in 0..7 {
                            p.write_u32(0);
                        }
                        p.write_u32(strref(&self, "fixture")); // func name
                        p.write_u32(ev.2); // code id
                    }
                }
            }
            write_chunk(&mut w, b"OBJT", p.into_bytes());
        }

        // ROOM.
        {
            let base = w.position() + 8;
            let mut p = Writer::new();
            p.write_u32(1);
            p.write_u32((base + 8) as u32);
            // Room record.
            p.write_u32(strref(&self, &room_name));
            p.write_u32(strref(&self, "fixture")); // caption
            p.write_u32(self.room_size.0);
            p.write_u32(self.room_size.1);
            p.write_u32(self.room_speed);
            p.write_u32(0); // persistent
            p.write_u32(self.background_color);
            p.write_u32(1); // draw background color
            p.write_i32(-1); // creation code
            p.write_u32(0); // flags: views disabled
            let record_fixed = 10 * 4 + 4 * 4;
            let lists_base = base + 8 + record_fixed;
            let bg_at = lists_base;
            let views_at = bg_at + 4;
            let inst_at = views_at + 4;
            let tiles_at = inst_at + 4 + self.instances.len() * 4 + self.instances.len() * 9 * 4;
            p.write_u32(bg_at as u32);
            p.write_u32(views_at as u32);
            p.write_u32(inst_at as u32);
            p.write_u32(tiles_at as u32);
            // Empty backgrounds and views.
            p.write_u32(0);
            p.write_u32(0);
            // Instances.
            p.write_u32(self.instances.len() as u32);
            let entries_base = inst_at + 4 + self.instances.len() * 4;
            for i in 0..self.instances.len() {
                p.write_u32((entries_base + i * 9 * 4) as u32);
            }
            for (i, inst) in self.instances.iter().enumerate() {
                p.write_i32(inst.x);
                p.write_i32(inst.y);
                p.write_i32(inst.object_index);
                p.write_u32(1000 + i as u32); // editor id
                p.write_i32(-1); // creation code
                p.write_f32(1.0);
                p.write_f32(1.0);
                p.write_u32(0xFF_FFFF);
                p.write_f32(0.0);
            }
            // Empty tiles.
            p.write_u32(0);
            write_chunk(&mut w, b"ROOM", p.into_bytes());
        }

        // CODE: pointer list, then 20-byte headers each followed by its
        // bytecode (relative address 8 lands just past the header).
        {
            let base = w.position() + 8;
            let header = 4 + self.code.len() * 4;
            let mut p = Writer::new();
            p.write_u32(self.code.len() as u32);
            let mut at = base + header;
            let mut entry_offsets = Vec::new();
            for (_, bc) in &self.code {
                entry_offsets.push(at);
                at += 20 + bc.len();
            }
            for &off in &entry_offsets {
                p.write_u32(off as u32);
            }
            for (name, bc) in &self.code {
                p.write_u32(strref(&self, name));
                p.write_u32(bc.len() as u32);
                p.write_u16(4); // locals
                p.write_u16(0); // args
                p.write_i32(8); // bytecode follows the header
                p.write_u32(0);
                p.write_bytes(bc);
            }
            write_chunk(&mut w, b"CODE", p.into_bytes());
        }

        // VARI.
        {
            let mut p = Writer::new();
            p.write_u32(0);
            p.write_u32(0);
            p.write_u32(4);
            for (name, scope) in &self.variables {
                p.write_u32(strref(&self, name));
                p.write_i32(*scope);
                p.write_i32(0);
                p.write_u32(0);
                p.write_i32(-1);
            }
            write_chunk(&mut w, b"VARI", p.into_bytes());
        }

        // FUNC.
        {
            let mut p = Writer::new();
            p.write_u32(self.functions.len() as u32);
            for name in &self.functions {
                p.write_u32(strref(&self, name));
                p.write_u32(0);
                p.write_i32(-1);
            }
            p.write_u32(0); // code locals
            write_chunk(&mut w, b"FUNC", p.into_bytes());
        }

        // SCPT.
        {
            let base = w.position() + 8;
            let mut p = Writer::new();
            p.write_u32(self.scripts.len() as u32);
            let entries_base = base + 4 + self.scripts.len() * 4;
            for i in 0..self.scripts.len() {
                p.write_u32((entries_base + i * 8) as u32);
            }
            for (name, code_id) in &self.scripts {
                p.write_u32(strref(&self, name));
                p.write_u32(*code_id);
            }
            write_chunk(&mut w, b"SCPT", p.into_bytes());
        }

        let total = w.position();
        w.patch_u32(4, (total - 8) as u32);
        w.into_bytes()
    }
}

fn count_events(events: &[(u32, u32, u32)], kind: usize) -> usize {
    events.iter().filter(|e| e.0 as usize == kind).count()
}

fn write_chunk(w: &mut Writer, magic: &[u8; 4], payload: Vec<u8>) {
    w.write_magic(magic);
    w.write_u32(payload.len() as u32);
    w.write_bytes(&payload);
}

// ---------------------------------------------------------------------------
// Bytecode assembly
// ---------------------------------------------------------------------------

/// Emits instruction words for test handlers.
#[derive(Default)]
pub struct Asm {
    buf: Vec<u8>,
}

const T_DOUBLE: u32 = 0x0;
const T_VARIABLE: u32 = 0x5;
const T_INT16: u32 = 0xF;

impl Asm {
    pub fn new() -> Self {
        Self::default()
    }

    fn word(&mut self, w: u32) -> &mut Self {
        self.buf.extend_from_slice(&w.to_le_bytes());
        self
    }

    /// Current byte offset (for computing branch deltas).
    pub fn here(&self) -> i32 {
        self.buf.len() as i32
    }

    pub fn push_i16(&mut self, v: i16) -> &mut Self {
        self.word(0x84 << 24 | T_INT16 << 16 | (v as u16 as u32))
    }

    pub fn push_d(&mut self, v: f64) -> &mut Self {
        self.word(0xC0 << 24 | T_DOUBLE << 16);
        self.buf.extend_from_slice(&v.to_le_bytes());
        self
    }

    /// Read a variable: `scope` is the i16 scope code; `array` selects the
    /// indexed form (target and index already pushed).
    pub fn push_var(&mut self, slot: u32, scope: i16, array: bool) -> &mut Self {
        self.word(0xC0 << 24 | T_VARIABLE << 16 | (scope as u16 as u32));
        let ref_type: u32 = if array { 0x00 } else { 0xA0 };
        self.word(slot & 0x00FF_FFFF | ref_type << 24)
    }

    /// Write a variable (value pushed first; for arrays, then target and
    /// index).
    pub fn pop_var(&mut self, slot: u32, scope: i16, array: bool) -> &mut Self {
        self.word(0x45 << 24 | T_VARIABLE << 20 | T_VARIABLE << 16 | (scope as u16 as u32));
        let ref_type: u32 = if array { 0x00 } else { 0xA0 };
        self.word(slot & 0x00FF_FFFF | ref_type << 24)
    }

    pub fn add(&mut self) -> &mut Self {
        self.word(0x0C << 24 | T_VARIABLE << 20 | T_VARIABLE << 16)
    }

    pub fn div_i16(&mut self) -> &mut Self {
        self.word(0x09 << 24 | T_INT16 << 20 | T_INT16 << 16)
    }

    pub fn div_d(&mut self) -> &mut Self {
        self.word(0x09 << 24 | T_DOUBLE << 20 | T_DOUBLE << 16)
    }

    pub fn mod_i16(&mut self) -> &mut Self {
        self.word(0x0B << 24 | T_INT16 << 20 | T_INT16 << 16)
    }

    pub fn mod_d(&mut self) -> &mut Self {
        self.word(0x0B << 24 | T_DOUBLE << 20 | T_DOUBLE << 16)
    }

    pub fn call(&mut self, func_id: u32, argc: u16) -> &mut Self {
        self.word(0xD9 << 24 | argc as u32);
        self.word(func_id)
    }

    /// `delta_bytes` is relative to this instruction's offset.
    pub fn pushenv(&mut self, delta_bytes: i32) -> &mut Self {
        self.word(0xBA << 24 | words23(delta_bytes))
    }

    pub fn popenv(&mut self, delta_bytes: i32) -> &mut Self {
        self.word(0xBB << 24 | words23(delta_bytes))
    }

    pub fn popz(&mut self) -> &mut Self {
        self.word(0x9E << 24 | T_VARIABLE << 16)
    }

    pub fn ret(&mut self) -> &mut Self {
        self.word(0x9C << 24)
    }

    pub fn exit(&mut self) -> &mut Self {
        self.word(0x9D << 24)
    }

    pub fn finish(&mut self) -> Vec<u8> {
        std::mem::take(&mut self.buf)
    }
}

fn words23(delta_bytes: i32) -> u32 {
    ((delta_bytes / 4) as u32) & 0x007F_FFFF
}
