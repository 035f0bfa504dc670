use std::collections::HashMap;

use datawin::chunks::{bgnd, code, font, func, gen8, objt, path, room, scpt, sprt, tpag, txtr, vari};
use datawin::string_table::StringTable;
use datawin::{ChunkIndex, Error as FormatError};

use crate::error::{Result, RuntimeError};

pub use datawin::chunks::room::{RoomBackground, RoomInstance, RoomTile, RoomView};
pub use datawin::chunks::tpag::TexturePageItem;

/// A decoded texture page: raw RGBA pixels, uploaded to the renderer lazily
/// on first draw.
#[derive(Debug)]
pub struct TexturePage {
    pub width: u32,
    pub height: u32,
    pub rgba: Vec<u8>,
}

/// A sprite: origin, bounding box, collision mask kind, ordered frames
/// (texture region indices).
#[derive(Debug)]
pub struct Sprite {
    pub name: String,
    pub width: u32,
    pub height: u32,
    pub origin_x: i32,
    pub origin_y: i32,
    pub bbox_left: i32,
    pub bbox_right: i32,
    pub bbox_top: i32,
    pub bbox_bottom: i32,
    /// 0 = axis-aligned rectangle, 1 = precise (treated as rectangle).
    pub mask_kind: u32,
    /// Texture region indices, one per animation frame.
    pub frames: Vec<u32>,
}

/// A background image: one texture region plus tiling metadata.
#[derive(Debug)]
pub struct Background {
    pub name: String,
    pub transparent: bool,
    pub region: u32,
}

/// A font: glyph table keyed by code point, bound to a texture region.
#[derive(Debug)]
pub struct Font {
    pub name: String,
    pub size: u32,
    pub region: u32,
    pub glyphs: HashMap<u32, font::Glyph>,
}

/// An object definition with its event table.
#[derive(Debug)]
pub struct Object {
    pub name: String,
    pub sprite_index: i32,
    pub visible: bool,
    pub solid: bool,
    pub persistent: bool,
    pub depth: i32,
    /// Parent object index; negative means none.
    pub parent_index: i32,
    pub mask_index: i32,
    /// (event kind, subtype) → CODE entry indices in action order.
    pub events: HashMap<(u32, u32), Vec<u32>>,
}

impl Object {
    /// Code entries for an event on this object only (no parent walk).
    pub fn event(&self, kind: u32, subtype: u32) -> Option<&[u32]> {
        self.events.get(&(kind, subtype)).map(|v| v.as_slice())
    }
}

/// A room definition, names resolved.
#[derive(Debug)]
pub struct Room {
    pub name: String,
    pub caption: String,
    pub width: u32,
    pub height: u32,
    pub speed: u32,
    pub persistent: bool,
    pub background_color: u32,
    pub draw_background_color: bool,
    pub creation_code: i32,
    pub views_enabled: bool,
    pub backgrounds: Vec<RoomBackground>,
    pub views: Vec<RoomView>,
    pub instances: Vec<RoomInstance>,
    pub tiles: Vec<RoomTile>,
}

/// A code entry: name, argument/local counts, and a span into the shared
/// bytecode blob.
#[derive(Debug)]
pub struct CodeEntry {
    pub name: String,
    pub arg_count: u16,
    pub locals_count: u16,
    /// Byte offset into [`GameData::code_blob`].
    pub offset: usize,
    pub length: usize,
}

/// A variable symbol: slot id (table index) → name and scope kind.
#[derive(Debug)]
pub struct VariableDef {
    pub name: String,
    pub scope: i32,
}

/// A script: name → code entry.
#[derive(Debug)]
pub struct Script {
    pub name: String,
    pub code_id: u32,
}

/// A path polyline.
#[derive(Debug)]
pub struct PathAsset {
    pub name: String,
    pub closed: bool,
    pub precision: u32,
    pub points: Vec<path::PathPoint>,
}

impl PathAsset {
    /// Total polyline length in pixels.
    pub fn length(&self) -> f64 {
        let mut total = 0.0;
        for w in self.points.windows(2) {
            total += ((w[1].x - w[0].x) as f64).hypot((w[1].y - w[0].y) as f64);
        }
        if self.closed && self.points.len() > 1 {
            let first = self.points[0];
            let last = self.points[self.points.len() - 1];
            total += ((first.x - last.x) as f64).hypot((first.y - last.y) as f64);
        }
        total
    }

    /// Point at normalized position `t` in [0, 1] along the polyline.
    pub fn point_at(&self, t: f64) -> (f64, f64) {
        if self.points.is_empty() {
            return (0.0, 0.0);
        }
        if self.points.len() == 1 {
            return (self.points[0].x as f64, self.points[0].y as f64);
        }
        let total = self.length();
        if total <= 0.0 {
            return (self.points[0].x as f64, self.points[0].y as f64);
        }
        let mut remaining = t.clamp(0.0, 1.0) * total;
        let mut segments: Vec<(path::PathPoint, path::PathPoint)> =
            self.points.windows(2).map(|w| (w[0], w[1])).collect();
        if self.closed {
            segments.push((self.points[self.points.len() - 1], self.points[0]));
        }
        for (a, b) in segments {
            let seg = ((b.x - a.x) as f64).hypot((b.y - a.y) as f64);
            if seg >= remaining && seg > 0.0 {
                let f = remaining / seg;
                return (
                    a.x as f64 + (b.x - a.x) as f64 * f,
                    a.y as f64 + (b.y - a.y) as f64 * f,
                );
            }
            remaining -= seg;
        }
        let last = self.points[self.points.len() - 1];
        (last.x as f64, last.y as f64)
    }
}

/// The resolved asset graph: every table the runtime reads, immutable after
/// load and referenced by index throughout.
#[derive(Debug)]
pub struct GameData {
    pub game_name: String,
    pub window_width: u32,
    pub window_height: u32,
    /// ROOM indices in execution order; the start room is the first entry.
    pub room_order: Vec<u32>,

    pub strings: Vec<String>,
    /// STRG entry file offsets, kept for diagnostics and round-trip checks.
    pub string_offsets: Vec<u32>,
    pub textures: Vec<TexturePage>,
    pub regions: Vec<TexturePageItem>,
    pub sprites: Vec<Sprite>,
    pub backgrounds: Vec<Background>,
    pub fonts: Vec<Font>,
    pub objects: Vec<Object>,
    pub rooms: Vec<Room>,
    pub code: Vec<CodeEntry>,
    /// One contiguous blob all code entries index into.
    pub code_blob: Vec<u8>,
    pub variables: Vec<VariableDef>,
    /// FUNC symbol table: call ids → names.
    pub functions: Vec<String>,
    pub scripts: Vec<Script>,
    /// Script name → script table index.
    pub script_by_name: HashMap<String, u32>,
    /// CODE entry index → script table index (for calls through FUNC).
    pub script_by_code: HashMap<u32, u32>,
    pub paths: Vec<PathAsset>,
}

impl GameData {
    /// Decode a container and resolve the asset graph.
    ///
    /// `bytes` is the full file contents (`game.unx`, `data.win`, or a PE
    /// executable with an embedded FORM blob).
    pub fn load(bytes: &[u8]) -> Result<Self> {
        let start = datawin::find_form(bytes).ok_or(FormatError::InvalidMagic {
            expected: *b"FORM",
            found: [
                bytes.first().copied().unwrap_or(0),
                bytes.get(1).copied().unwrap_or(0),
                bytes.get(2).copied().unwrap_or(0),
                bytes.get(3).copied().unwrap_or(0),
            ],
        })?;
        let data = &bytes[start..];
        let index = ChunkIndex::parse(data)?;

        let gen8 = gen8::Gen8::parse(index.chunk_data(data, b"GEN8")?)?;
        if !gen8.bytecode_version.is_supported() {
            return Err(FormatError::UnsupportedVersion {
                version: gen8.bytecode_version.0,
            }
            .into());
        }

        let strg_chunk = index.chunk_data(data, b"STRG")?;
        let strings = StringTable::parse(strg_chunk, data)?;

        let txtr = txtr::Txtr::parse(index.chunk_data(data, b"TXTR")?, data)?;
        let tpag = tpag::Tpag::parse(index.chunk_data(data, b"TPAG")?, data)?;
        let sprt = sprt::Sprt::parse(index.chunk_data(data, b"SPRT")?, data)?;
        let bgnd = bgnd::Bgnd::parse(index.chunk_data(data, b"BGND")?, data)?;
        let fonts_chunk = font::Font::parse(index.chunk_data(data, b"FONT")?, data)?;
        let objt = objt::Objt::parse(index.chunk_data(data, b"OBJT")?, data)?;
        let room_chunk = room::Room::parse(index.chunk_data(data, b"ROOM")?, data)?;
        let code_entry = index
            .find(b"CODE")
            .ok_or(FormatError::ChunkNotFound { magic: *b"CODE" })?;
        let code_chunk = code::Code::parse(
            index.chunk_data(data, b"CODE")?,
            code_entry.data_offset(),
        )?;
        let vari = vari::Vari::parse(index.chunk_data(data, b"VARI")?)?;
        let func = func::Func::parse(index.chunk_data(data, b"FUNC")?)?;
        let scpt = scpt::Scpt::parse(index.chunk_data(data, b"SCPT")?, data)?;
        let paths_chunk = path::Path::parse(index.chunk_data(data, b"PATH")?, data)?;

        let resolve = |sref: datawin::string_table::StringRef| -> Result<String> {
            Ok(strings.resolve(sref)?.to_string())
        };

        // Texture pages: decoded from PNG eagerly, uploaded to the GPU
        // lazily by the renderer.
        let mut textures = Vec::with_capacity(txtr.textures.len());
        for i in 0..txtr.textures.len() {
            let raw = txtr.texture_data(i, data).ok_or(RuntimeError::AssetRef {
                context: "TXTR page data",
                index: i as i64,
            })?;
            textures.push(decode_png(raw, i)?);
        }

        let region_index = tpag.index_by_address();
        let lookup_region = |addr: u32, context: &'static str| -> Result<u32> {
            region_index
                .get(&addr)
                .copied()
                .ok_or(RuntimeError::AssetRef {
                    context,
                    index: addr as i64,
                })
        };
        for (i, item) in tpag.items.iter().enumerate() {
            if item.texture_page as usize >= textures.len() {
                return Err(RuntimeError::AssetRef {
                    context: "TPAG texture page",
                    index: i as i64,
                });
            }
        }

        let mut sprites = Vec::with_capacity(sprt.sprites.len());
        for entry in &sprt.sprites {
            let mut frames = Vec::with_capacity(entry.frame_addrs.len());
            for &addr in &entry.frame_addrs {
                frames.push(lookup_region(addr, "SPRT frame region")?);
            }
            sprites.push(Sprite {
                name: resolve(entry.name)?,
                width: entry.width,
                height: entry.height,
                origin_x: entry.origin_x,
                origin_y: entry.origin_y,
                bbox_left: entry.bbox_left,
                bbox_right: entry.bbox_right,
                bbox_top: entry.bbox_top,
                bbox_bottom: entry.bbox_bottom,
                mask_kind: entry.sep_masks,
                frames,
            });
        }

        let mut backgrounds = Vec::with_capacity(bgnd.backgrounds.len());
        for entry in &bgnd.backgrounds {
            backgrounds.push(Background {
                name: resolve(entry.name)?,
                transparent: entry.transparent,
                region: lookup_region(entry.texture_addr, "BGND texture region")?,
            });
        }

        let mut fonts = Vec::with_capacity(fonts_chunk.fonts.len());
        for entry in &fonts_chunk.fonts {
            let glyphs = entry
                .glyphs
                .iter()
                .map(|g| (g.character as u32, g.clone()))
                .collect();
            fonts.push(Font {
                name: resolve(entry.name)?,
                size: entry.size,
                region: lookup_region(entry.texture_addr, "FONT texture region")?,
                glyphs,
            });
        }

        let mut objects = Vec::with_capacity(objt.objects.len());
        for entry in &objt.objects {
            let mut events = HashMap::new();
            for (kind, subtype_entries) in entry.events.iter().enumerate() {
                for ev in subtype_entries {
                    for &code_id in &ev.code_ids {
                        if code_id as usize >= code_chunk.entries.len() {
                            return Err(RuntimeError::AssetRef {
                                context: "OBJT event code",
                                index: code_id as i64,
                            });
                        }
                    }
                    events.insert((kind as u32, ev.subtype), ev.code_ids.clone());
                }
            }
            objects.push(Object {
                name: resolve(entry.name)?,
                sprite_index: entry.sprite_index,
                visible: entry.visible,
                solid: entry.solid,
                persistent: entry.persistent,
                depth: entry.depth,
                parent_index: entry.parent_index,
                mask_index: entry.mask_index,
                events,
            });
        }
        for (i, obj) in objects.iter().enumerate() {
            if obj.parent_index >= 0 && obj.parent_index as usize >= objects.len() {
                return Err(RuntimeError::AssetRef {
                    context: "OBJT parent",
                    index: i as i64,
                });
            }
        }

        let mut rooms = Vec::with_capacity(room_chunk.rooms.len());
        for entry in room_chunk.rooms {
            rooms.push(Room {
                name: resolve(entry.name)?,
                caption: resolve(entry.caption)?,
                width: entry.width,
                height: entry.height,
                speed: entry.speed,
                persistent: entry.persistent,
                background_color: entry.background_color,
                draw_background_color: entry.draw_background_color,
                creation_code: entry.creation_code,
                views_enabled: entry.flags & 1 != 0,
                backgrounds: entry.backgrounds,
                views: entry.views,
                instances: entry.instances,
                tiles: entry.tiles,
            });
        }

        // Rebase code entry offsets onto a single contiguous blob.
        let blob_start = code_chunk
            .entries
            .iter()
            .map(|e| e.bytecode_offset)
            .min()
            .unwrap_or(0);
        let blob_end = code_chunk
            .entries
            .iter()
            .map(|e| e.bytecode_offset + e.length as usize)
            .max()
            .unwrap_or(0);
        if blob_end > data.len() {
            return Err(RuntimeError::AssetRef {
                context: "CODE bytecode span",
                index: blob_end as i64,
            });
        }
        let code_blob = data[blob_start..blob_end].to_vec();
        let mut code = Vec::with_capacity(code_chunk.entries.len());
        for entry in &code_chunk.entries {
            code.push(CodeEntry {
                name: resolve(entry.name)?,
                arg_count: entry.arg_count(),
                locals_count: entry.locals_count,
                offset: entry.bytecode_offset - blob_start,
                length: entry.length as usize,
            });
        }

        let mut variables = Vec::with_capacity(vari.variables.len());
        for entry in &vari.variables {
            variables.push(VariableDef {
                name: resolve(entry.name)?,
                scope: entry.instance_type,
            });
        }

        let mut functions = Vec::with_capacity(func.functions.len());
        for entry in &func.functions {
            functions.push(resolve(entry.name)?);
        }

        let mut scripts = Vec::with_capacity(scpt.scripts.len());
        let mut script_by_name = HashMap::new();
        let mut script_by_code = HashMap::new();
        for (i, entry) in scpt.scripts.iter().enumerate() {
            if entry.code_id as usize >= code.len() {
                return Err(RuntimeError::AssetRef {
                    context: "SCPT code entry",
                    index: entry.code_id as i64,
                });
            }
            let name = resolve(entry.name)?;
            script_by_name.insert(name.clone(), i as u32);
            script_by_code.insert(entry.code_id, i as u32);
            scripts.push(Script {
                name,
                code_id: entry.code_id,
            });
        }

        let mut paths = Vec::with_capacity(paths_chunk.paths.len());
        for entry in paths_chunk.paths {
            paths.push(PathAsset {
                name: resolve(entry.name)?,
                closed: entry.closed,
                precision: entry.precision,
                points: entry.points,
            });
        }

        Ok(Self {
            game_name: resolve(gen8.display_name).or_else(|_| resolve(gen8.name))?,
            window_width: gen8.default_window_width,
            window_height: gen8.default_window_height,
            room_order: gen8.room_order,
            string_offsets: strings.offsets().to_vec(),
            strings: strings.strings().to_vec(),
            textures,
            regions: tpag.items,
            sprites,
            backgrounds,
            fonts,
            objects,
            rooms,
            code,
            code_blob,
            variables,
            functions,
            scripts,
            script_by_name,
            script_by_code,
            paths,
        })
    }

    /// Bytecode bytes for a code entry.
    pub fn bytecode(&self, code_index: u32) -> Option<&[u8]> {
        let entry = self.code.get(code_index as usize)?;
        self.code_blob.get(entry.offset..entry.offset + entry.length)
    }

    /// Whether object `child` is `ancestor` or inherits from it.
    pub fn object_is_ancestor(&self, child: i32, ancestor: i32) -> bool {
        let mut cur = child;
        let mut hops = 0;
        while cur >= 0 && hops < self.objects.len() + 1 {
            if cur == ancestor {
                return true;
            }
            cur = match self.objects.get(cur as usize) {
                Some(o) => o.parent_index,
                None => return false,
            };
            hops += 1;
        }
        false
    }

    /// Resolve an event handler by walking `object_index`'s parent chain.
    /// Returns the code entries and the object index they were found on.
    pub fn resolve_event(
        &self,
        object_index: i32,
        kind: u32,
        subtype: u32,
    ) -> Option<(&[u32], i32)> {
        let mut cur = object_index;
        let mut hops = 0;
        while cur >= 0 && hops < self.objects.len() + 1 {
            let obj = self.objects.get(cur as usize)?;
            if let Some(codes) = obj.event(kind, subtype) {
                return Some((codes, cur));
            }
            cur = obj.parent_index;
            hops += 1;
        }
        None
    }

    /// Room index by name.
    pub fn room_by_name(&self, name: &str) -> Option<u32> {
        self.rooms.iter().position(|r| r.name == name).map(|i| i as u32)
    }

    /// Object index by name.
    pub fn object_by_name(&self, name: &str) -> Option<u32> {
        self.objects
            .iter()
            .position(|o| o.name == name)
            .map(|i| i as u32)
    }
}

/// Decode a PNG texture page into RGBA8.
fn decode_png(raw: &[u8], page: usize) -> Result<TexturePage> {
    let decoder = png::Decoder::new(raw);
    let mut reader = decoder.read_info().map_err(|_| RuntimeError::AssetRef {
        context: "TXTR PNG header",
        index: page as i64,
    })?;
    let mut buf = vec![0u8; reader.output_buffer_size()];
    let info = reader
        .next_frame(&mut buf)
        .map_err(|_| RuntimeError::AssetRef {
            context: "TXTR PNG frame",
            index: page as i64,
        })?;
    buf.truncate(info.buffer_size());

    let rgba = match info.color_type {
        png::ColorType::Rgba => buf,
        png::ColorType::Rgb => {
            let mut out = Vec::with_capacity(buf.len() / 3 * 4);
            for px in buf.chunks_exact(3) {
                out.extend_from_slice(&[px[0], px[1], px[2], 255]);
            }
            out
        }
        png::ColorType::Grayscale => {
            let mut out = Vec::with_capacity(buf.len() * 4);
            for &g in &buf {
                out.extend_from_slice(&[g, g, g, 255]);
            }
            out
        }
        _ => {
            return Err(RuntimeError::AssetRef {
                context: "TXTR PNG color type",
                index: page as i64,
            })
        }
    };

    Ok(TexturePage {
        width: info.width,
        height: info.height,
        rgba,
    })
}
