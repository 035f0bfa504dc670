//! Draw helpers shared by the default draw walk and the drawing built-ins.
//!
//! Texture pages upload to the renderer on first use, cached by page index.

use crate::render::{Blend, Quad, HALIGN_CENTER, HALIGN_RIGHT, VALIGN_BOTTOM, VALIGN_MIDDLE};
use crate::runtime::Runtime;

/// Upload a texture page if the renderer does not hold it yet.
pub fn ensure_page(rt: &mut Runtime, page: u32) {
    if rt.renderer.has_texture(page) {
        return;
    }
    let data = rt.data.clone();
    if let Some(tex) = data.textures.get(page as usize) {
        rt.renderer
            .upload_texture(page, tex.width, tex.height, &tex.rgba);
    }
}

/// Draw a texture region at (x, y) with scaling and rotation about (x, y).
///
/// The region's target offsets reposition the trimmed rectangle inside the
/// original frame, so the visible pixels land where the untrimmed sprite
/// would have put them.
#[allow(clippy::too_many_arguments)]
pub fn draw_region(
    rt: &mut Runtime,
    region_index: u32,
    x: f64,
    y: f64,
    xscale: f64,
    yscale: f64,
    angle: f64,
    blend: Blend,
) {
    let data = rt.data.clone();
    let Some(region) = data.regions.get(region_index as usize) else {
        return;
    };
    ensure_page(rt, region.texture_page as u32);
    rt.renderer.draw_quad(&Quad {
        page: region.texture_page as u32,
        src_x: region.source_x as f32,
        src_y: region.source_y as f32,
        src_w: region.source_width as f32,
        src_h: region.source_height as f32,
        x: (x + region.target_x as f64 * xscale) as f32,
        y: (y + region.target_y as f64 * yscale) as f32,
        xscale: xscale as f32,
        yscale: yscale as f32,
        angle: angle as f32,
        pivot_x: x as f32,
        pivot_y: y as f32,
        blend,
    });
}

/// Draw one frame of a sprite, origin-adjusted, modulated by blend state.
#[allow(clippy::too_many_arguments)]
pub fn draw_sprite(
    rt: &mut Runtime,
    sprite_index: i32,
    frame: i64,
    x: f64,
    y: f64,
    xscale: f64,
    yscale: f64,
    angle: f64,
    color: u32,
    alpha: f64,
) {
    let data = rt.data.clone();
    let Some(sprite) = usize::try_from(sprite_index)
        .ok()
        .and_then(|i| data.sprites.get(i))
    else {
        return;
    };
    let count = sprite.frames.len() as i64;
    if count == 0 {
        return;
    }
    let region = sprite.frames[frame.rem_euclid(count) as usize];
    // The rotation pivot is the instance position; the sprite's top-left sits
    // origin-back from it.
    let ox = x - sprite.origin_x as f64 * xscale;
    let oy = y - sprite.origin_y as f64 * yscale;
    let blend = Blend::from_gml(color, alpha);
    let data2 = rt.data.clone();
    let Some(reg) = data2.regions.get(region as usize) else {
        return;
    };
    ensure_page(rt, reg.texture_page as u32);
    rt.renderer.draw_quad(&Quad {
        page: reg.texture_page as u32,
        src_x: reg.source_x as f32,
        src_y: reg.source_y as f32,
        src_w: reg.source_width as f32,
        src_h: reg.source_height as f32,
        x: (ox + reg.target_x as f64 * xscale) as f32,
        y: (oy + reg.target_y as f64 * yscale) as f32,
        xscale: xscale as f32,
        yscale: yscale as f32,
        angle: angle as f32,
        pivot_x: x as f32,
        pivot_y: y as f32,
        blend,
    });
}

/// Measured size of a laid-out string under the current font: (width,
/// height). Multi-line strings wrap only on explicit newlines.
pub fn measure_string(rt: &Runtime, text: &str) -> (f64, f64) {
    let Some(font) = usize::try_from(rt.draw.font)
        .ok()
        .and_then(|i| rt.data.fonts.get(i))
    else {
        return (0.0, 0.0);
    };
    let line_height = font
        .glyphs
        .values()
        .map(|g| g.height as f64)
        .fold(0.0, f64::max)
        .max(font.size as f64);

    let mut max_width: f64 = 0.0;
    let mut lines = 0;
    for line in text.split('\n') {
        lines += 1;
        let width: f64 = line
            .chars()
            .filter_map(|ch| font.glyphs.get(&(ch as u32)))
            .map(|g| g.shift as f64)
            .sum();
        max_width = max_width.max(width);
    }
    (max_width, lines as f64 * line_height)
}

/// Draw text at (x, y) under the current draw state (font, color, alpha,
/// halign/valign).
pub fn draw_text(rt: &mut Runtime, x: f64, y: f64, text: &str) {
    let data = rt.data.clone();
    let Some(font) = usize::try_from(rt.draw.font)
        .ok()
        .and_then(|i| data.fonts.get(i))
    else {
        rt.warn_once("draw_text", "no font set".into());
        return;
    };
    let Some(region) = data.regions.get(font.region as usize) else {
        return;
    };
    let page = region.texture_page as u32;
    ensure_page(rt, page);

    let (_, total_h) = measure_string(rt, text);
    let line_height = if text.is_empty() {
        0.0
    } else {
        total_h / text.split('\n').count() as f64
    };

    // Alignment shifts the origin by the measured extent before emission.
    let base_y = match rt.draw.valign {
        VALIGN_MIDDLE => y - total_h / 2.0,
        VALIGN_BOTTOM => y - total_h,
        _ => y,
    };
    let blend = Blend::from_gml(rt.draw.color, rt.draw.alpha);

    for (line_no, line) in text.split('\n').enumerate() {
        let line_w: f64 = line
            .chars()
            .filter_map(|ch| font.glyphs.get(&(ch as u32)))
            .map(|g| g.shift as f64)
            .sum();
        let mut pen_x = match rt.draw.halign {
            HALIGN_CENTER => x - line_w / 2.0,
            HALIGN_RIGHT => x - line_w,
            _ => x,
        };
        let pen_y = base_y + line_no as f64 * line_height;

        for ch in line.chars() {
            let Some(glyph) = font.glyphs.get(&(ch as u32)) else {
                continue;
            };
            rt.renderer.draw_quad(&Quad {
                page,
                src_x: (region.source_x + glyph.x) as f32,
                src_y: (region.source_y + glyph.y) as f32,
                src_w: glyph.width as f32,
                src_h: glyph.height as f32,
                x: (pen_x + glyph.offset as f64) as f32,
                y: pen_y as f32,
                xscale: 1.0,
                yscale: 1.0,
                angle: 0.0,
                pivot_x: pen_x as f32,
                pivot_y: pen_y as f32,
                blend,
            });
            pen_x += glyph.shift as f64;
        }
    }
}

/// Draw a background image, optionally tiled across the room.
pub fn draw_background(rt: &mut Runtime, background_index: i32, x: f64, y: f64, tile_x: bool, tile_y: bool) {
    let data = rt.data.clone();
    let Some(bg) = usize::try_from(background_index)
        .ok()
        .and_then(|i| data.backgrounds.get(i))
    else {
        return;
    };
    let Some(region) = data.regions.get(bg.region as usize) else {
        return;
    };
    let w = region.source_width as f64;
    let h = region.source_height as f64;
    if w <= 0.0 || h <= 0.0 {
        return;
    }

    let room_w = rt.room.width as f64;
    let room_h = rt.room.height as f64;
    let xs: Vec<f64> = if tile_x {
        let mut start = x % w;
        if start > 0.0 {
            start -= w;
        }
        let mut v = Vec::new();
        let mut cx = start;
        while cx < room_w {
            v.push(cx);
            cx += w;
        }
        v
    } else {
        vec![x]
    };
    let ys: Vec<f64> = if tile_y {
        let mut start = y % h;
        if start > 0.0 {
            start -= h;
        }
        let mut v = Vec::new();
        let mut cy = start;
        while cy < room_h {
            v.push(cy);
            cy += h;
        }
        v
    } else {
        vec![y]
    };

    for &cy in &ys {
        for &cx in &xs {
            draw_region(rt, bg.region, cx, cy, 1.0, 1.0, 0.0, Blend::WHITE);
        }
    }
}
