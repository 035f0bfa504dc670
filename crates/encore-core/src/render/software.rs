use std::collections::HashMap;

use crate::render::{Blend, Quad, Renderer};

/// An uploaded texture page.
struct Page {
    width: u32,
    height: u32,
    rgba: Vec<u8>,
}

/// Active view projection: room-space source rectangle mapped to a
/// window-space port rectangle.
#[derive(Clone, Copy)]
struct View {
    view_x: f32,
    view_y: f32,
    scale_x: f32,
    scale_y: f32,
    port_x: f32,
    port_y: f32,
    clip_x1: i32,
    clip_y1: i32,
    clip_x2: i32,
    clip_y2: i32,
}

/// CPU rasterizer rendering into an RGBA backbuffer.
///
/// Quads are inverse-mapped with nearest sampling and source-over blending,
/// which keeps output byte-identical across runs for the deterministic
/// replay guarantee. Headless capture reads the backbuffer directly.
pub struct SoftwareRenderer {
    width: u32,
    height: u32,
    pixels: Vec<u8>,
    pages: HashMap<u32, Page>,
    view: View,
}

impl SoftwareRenderer {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            pixels: vec![0; (width * height * 4) as usize],
            pages: HashMap::new(),
            view: View {
                view_x: 0.0,
                view_y: 0.0,
                scale_x: 1.0,
                scale_y: 1.0,
                port_x: 0.0,
                port_y: 0.0,
                clip_x1: 0,
                clip_y1: 0,
                clip_x2: width as i32,
                clip_y2: height as i32,
            },
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    fn blend_pixel(&mut self, x: i32, y: i32, r: f32, g: f32, b: f32, a: f32) {
        blend_px(&mut self.pixels, self.width, self.view, x, y, r, g, b, a);
    }
}

/// Source-over blend of one pixel, clipped to the active port.
#[allow(clippy::too_many_arguments)]
fn blend_px(
    pixels: &mut [u8],
    fb_width: u32,
    view: View,
    x: i32,
    y: i32,
    r: f32,
    g: f32,
    b: f32,
    a: f32,
) {
    if a <= 0.0 || x < view.clip_x1 || y < view.clip_y1 || x >= view.clip_x2 || y >= view.clip_y2 {
        return;
    }
    let idx = ((y as u32 * fb_width + x as u32) * 4) as usize;
    let dst = &mut pixels[idx..idx + 4];
    let inv = 1.0 - a;
    dst[0] = (r * 255.0 * a + dst[0] as f32 * inv) as u8;
    dst[1] = (g * 255.0 * a + dst[1] as f32 * inv) as u8;
    dst[2] = (b * 255.0 * a + dst[2] as f32 * inv) as u8;
    dst[3] = ((a + dst[3] as f32 / 255.0 * inv) * 255.0) as u8;
}

/// Map room coordinates to window coordinates under a view.
fn project(view: View, x: f32, y: f32) -> (f32, f32) {
    (
        (x - view.view_x) * view.scale_x + view.port_x,
        (y - view.view_y) * view.scale_y + view.port_y,
    )
}

impl Renderer for SoftwareRenderer {
    fn has_texture(&self, page: u32) -> bool {
        self.pages.contains_key(&page)
    }

    fn upload_texture(&mut self, page: u32, width: u32, height: u32, rgba: &[u8]) {
        self.pages.insert(
            page,
            Page {
                width,
                height,
                rgba: rgba.to_vec(),
            },
        );
    }

    fn set_view(
        &mut self,
        view_x: f32,
        view_y: f32,
        view_w: f32,
        view_h: f32,
        port_x: i32,
        port_y: i32,
        port_w: i32,
        port_h: i32,
    ) {
        let scale_x = if view_w > 0.0 {
            port_w as f32 / view_w
        } else {
            1.0
        };
        let scale_y = if view_h > 0.0 {
            port_h as f32 / view_h
        } else {
            1.0
        };
        self.view = View {
            view_x,
            view_y,
            scale_x,
            scale_y,
            port_x: port_x as f32,
            port_y: port_y as f32,
            clip_x1: port_x.max(0),
            clip_y1: port_y.max(0),
            clip_x2: (port_x + port_w).min(self.width as i32),
            clip_y2: (port_y + port_h).min(self.height as i32),
        };
    }

    fn clear(&mut self, color: Blend) {
        let px = [
            (color.r * 255.0) as u8,
            (color.g * 255.0) as u8,
            (color.b * 255.0) as u8,
            (color.a * 255.0) as u8,
        ];
        for chunk in self.pixels.chunks_exact_mut(4) {
            chunk.copy_from_slice(&px);
        }
    }

    fn draw_quad(&mut self, quad: &Quad) {
        let view = self.view;
        let fb_width = self.width;
        let Some(page) = self.pages.get(&quad.page) else {
            return;
        };
        let pixels = &mut self.pixels;
        let page_w = page.width as i32;
        let page_h = page.height as i32;

        // Destination extent in window space.
        let dst_w = quad.src_w * quad.xscale * view.scale_x;
        let dst_h = quad.src_h * quad.yscale * view.scale_y;
        if dst_w == 0.0 || dst_h == 0.0 {
            return;
        }
        let (origin_x, origin_y) = project(view, quad.x, quad.y);
        let (pivot_x, pivot_y) = project(view, quad.pivot_x, quad.pivot_y);

        let angle = (-quad.angle).to_radians();
        let (sin, cos) = angle.sin_cos();

        // Corners of the destination rectangle rotated about the pivot.
        let corners = [
            (origin_x, origin_y),
            (origin_x + dst_w, origin_y),
            (origin_x, origin_y + dst_h),
            (origin_x + dst_w, origin_y + dst_h),
        ]
        .map(|(cx, cy)| {
            let dx = cx - pivot_x;
            let dy = cy - pivot_y;
            (pivot_x + dx * cos - dy * sin, pivot_y + dx * sin + dy * cos)
        });

        let min_x = corners.iter().map(|c| c.0).fold(f32::MAX, f32::min).floor() as i32;
        let max_x = corners.iter().map(|c| c.0).fold(f32::MIN, f32::max).ceil() as i32;
        let min_y = corners.iter().map(|c| c.1).fold(f32::MAX, f32::min).floor() as i32;
        let max_y = corners.iter().map(|c| c.1).fold(f32::MIN, f32::max).ceil() as i32;

        // Inverse mapping: window pixel → source texel. Negative scales flip
        // the sampling direction (the rectangle extends the other way from
        // the placement point).
        for wy in min_y..max_y {
            for wx in min_x..max_x {
                let px = wx as f32 + 0.5;
                let py = wy as f32 + 0.5;
                // Un-rotate about the pivot: the inverse of R(t) is R(-t).
                let dx = px - pivot_x;
                let dy = py - pivot_y;
                let ux = pivot_x + dx * cos + dy * sin;
                let uy = pivot_y - dx * sin + dy * cos;
                // Position within the unrotated rectangle, 0..1.
                let fx = (ux - origin_x) / dst_w;
                let fy = (uy - origin_y) / dst_h;
                if !(0.0..1.0).contains(&fx) || !(0.0..1.0).contains(&fy) {
                    continue;
                }
                let tx = quad.src_x as i32 + (fx * quad.src_w) as i32;
                let ty = quad.src_y as i32 + (fy * quad.src_h) as i32;
                if tx < 0 || ty < 0 || tx >= page_w || ty >= page_h {
                    continue;
                }
                let tidx = ((ty * page_w + tx) * 4) as usize;
                let texel = &page.rgba[tidx..tidx + 4];
                let a = texel[3] as f32 / 255.0 * quad.blend.a;
                if a <= 0.0 {
                    continue;
                }
                blend_px(
                    pixels,
                    fb_width,
                    view,
                    wx,
                    wy,
                    texel[0] as f32 / 255.0 * quad.blend.r,
                    texel[1] as f32 / 255.0 * quad.blend.g,
                    texel[2] as f32 / 255.0 * quad.blend.b,
                    a,
                );
            }
        }
    }

    fn draw_rect(&mut self, x1: f32, y1: f32, x2: f32, y2: f32, blend: Blend) {
        let (wx1, wy1) = project(self.view, x1.min(x2), y1.min(y2));
        let (wx2, wy2) = project(self.view, x1.max(x2), y1.max(y2));
        for wy in wy1.floor() as i32..wy2.ceil() as i32 {
            for wx in wx1.floor() as i32..wx2.ceil() as i32 {
                self.blend_pixel(wx, wy, blend.r, blend.g, blend.b, blend.a);
            }
        }
    }

    fn present(&mut self) {}

    fn framebuffer(&self) -> Option<(&[u8], u32, u32)> {
        Some((&self.pixels, self.width, self.height))
    }
}
