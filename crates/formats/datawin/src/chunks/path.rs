use crate::cursor::Cursor;
use crate::error::Result;
use crate::string_table::StringRef;

/// A point on a path polyline.
#[derive(Debug, Clone, Copy)]
pub struct PathPoint {
    pub x: f32,
    pub y: f32,
    /// Per-point speed factor (percent of the follower's speed).
    pub speed: f32,
}

/// A path entry in the PATH chunk.
#[derive(Debug)]
pub struct PathEntry {
    /// Reference to the path name string.
    pub name: StringRef,
    /// Whether the path is smoothed (curved interpolation).
    pub smooth: bool,
    /// Whether the last point connects back to the first.
    pub closed: bool,
    /// Smoothing precision.
    pub precision: u32,
    /// Polyline points in order.
    pub points: Vec<PathPoint>,
}

/// Parsed PATH chunk.
#[derive(Debug)]
pub struct Path {
    pub paths: Vec<PathEntry>,
}

impl Path {
    /// Parse the PATH chunk.
    pub fn parse(chunk_data: &[u8], data: &[u8]) -> Result<Self> {
        let mut c = Cursor::new(chunk_data);
        let pointers = c.read_pointer_list()?;

        let mut paths = Vec::with_capacity(pointers.len());
        for ptr in pointers {
            let mut pc = Cursor::new(data);
            pc.seek(ptr as usize);

            let name = StringRef(pc.read_u32()?);
            let smooth = pc.read_u32()? != 0;
            let closed = pc.read_u32()? != 0;
            let precision = pc.read_u32()?;
            let count = pc.read_u32()? as usize;

            let mut points = Vec::with_capacity(count);
            for _ in 0..count {
                points.push(PathPoint {
                    x: pc.read_f32()?,
                    y: pc.read_f32()?,
                    speed: pc.read_f32()?,
                });
            }

            paths.push(PathEntry {
                name,
                smooth,
                closed,
                precision,
                points,
            });
        }

        Ok(Self { paths })
    }
}
