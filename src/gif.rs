use std::{
    collections::HashMap,
    fs::File,
    io::{BufWriter, Write},
    path::Path,
    sync::atomic::{AtomicBool, Ordering},
};

use image::RgbaImage;

use crate::{
    constants::GIF_COMMENT,
    error::{Error, Result},
};

const MAX_DIMENSION: u32 = 0xffff;
const MAX_CODE_BITS: u8 = 12;
const MAX_CODES: u16 = 1 << MAX_CODE_BITS;
const MAX_SUB_BLOCK: usize = 255;

struct Frame {
    pixels: Vec<[u8; 3]>,
    delay_cs: u16,
}

/// A sequence of equally-sized frames exported as a GIF89a with a single
/// global palette. Alpha is discarded.
pub struct GifRecorder {
    width: u32,
    height: u32,
    frames: Vec<Frame>,
    comment: String,
}

impl GifRecorder {
    pub fn new(width: u32, height: u32) -> Result<Self> {
        if width == 0 || height == 0 {
            return Err(Error::ArgumentsBad("GIF dimensions must be non-zero"));
        }
        if width > MAX_DIMENSION {
            return Err(Error::GifImageTooLarge);
        }
        if height > MAX_DIMENSION {
            return Err(Error::GifImageTooTall);
        }
        Ok(Self {
            width,
            height,
            frames: Vec::new(),
            comment: GIF_COMMENT.to_string(),
        })
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn set_comment(&mut self, comment: &str) {
        self.comment = comment.to_string();
    }

    /// Appends a frame shown for `delay_ms` (stored in hundredths of a second).
    pub fn push_frame(&mut self, image: &RgbaImage, delay_ms: u32) -> Result<()> {
        if image.dimensions() != (self.width, self.height) {
            return Err(Error::GifFrameMismatch);
        }
        let pixels = image.pixels().map(|p| [p[0], p[1], p[2]]).collect();
        let delay_cs = (delay_ms / 10).min(u16::max_value() as u32) as u16;
        self.frames.push(Frame { pixels, delay_cs });
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn clear(&mut self) {
        self.frames.clear();
    }

    pub fn save<P: AsRef<Path>>(&self, path: P, cancel: &AtomicBool) -> Result<()> {
        let path = path.as_ref();
        let mut out = BufWriter::new(File::create(path)?);
        self.encode(&mut out, cancel)?;
        out.flush()?;
        log::info!(
            "Exported {} frame(s) to {}",
            self.frames.len(),
            path.display()
        );
        Ok(())
    }

    /// Writes the whole file. `cancel` is polled between frames.
    pub fn encode<W: Write>(&self, out: &mut W, cancel: &AtomicBool) -> Result<()> {
        if self.frames.is_empty() {
            return Err(Error::OperationNotActive);
        }

        let mut palette = Palette::default();
        let mut indexed = Vec::with_capacity(self.frames.len());
        for frame in &self.frames {
            if cancel.load(Ordering::Relaxed) {
                return Err(Error::GifCancelled);
            }
            let indices = frame
                .pixels
                .iter()
                .map(|&color| palette.index_of(color))
                .collect::<Result<Vec<u8>>>()?;
            indexed.push(indices);
        }

        out.write_all(b"GIF89a")?;
        self.write_screen_descriptor(out, &palette)?;
        palette.write(out)?;
        let animated = self.frames.len() > 1;
        if animated {
            write_loop_block(out)?;
        }
        if !self.comment.is_empty() {
            out.write_all(&[0x21, 0xfe])?;
            write_sub_blocks(out, self.comment.as_bytes())?;
        }

        for (frame, indices) in self.frames.iter().zip(&indexed) {
            if cancel.load(Ordering::Relaxed) {
                return Err(Error::GifCancelled);
            }
            if animated {
                let [lo, hi] = frame.delay_cs.to_le_bytes();
                out.write_all(&[0x21, 0xf9, 0x04, 0x00, lo, hi, 0x00, 0x00])?;
            }
            self.write_image_descriptor(out)?;
            let min_code_size = palette.bits.max(2);
            out.write_all(&[min_code_size])?;
            write_sub_blocks(out, &compress(indices, min_code_size))?;
        }

        out.write_all(&[0x3b])?;
        Ok(())
    }

    fn write_screen_descriptor<W: Write>(&self, out: &mut W, palette: &Palette) -> Result<()> {
        out.write_all(&(self.width as u16).to_le_bytes())?;
        out.write_all(&(self.height as u16).to_le_bytes())?;
        // global table present, 8 bits of color resolution, table size
        let flags = 0x80 | 0x70 | (palette.bits - 1);
        out.write_all(&[flags, 0x00, 0x00])?;
        Ok(())
    }

    fn write_image_descriptor<W: Write>(&self, out: &mut W) -> Result<()> {
        out.write_all(&[0x2c, 0x00, 0x00, 0x00, 0x00])?;
        out.write_all(&(self.width as u16).to_le_bytes())?;
        out.write_all(&(self.height as u16).to_le_bytes())?;
        out.write_all(&[0x00])?;
        Ok(())
    }
}

/// Global color table, grown by doubling from two entries.
struct Palette {
    colors: Vec<[u8; 3]>,
    bits: u8,
}

impl Default for Palette {
    fn default() -> Self {
        Self {
            colors: Vec::new(),
            bits: 1,
        }
    }
}

impl Palette {
    fn index_of(&mut self, color: [u8; 3]) -> Result<u8> {
        if let Some(i) = self.colors.iter().position(|&c| c == color) {
            return Ok(i as u8);
        }
        if self.colors.len() == 256 {
            return Err(Error::GifTooManyColors);
        }
        self.colors.push(color);
        while self.colors.len() > self.size() {
            self.bits += 1;
        }
        Ok((self.colors.len() - 1) as u8)
    }

    fn size(&self) -> usize {
        1 << self.bits
    }

    fn write<W: Write>(&self, out: &mut W) -> Result<()> {
        for color in &self.colors {
            out.write_all(color)?;
        }
        for _ in self.colors.len()..self.size() {
            out.write_all(&[0, 0, 0])?;
        }
        Ok(())
    }
}

fn write_loop_block<W: Write>(out: &mut W) -> Result<()> {
    out.write_all(&[0x21, 0xff, 0x0b])?;
    out.write_all(b"NETSCAPE2.0")?;
    // loop forever
    out.write_all(&[0x03, 0x01, 0x00, 0x00, 0x00])?;
    Ok(())
}

fn write_sub_blocks<W: Write>(out: &mut W, data: &[u8]) -> Result<()> {
    for chunk in data.chunks(MAX_SUB_BLOCK) {
        out.write_all(&[chunk.len() as u8])?;
        out.write_all(chunk)?;
    }
    out.write_all(&[0x00])?;
    Ok(())
}

struct BitWriter {
    bytes: Vec<u8>,
    buffer: u32,
    count: u8,
}

impl BitWriter {
    fn new() -> Self {
        Self {
            bytes: Vec::new(),
            buffer: 0,
            count: 0,
        }
    }

    fn push(&mut self, code: u16, size: u8) {
        self.buffer |= (code as u32) << self.count;
        self.count += size;
        while self.count >= 8 {
            self.bytes.push(self.buffer as u8);
            self.buffer >>= 8;
            self.count -= 8;
        }
    }

    fn finish(mut self) -> Vec<u8> {
        if self.count > 0 {
            self.bytes.push(self.buffer as u8);
        }
        self.bytes
    }
}

/// Variable-width LZW, emitting a clear code whenever the table fills.
fn compress(indices: &[u8], min_code_size: u8) -> Vec<u8> {
    let clear = 1u16 << min_code_size;
    let end = clear + 1;
    let mut bits = BitWriter::new();
    let mut table: HashMap<(u16, u8), u16> = HashMap::new();
    let mut next = end + 1;
    let mut size = min_code_size + 1;

    bits.push(clear, size);
    let mut rest = indices.iter();
    let mut prefix = match rest.next() {
        Some(&first) => first as u16,
        None => {
            bits.push(end, size);
            return bits.finish();
        }
    };

    for &k in rest {
        if let Some(&code) = table.get(&(prefix, k)) {
            prefix = code;
            continue;
        }
        bits.push(prefix, size);
        if next < MAX_CODES {
            table.insert((prefix, k), next);
            if next == 1 << size && size < MAX_CODE_BITS {
                size += 1;
            }
            next += 1;
        } else {
            bits.push(clear, size);
            table.clear();
            next = end + 1;
            size = min_code_size + 1;
        }
        prefix = k as u16;
    }
    bits.push(prefix, size);
    bits.push(end, size);
    bits.finish()
}
