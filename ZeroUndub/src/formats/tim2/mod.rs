//! TIM2 textures
//!
//! Only single-picture files are handled. Layout:
//!
//! ```text
//! 0x00  "TIM2"  version:u16  pictures:u16  reserved[8]
//! 0x10  picture header (48 bytes)
//! 0x40  pixel data, then CLUT
//! ```
//!
//! Bytes past the picture's total length are kept verbatim.

mod palette;
mod recolor;
mod roi;

use std::fs::File;
use std::io::{BufWriter, Cursor, Read, Write};
use std::path::Path;

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use image::{ImageBuffer, RgbaImage};

use crate::error::{Error, Result};

pub use palette::{deinterleave, interleave_map, reinterleave};
pub use recolor::{PaletteRecolorer, RecolorStats};
pub use roi::{Roi, TITLE_ROI};

/// "TIM2" file signature
pub const TIM2_SIGNATURE: &[u8; 4] = b"TIM2";
/// File header size
pub const FILE_HEADER_SIZE: usize = 16;
/// Picture header size
pub const PICTURE_HEADER_SIZE: usize = 48;
/// Smallest file accepted
const MIN_FILE_SIZE: usize = 56;

/// An RGBA color as stored in a CLUT
pub type Rgba = [u8; 4];

/// TIM2 pixel-size codes mapped to bits per pixel
const BPP_CODES: [(u8, u8); 5] = [(1, 16), (2, 24), (3, 32), (4, 4), (5, 8)];

/// CLUT format bit marking a linear (non-interleaved) palette
const LINEAR_PALETTE_FLAG: u8 = 0x80;

fn bpp_from_code(code: u8) -> u8 {
    BPP_CODES
        .iter()
        .find(|(c, _)| *c == code)
        .map_or(code, |(_, bpp)| *bpp)
}

fn code_from_bpp(bpp: u8) -> u8 {
    BPP_CODES
        .iter()
        .find(|(_, b)| *b == bpp)
        .map_or(bpp, |(code, _)| *code)
}

/// The 48-byte picture header
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PictureHeader {
    pub total_length: u32,
    pub palette_length: u32,
    pub data_length: u32,
    pub header_length: u16,
    pub color_entries: u16,
    pub image_format: u8,
    pub mipmap_count: u8,
    /// CLUT format without the linear flag
    pub clut_format: u8,
    /// Palette stored in linear order rather than interleaved
    pub linear_palette: bool,
    /// Bits per pixel (decoded from the on-disk code)
    pub bpp: u8,
    pub width: u16,
    pub height: u16,
    pub gs_tex0: u64,
    pub gs_tex1: u64,
    pub gs_regs: u32,
    pub gs_tex_clut: u32,
}

impl PictureHeader {
    fn read<R: Read>(reader: &mut R) -> Result<Self> {
        let total_length = reader.read_u32::<LittleEndian>()?;
        let palette_length = reader.read_u32::<LittleEndian>()?;
        let data_length = reader.read_u32::<LittleEndian>()?;
        let header_length = reader.read_u16::<LittleEndian>()?;
        let color_entries = reader.read_u16::<LittleEndian>()?;
        let image_format = reader.read_u8()?;
        let mipmap_count = reader.read_u8()?;
        let clut = reader.read_u8()?;
        let bpp = bpp_from_code(reader.read_u8()?);

        Ok(Self {
            total_length,
            palette_length,
            data_length,
            header_length,
            color_entries,
            image_format,
            mipmap_count,
            clut_format: clut & !LINEAR_PALETTE_FLAG,
            linear_palette: clut & LINEAR_PALETTE_FLAG != 0,
            bpp,
            width: reader.read_u16::<LittleEndian>()?,
            height: reader.read_u16::<LittleEndian>()?,
            gs_tex0: reader.read_u64::<LittleEndian>()?,
            gs_tex1: reader.read_u64::<LittleEndian>()?,
            gs_regs: reader.read_u32::<LittleEndian>()?,
            gs_tex_clut: reader.read_u32::<LittleEndian>()?,
        })
    }

    fn write<W: Write>(&self, writer: &mut W) -> Result<()> {
        let clut = self.clut_format | if self.linear_palette { LINEAR_PALETTE_FLAG } else { 0 };

        writer.write_u32::<LittleEndian>(self.total_length)?;
        writer.write_u32::<LittleEndian>(self.palette_length)?;
        writer.write_u32::<LittleEndian>(self.data_length)?;
        writer.write_u16::<LittleEndian>(self.header_length)?;
        writer.write_u16::<LittleEndian>(self.color_entries)?;
        writer.write_u8(self.image_format)?;
        writer.write_u8(self.mipmap_count)?;
        writer.write_u8(clut)?;
        writer.write_u8(code_from_bpp(self.bpp))?;
        writer.write_u16::<LittleEndian>(self.width)?;
        writer.write_u16::<LittleEndian>(self.height)?;
        writer.write_u64::<LittleEndian>(self.gs_tex0)?;
        writer.write_u64::<LittleEndian>(self.gs_tex1)?;
        writer.write_u32::<LittleEndian>(self.gs_regs)?;
        writer.write_u32::<LittleEndian>(self.gs_tex_clut)?;
        Ok(())
    }

    /// Number of pixels
    #[must_use]
    pub fn pixel_count(&self) -> usize {
        usize::from(self.width) * usize::from(self.height)
    }
}

/// A parsed single-picture TIM2 file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tim2Image {
    pub version: u16,
    pub reserved: [u8; 8],
    pub header: PictureHeader,
    /// Raw pixel data (`data_length` bytes)
    pub pixels: Vec<u8>,
    /// Raw CLUT in stored order (`palette_length` bytes)
    pub palette: Vec<u8>,
    /// Bytes after the picture, preserved on write
    pub trailing: Vec<u8>,
}

impl Tim2Image {
    /// Parse a TIM2 file from bytes.
    ///
    /// # Errors
    /// Returns [`Error::InvalidTexture`] for short files, a bad signature,
    /// more or fewer than one picture, or a body that disagrees with the
    /// picture header.
    pub fn parse(data: &[u8]) -> Result<Self> {
        if data.len() < MIN_FILE_SIZE {
            return Err(Error::invalid_texture(format!(
                "{} bytes is too small for a TIM2 header",
                data.len()
            )));
        }
        if &data[0..4] != TIM2_SIGNATURE {
            return Err(Error::invalid_texture("invalid TIM2 signature"));
        }

        let mut cursor = Cursor::new(data);
        cursor.set_position(4);
        let version = cursor.read_u16::<LittleEndian>()?;
        let pictures = cursor.read_u16::<LittleEndian>()?;
        if pictures != 1 {
            return Err(Error::invalid_texture(format!(
                "{pictures} pictures in file, exactly one is supported"
            )));
        }
        let mut reserved = [0u8; 8];
        cursor.read_exact(&mut reserved)?;

        let header = PictureHeader::read(&mut cursor)
            .map_err(|_| Error::invalid_texture("picture header is truncated"))?;

        let body_start = FILE_HEADER_SIZE + PICTURE_HEADER_SIZE;
        let body_len = (header.total_length as usize)
            .checked_sub(PICTURE_HEADER_SIZE)
            .ok_or_else(|| Error::invalid_texture("picture length is smaller than its header"))?;
        let body = data
            .get(body_start..body_start + body_len)
            .ok_or_else(|| Error::invalid_texture("picture body is truncated"))?;

        let data_length = header.data_length as usize;
        if data_length > body.len() {
            return Err(Error::invalid_texture("pixel data overruns the picture"));
        }
        let (pixels, palette) = body.split_at(data_length);
        if palette.len() != header.palette_length as usize {
            return Err(Error::invalid_texture(format!(
                "palette holds {} bytes, header declares {}",
                palette.len(),
                header.palette_length
            )));
        }

        Ok(Self {
            version,
            reserved,
            pixels: pixels.to_vec(),
            palette: palette.to_vec(),
            trailing: data[body_start + body_len..].to_vec(),
            header,
        })
    }

    /// Read a TIM2 file from disk
    pub fn read<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut buffer = Vec::new();
        File::open(path)?.read_to_end(&mut buffer)?;
        Self::parse(&buffer)
    }

    /// Serialize back to the on-disk form
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut out = Vec::with_capacity(
            FILE_HEADER_SIZE
                + PICTURE_HEADER_SIZE
                + self.pixels.len()
                + self.palette.len()
                + self.trailing.len(),
        );
        out.extend_from_slice(TIM2_SIGNATURE);
        out.write_u16::<LittleEndian>(self.version)?;
        out.write_u16::<LittleEndian>(1)?;
        out.extend_from_slice(&self.reserved);
        self.header.write(&mut out)?;
        out.extend_from_slice(&self.pixels);
        out.extend_from_slice(&self.palette);
        out.extend_from_slice(&self.trailing);
        Ok(out)
    }

    #[must_use]
    pub fn width(&self) -> usize {
        usize::from(self.header.width)
    }

    #[must_use]
    pub fn height(&self) -> usize {
        usize::from(self.header.height)
    }

    /// The CLUT as colors, in linear order
    #[must_use]
    pub fn linear_palette(&self) -> Vec<Rgba> {
        let colors: Vec<Rgba> = self
            .palette
            .chunks_exact(4)
            .map(|c| [c[0], c[1], c[2], c[3]])
            .collect();

        if self.header.linear_palette {
            colors
        } else {
            deinterleave(&colors)
        }
    }

    /// Expand every pixel to RGBA.
    ///
    /// Indexed pictures (4 and 8 bits per pixel) need a 32-bit CLUT; direct
    /// color pictures are decoded as stored.
    ///
    /// # Errors
    /// Returns [`Error::InvalidTexture`] for unsupported pixel formats or
    /// pixel data shorter than the picture.
    pub fn rgba_pixels(&self) -> Result<Vec<Rgba>> {
        let count = self.header.pixel_count();
        let short = || Error::invalid_texture("pixel data is shorter than the picture");

        match self.header.bpp {
            8 => {
                let palette = self.linear_palette();
                let indices = self.pixels.get(..count).ok_or_else(short)?;
                indices
                    .iter()
                    .map(|&i| palette.get(usize::from(i)).copied())
                    .collect::<Option<Vec<_>>>()
                    .ok_or_else(|| Error::invalid_texture("pixel index past the end of the CLUT"))
            }
            4 => {
                let palette = self.linear_palette();
                let bytes = self.pixels.get(..count.div_ceil(2)).ok_or_else(short)?;
                bytes
                    .iter()
                    .flat_map(|b| [b & 0x0F, b >> 4])
                    .take(count)
                    .map(|i| palette.get(usize::from(i)).copied())
                    .collect::<Option<Vec<_>>>()
                    .ok_or_else(|| Error::invalid_texture("pixel index past the end of the CLUT"))
            }
            32 => Ok(self
                .pixels
                .get(..count * 4)
                .ok_or_else(short)?
                .chunks_exact(4)
                .map(|c| [c[0], c[1], c[2], c[3]])
                .collect()),
            24 => Ok(self
                .pixels
                .get(..count * 3)
                .ok_or_else(short)?
                .chunks_exact(3)
                .map(|c| [c[0], c[1], c[2], 0x80])
                .collect()),
            16 => Ok(self
                .pixels
                .get(..count * 2)
                .ok_or_else(short)?
                .chunks_exact(2)
                .map(|c| {
                    let v = u16::from_le_bytes([c[0], c[1]]);
                    let expand = |bits: u16| ((bits & 0x1F) << 3) as u8;
                    let alpha = if v & 0x8000 != 0 { 0x80 } else { 0 };
                    [expand(v), expand(v >> 5), expand(v >> 10), alpha]
                })
                .collect()),
            other => Err(Error::invalid_texture(format!(
                "unsupported pixel size {other}"
            ))),
        }
    }

    /// Render to an RGBA image.
    ///
    /// GS alpha tops out at 0x80 for opaque, so alpha is doubled.
    pub fn to_rgba_image(&self) -> Result<RgbaImage> {
        let raw: Vec<u8> = self
            .rgba_pixels()?
            .into_iter()
            .flat_map(|[r, g, b, a]| [r, g, b, a.saturating_mul(2)])
            .collect();

        ImageBuffer::from_raw(u32::from(self.header.width), u32::from(self.header.height), raw)
            .ok_or_else(|| Error::invalid_texture("failed to create image buffer"))
    }

    /// Encode as PNG
    pub fn to_png_bytes(&self) -> Result<Vec<u8>> {
        let mut png_data = Vec::new();
        let encoder = image::codecs::png::PngEncoder::new(&mut png_data);
        self.to_rgba_image()?.write_with_encoder(encoder)?;
        Ok(png_data)
    }

    /// Write as a PNG file
    pub fn save_png<P: AsRef<Path>>(&self, png_path: P) -> Result<()> {
        let png_data = self.to_png_bytes()?;

        let mut output = BufWriter::new(File::create(png_path.as_ref())?);
        output.write_all(&png_data)?;
        output.flush()?;
        Ok(())
    }
}

/// Convert TIM2 bytes to PNG bytes
pub fn tim2_bytes_to_png_bytes(data: &[u8]) -> Result<Vec<u8>> {
    Tim2Image::parse(data)?.to_png_bytes()
}

/// Convert a TIM2 file to PNG
pub fn convert_tim2_to_png<P: AsRef<Path>, Q: AsRef<Path>>(tim2_path: P, png_path: Q) -> Result<()> {
    Tim2Image::read(tim2_path)?.save_png(png_path)
}
