// ppm.rs — Binary PPM (P6) codec.
//
// Header grammar accepted by `read_ppm`:
//
//   "P6" <ws> [comments] <width> <ws> <height> <ws> <maxval> <one ws byte> <payload>
//
// where a comment is a '#' at the start of a token, running to end of line.
// maxval must be exactly 255 (one byte per sample). The payload is exactly
// width * height * 3 bytes of interleaved RGB, row-major, top to bottom.
//
// Decoding is strict and hand-rolled: the magic token and maxval checks are
// part of the tool's contract and must fail before any pixel is read.
// Encoding goes through `image`'s PNM encoder.

use std::fs::File;
use std::io::{self, BufRead, BufReader, BufWriter, Read, Write};
use std::path::Path;

use image::codecs::pnm::{PnmEncoder, PnmSubtype, SampleEncoding};
use image::{ExtendedColorType, ImageEncoder};

use crate::image::{Channels, PixelBuffer};

/// Magic token of a binary RGB pixmap.
pub const MAGIC: &str = "P6";

/// The only supported maximum sample value.
pub const MAX_VALUE: u32 = 255;

/// Errors from reading or writing a PPM file.
#[derive(Debug, thiserror::Error)]
pub enum PpmError {
    #[error("not a binary PPM file: expected magic \"P6\", found {0:?}")]
    BadMagic(String),

    #[error("unsupported max color value {0} (only 255 is supported)")]
    BadMaxValue(u32),

    #[error("malformed PPM header: invalid {field} {token:?}")]
    BadHeader { field: &'static str, token: String },

    #[error("image dimensions {width}×{height} are too large")]
    TooLarge { width: usize, height: usize },

    #[error("unexpected end of file while reading {0}")]
    UnexpectedEof(&'static str),

    #[error("truncated pixel data: expected {expected} bytes, found {found}")]
    Truncated { expected: usize, found: usize },

    #[error(transparent)]
    Io(#[from] io::Error),

    #[error("failed to encode PPM: {0}")]
    Encode(#[from] image::ImageError),
}

// ---------------------------------------------------------------------------
// Decoding
// ---------------------------------------------------------------------------

/// Read and decode a P6 file into an RGB [`PixelBuffer`].
pub fn load(path: impl AsRef<Path>) -> Result<PixelBuffer, PpmError> {
    let path = path.as_ref();
    let file = File::open(path)?;
    let img = read_ppm(&mut BufReader::new(file))?;
    tracing::debug!(path = %path.display(), width = img.width(), height = img.height(), "loaded PPM");
    Ok(img)
}

/// Decode a P6 stream into an RGB [`PixelBuffer`].
pub fn read_ppm<R: BufRead>(r: &mut R) -> Result<PixelBuffer, PpmError> {
    let (magic, _) = read_token(r, "magic token")?;
    if magic != MAGIC {
        return Err(PpmError::BadMagic(magic));
    }

    let width = parse_field(r, "width")?;
    let height = parse_field(r, "height")?;

    let (max_token, terminated) = read_token(r, "max color value")?;
    let max_value: u32 = max_token.parse().map_err(|_| PpmError::BadHeader {
        field: "max color value",
        token: max_token.clone(),
    })?;
    if max_value != MAX_VALUE {
        return Err(PpmError::BadMaxValue(max_value));
    }

    let expected = width
        .checked_mul(height)
        .and_then(|n| n.checked_mul(Channels::Rgb.count()))
        .ok_or(PpmError::TooLarge { width, height })?;

    // The whitespace byte that ended the max value token is the single
    // separator before the payload.
    if !terminated && expected > 0 {
        return Err(PpmError::Truncated { expected, found: 0 });
    }

    // Grow with the bytes actually present; `expected` comes from the header.
    let mut data = Vec::new();
    r.by_ref().take(expected as u64).read_to_end(&mut data)?;
    if data.len() != expected {
        return Err(PpmError::Truncated { expected, found: data.len() });
    }

    Ok(PixelBuffer::from_vec(width, height, Channels::Rgb, data))
}

fn parse_field<R: BufRead>(r: &mut R, field: &'static str) -> Result<usize, PpmError> {
    let (token, _) = read_token(r, field)?;
    token
        .parse()
        .map_err(|_| PpmError::BadHeader { field, token })
}

/// Read one whitespace-delimited header token, skipping leading whitespace
/// and '#' comments. Returns the token and whether a whitespace byte ended
/// it (that byte is consumed).
fn read_token<R: BufRead>(r: &mut R, what: &'static str) -> Result<(String, bool), PpmError> {
    let mut token = Vec::new();
    let terminated = loop {
        match next_byte(r)? {
            None => break false,
            Some(b'#') if token.is_empty() => skip_line(r)?,
            Some(b) if b.is_ascii_whitespace() => {
                if !token.is_empty() {
                    break true;
                }
            }
            Some(b) => token.push(b),
        }
    };
    if token.is_empty() {
        return Err(PpmError::UnexpectedEof(what));
    }
    Ok((String::from_utf8_lossy(&token).into_owned(), terminated))
}

fn skip_line<R: BufRead>(r: &mut R) -> io::Result<()> {
    let mut discard = Vec::new();
    r.read_until(b'\n', &mut discard)?;
    Ok(())
}

fn next_byte<R: BufRead>(r: &mut R) -> io::Result<Option<u8>> {
    let b = match r.fill_buf()?.first() {
        Some(&b) => b,
        None => return Ok(None),
    };
    r.consume(1);
    Ok(Some(b))
}

// ---------------------------------------------------------------------------
// Encoding
// ---------------------------------------------------------------------------

/// Encode an RGB [`PixelBuffer`] and write it to `path`.
pub fn save(img: &PixelBuffer, path: impl AsRef<Path>) -> Result<(), PpmError> {
    let path = path.as_ref();
    let mut w = BufWriter::new(File::create(path)?);
    write_ppm(img, &mut w)?;
    w.flush()?;
    tracing::debug!(path = %path.display(), width = img.width(), height = img.height(), "saved PPM");
    Ok(())
}

/// Encode an RGB [`PixelBuffer`] as P6 with max value 255.
///
/// # Panics
/// Panics if `img` is not RGB.
pub fn write_ppm<W: Write>(img: &PixelBuffer, w: &mut W) -> Result<(), PpmError> {
    assert_eq!(img.channels(), Channels::Rgb, "PPM output must be RGB");
    let (width, height) = dims_u32(img)?;
    PnmEncoder::new(w)
        .with_subtype(PnmSubtype::Pixmap(SampleEncoding::Binary))
        .write_image(img.as_bytes(), width, height, ExtendedColorType::Rgb8)?;
    Ok(())
}

fn dims_u32(img: &PixelBuffer) -> Result<(u32, u32), PpmError> {
    let too_large = || PpmError::TooLarge { width: img.width(), height: img.height() };
    let width = u32::try_from(img.width()).map_err(|_| too_large())?;
    let height = u32::try_from(img.height()).map_err(|_| too_large())?;
    Ok((width, height))
}
