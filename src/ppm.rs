// Copyright (C) 2023 Dheatly23
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Lesser General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU Lesser General Public License for more details.
//
// You should have received a copy of the GNU Lesser General Public License
// along with this program.  If not, see <https://www.gnu.org/licenses/>.

//! Binary pixel map (`P6`) codec.
//!
//! Header comments are accepted anywhere between header tokens and dropped;
//! [write_ppm] always emits the canonical header `P6\n{W} {H}\n{maxVal}\n`.
//! Samples are one byte wide when the maximum intensity is below 256,
//! otherwise two bytes big-endian.

use std::fs::{self, File};
use std::io::{BufWriter, Read, Write};
use std::path::Path;

use log::{debug, warn};
use ndarray::prelude::*;
use tempfile::Builder;

use crate::error::{Error, FormatError};

/// Decoded RGB pixel map.
///
/// Samples are stored as a `(height, width, 3)` array, row-major,
/// top row first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PixelImage {
    max_val: u16,
    samples: Array3<u16>,
}

impl PixelImage {
    /// Wraps a sample array, checking every invariant.
    pub fn new(samples: Array3<u16>, max_val: u16) -> Result<Self, FormatError> {
        let ret = Self { max_val, samples };
        ret.validate()?;
        Ok(ret)
    }

    /// Builds an image from a flat interleaved RGB sample vector.
    pub fn from_vec(
        width: usize,
        height: usize,
        max_val: u16,
        samples: Vec<u16>,
    ) -> Result<Self, FormatError> {
        let found = samples.len();
        let samples = Array3::from_shape_vec((height, width, 3), samples).map_err(|_| {
            FormatError::ShapeMismatch {
                expected: [height, width, 3],
                found: vec![found],
            }
        })?;
        Self::new(samples, max_val)
    }

    /// Image with every sample set to `fill` (clamped to `max_val`).
    pub fn filled(width: usize, height: usize, max_val: u16, fill: u16) -> Result<Self, Error> {
        let len = sample_count(width, height)?;
        let samples = alloc_samples(len, fill.min(max_val))?;
        Ok(Self::from_vec(width, height, max_val, samples)?)
    }

    pub fn width(&self) -> usize {
        self.samples.dim().1
    }

    pub fn height(&self) -> usize {
        self.samples.dim().0
    }

    pub fn max_val(&self) -> u16 {
        self.max_val
    }

    pub fn samples(&self) -> ArrayView3<'_, u16> {
        self.samples.view()
    }

    /// Mutable access to the samples.
    ///
    /// Nothing stops a caller from writing values above [Self::max_val] here;
    /// [encode] and [write_ppm] reject such an image.
    pub fn samples_mut(&mut self) -> ArrayViewMut3<'_, u16> {
        self.samples.view_mut()
    }

    pub fn into_samples(self) -> Array3<u16> {
        self.samples
    }

    /// RGB triple at column `x`, row `y`.
    pub fn pixel(&self, x: usize, y: usize) -> [u16; 3] {
        let p = self.samples.slice(s![y, x, ..]);
        [p[0], p[1], p[2]]
    }

    /// Bytes per sample on disk.
    pub fn sample_width(&self) -> usize {
        if self.max_val < 256 {
            1
        } else {
            2
        }
    }

    /// Checks dimensions, shape and sample range.
    pub fn validate(&self) -> Result<(), FormatError> {
        let shape = self.samples.shape();
        let (h, w) = (shape[0], shape[1]);
        if shape[2] != 3 {
            return Err(FormatError::ShapeMismatch {
                expected: [h, w, 3],
                found: shape.to_vec(),
            });
        }
        if w == 0 {
            return Err(invalid("width", "0"));
        }
        if h == 0 {
            return Err(invalid("height", "0"));
        }
        if self.max_val == 0 {
            return Err(invalid("maximum intensity", "0"));
        }

        match self
            .samples
            .iter()
            .enumerate()
            .find(|&(_, &v)| v > self.max_val)
        {
            Some((index, &value)) => Err(FormatError::SampleOutOfRange {
                index,
                value,
                max_val: self.max_val,
            }),
            None => Ok(()),
        }
    }
}

fn invalid(field: &'static str, value: impl Into<String>) -> FormatError {
    FormatError::InvalidField {
        field,
        value: value.into(),
    }
}

/// Number of samples in a `width x height` RGB image.
fn sample_count(width: usize, height: usize) -> Result<usize, FormatError> {
    width
        .checked_mul(height)
        .and_then(|v| v.checked_mul(3))
        .ok_or_else(|| invalid("dimensions", format!("{width}x{height}")))
}

/// Allocates the sample buffer, reporting exhaustion instead of aborting.
fn alloc_samples(len: usize, fill: u16) -> Result<Vec<u16>, Error> {
    let mut ret = Vec::new();
    ret.try_reserve_exact(len)
        .map_err(|_| Error::Allocation(len))?;
    ret.resize(len, fill);
    Ok(ret)
}

/// Cursor over the ASCII header.
struct HeaderReader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> HeaderReader<'a> {
    fn skip_separators(&mut self) {
        while let Some(&b) = self.data.get(self.pos) {
            if b.is_ascii_whitespace() {
                self.pos += 1;
            } else if b == b'#' {
                // Comment runs to end of line
                while let Some(&b) = self.data.get(self.pos) {
                    self.pos += 1;
                    if b == b'\n' || b == b'\r' {
                        break;
                    }
                }
            } else {
                break;
            }
        }
    }

    fn token(&mut self) -> &'a [u8] {
        let data = self.data;
        let start = self.pos;
        while matches!(data.get(self.pos), Some(b) if !b.is_ascii_whitespace()) {
            self.pos += 1;
        }
        &data[start..self.pos]
    }

    fn field(&mut self, field: &'static str) -> Result<u32, FormatError> {
        self.skip_separators();
        let tok = self.token();
        if tok.is_empty() {
            return Err(FormatError::MissingField(field));
        }

        let text = String::from_utf8_lossy(tok);
        if !tok.iter().all(u8::is_ascii_digit) {
            return Err(invalid(field, text));
        }
        match text.parse::<u32>() {
            Ok(0) | Err(_) => Err(invalid(field, text)),
            Ok(v) => Ok(v),
        }
    }
}

/// Decodes a pixel map held in memory.
pub fn read_ppm(data: &[u8]) -> Result<PixelImage, Error> {
    let magic_ok = data.starts_with(b"P6")
        && !matches!(data.get(2), Some(b) if !b.is_ascii_whitespace() && *b != b'#');
    if !magic_ok {
        let end = data.len().min(8);
        return Err(FormatError::BadMagic(String::from_utf8_lossy(&data[..end]).into_owned()).into());
    }

    let mut header = HeaderReader { data, pos: 2 };
    let width = header.field("width")? as usize;
    let height = header.field("height")? as usize;
    let max_val = header.field("maximum intensity")?;
    let max_val = u16::try_from(max_val).map_err(|_| FormatError::MaxValOutOfRange(max_val))?;
    debug!("Header: {width}x{height}, maximum intensity {max_val}");

    let count = sample_count(width, height)?;
    let sample_width = if max_val < 256 { 1 } else { 2 };
    let expected = count
        .checked_mul(sample_width)
        .ok_or_else(|| invalid("dimensions", format!("{width}x{height}")))?;

    // Exactly one whitespace byte before the raster
    let body = match data.get(header.pos..) {
        Some([_, body @ ..]) => body,
        _ => return Err(FormatError::Truncated { expected, found: 0 }.into()),
    };
    if body.len() < expected {
        return Err(FormatError::Truncated {
            expected,
            found: body.len(),
        }
        .into());
    }
    if body.len() > expected {
        warn!(
            "Ignoring {} trailing bytes after sample stream",
            body.len() - expected
        );
    }

    let mut samples = Vec::new();
    samples
        .try_reserve_exact(count)
        .map_err(|_| Error::Allocation(count))?;
    let body = &body[..expected];
    if sample_width == 1 {
        samples.extend(body.iter().map(|&b| u16::from(b)));
    } else {
        samples.extend(
            body.chunks_exact(2)
                .map(|c| u16::from_be_bytes([c[0], c[1]])),
        );
    }

    Ok(PixelImage::from_vec(width, height, max_val, samples)?)
}

/// Encodes an image to a writer. The image is validated first.
pub fn write_ppm<W: Write>(out: W, image: &PixelImage) -> Result<(), Error> {
    image.validate()?;
    write_unchecked(out, image)
}

fn write_unchecked<W: Write>(mut out: W, image: &PixelImage) -> Result<(), Error> {
    write!(
        out,
        "P6\n{} {}\n{}\n",
        image.width(),
        image.height(),
        image.max_val()
    )?;

    let mut buf = Vec::with_capacity(image.width() * 3 * image.sample_width());
    for row in image.samples.outer_iter() {
        buf.clear();
        if image.sample_width() == 1 {
            buf.extend(row.iter().map(|&v| v as u8));
        } else {
            buf.extend(row.iter().flat_map(|v| v.to_be_bytes()));
        }
        out.write_all(&buf)?;
    }

    Ok(())
}

/// Reads and decodes a pixel map file.
pub fn decode(path: impl AsRef<Path>) -> Result<PixelImage, Error> {
    let path = path.as_ref();
    let mut file = File::open(path)?;
    let len = usize::try_from(file.metadata()?.len()).unwrap_or(usize::MAX);
    let mut data = Vec::new();
    data.try_reserve_exact(len)
        .map_err(|_| Error::Allocation(len))?;
    file.read_to_end(&mut data)?;
    debug!("Read {} bytes from {}", data.len(), path.display());
    read_ppm(&data)
}

/// Encodes an image to a file.
///
/// The data goes to a temporary file next to `path`, which is renamed
/// over `path` only once fully written. On failure `path` is untouched.
///
/// A new file gets the usual umask-default mode; an overwritten file keeps
/// its permissions.
pub fn encode(path: impl AsRef<Path>, image: &PixelImage) -> Result<(), Error> {
    let path = path.as_ref();
    image.validate()?;

    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    #[cfg_attr(not(unix), allow(unused_mut))]
    let mut builder = Builder::new();
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        // Masked by umask on creation
        builder.permissions(fs::Permissions::from_mode(0o666));
    }
    let mut file = builder.tempfile_in(dir)?;
    if let Ok(meta) = fs::metadata(path) {
        file.as_file().set_permissions(meta.permissions())?;
    }
    {
        let mut w = BufWriter::new(file.as_file_mut());
        write_unchecked(&mut w, image)?;
        w.flush()?;
    }
    file.as_file().sync_all()?;
    file.persist(path).map_err(|e| e.error)?;

    debug!("Wrote {}", path.display());
    Ok(())
}
