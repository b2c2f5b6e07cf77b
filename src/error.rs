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

//! Error types shared by the codec, the cat map and the transforms.

use std::fmt;
use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Malformed pixel map, either on disk or in memory.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum FormatError {
    /// First two bytes are not `P6`.
    #[error("bad magic {0:?}, expected \"P6\"")]
    BadMagic(String),

    /// Header ended before the field was read.
    #[error("missing {0} field")]
    MissingField(&'static str),

    /// Field is not a positive decimal integer.
    #[error("invalid {field} field {value:?}")]
    InvalidField { field: &'static str, value: String },

    /// Maximum intensity outside `1..=65535`.
    #[error("maximum intensity {0} out of range 1..=65535")]
    MaxValOutOfRange(u32),

    /// Fewer sample bytes than the header promises.
    #[error("sample stream truncated: expected {expected} bytes, found {found}")]
    Truncated { expected: usize, found: usize },

    /// A sample is larger than the maximum intensity.
    #[error("sample {index} is {value}, above maximum intensity {max_val}")]
    SampleOutOfRange { index: usize, value: u16, max_val: u16 },

    /// Sample buffer does not have `height x width x 3` elements.
    #[error("sample buffer has shape {found:?}, expected {expected:?}")]
    ShapeMismatch {
        expected: [usize; 3],
        found: Vec<usize>,
    },
}

/// Any failure of a codec, engine or transform operation.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Io(#[from] io::Error),

    #[error(transparent)]
    Format(#[from] FormatError),

    #[error("image is {width}x{height}, cat map needs a square image")]
    UnsupportedDimensions { width: usize, height: usize },

    #[error("iteration count must not be negative (got {0})")]
    InvalidIterationCount(i64),

    #[error("cannot crop {width}x{height} image to {crop_width}x{crop_height}")]
    CropOutOfBounds {
        width: usize,
        height: usize,
        crop_width: usize,
        crop_height: usize,
    },

    /// Buffer of this many elements could not be reserved.
    #[error("cannot allocate buffer of {0} elements")]
    Allocation(usize),
}

/// Which step of a transform failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Validate,
    Decode,
    Permute,
    Encode,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Validate => "validate",
            Self::Decode => "decode",
            Self::Permute => "permute",
            Self::Encode => "encode",
        })
    }
}

/// Failure of a whole transform, tagged with stage and the path involved.
#[derive(Debug, Error)]
#[error("{stage} failed for {}: {source}", .path.display())]
pub struct TransformError {
    pub stage: Stage,
    pub path: PathBuf,
    #[source]
    pub source: Error,
}

impl TransformError {
    pub fn new(stage: Stage, path: impl Into<PathBuf>, source: impl Into<Error>) -> Self {
        Self {
            stage,
            path: path.into(),
            source: source.into(),
        }
    }
}
