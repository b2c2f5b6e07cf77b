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

//! File-to-file scramble and unscramble.

use std::path::{Path, PathBuf};

use log::info;

use crate::catmap::{self, Direction};
use crate::error::{Error, Stage, TransformError};
use crate::ppm;

/// What to do with a non-square image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Fit {
    /// Refuse it.
    #[default]
    Strict,
    /// Pad bottom and right to the next square with `fill`.
    Pad { fill: u16 },
}

/// One transform call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransformRequest {
    source: PathBuf,
    destination: PathBuf,
    iterations: i64,
    fit: Fit,
    crop: Option<(usize, usize)>,
}

impl TransformRequest {
    pub fn builder(source: impl Into<PathBuf>, destination: impl Into<PathBuf>) -> RequestBuilder {
        RequestBuilder {
            req: Self {
                source: source.into(),
                destination: destination.into(),
                iterations: 1,
                fit: Fit::Strict,
                crop: None,
            },
        }
    }

    pub fn source(&self) -> &Path {
        &self.source
    }

    pub fn destination(&self) -> &Path {
        &self.destination
    }

    pub fn iterations(&self) -> i64 {
        self.iterations
    }

    pub fn fit(&self) -> Fit {
        self.fit
    }

    pub fn crop(&self) -> Option<(usize, usize)> {
        self.crop
    }
}

#[derive(Debug, Clone)]
pub struct RequestBuilder {
    req: TransformRequest,
}

impl RequestBuilder {
    /// Number of cat map steps. Negative counts are rejected by [run].
    pub fn iterations(mut self, iterations: i64) -> Self {
        self.req.iterations = iterations;
        self
    }

    pub fn fit(mut self, fit: Fit) -> Self {
        self.req.fit = fit;
        self
    }

    /// Crop the permuted image to its top-left `width x height` region.
    pub fn crop(mut self, width: usize, height: usize) -> Self {
        self.req.crop = Some((width, height));
        self
    }

    pub fn build(self) -> TransformRequest {
        self.req
    }
}

/// Successful transform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Report {
    pub destination: PathBuf,
    pub direction: Direction,
    pub iterations: u64,
    pub width: usize,
    pub height: usize,
}

pub type Outcome = Result<Report, TransformError>;

/// Status code reported across the library boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum Status {
    Ok = 0,
    BadInputPath = 1,
    BadFormat = 2,
    UnsupportedDimensions = 3,
    WriteFailure = 4,
    InvalidArgument = 5,
    OutOfMemory = 6,
}

impl Status {
    pub fn code(self) -> i32 {
        self as i32
    }
}

impl From<&TransformError> for Status {
    fn from(err: &TransformError) -> Self {
        match (&err.source, err.stage) {
            (Error::Io(_), Stage::Encode) => Self::WriteFailure,
            (Error::Io(_), _) => Self::BadInputPath,
            (Error::Format(_), _) => Self::BadFormat,
            (Error::UnsupportedDimensions { .. }, _) => Self::UnsupportedDimensions,
            (Error::InvalidIterationCount(_) | Error::CropOutOfBounds { .. }, _) => {
                Self::InvalidArgument
            }
            (Error::Allocation(_), _) => Self::OutOfMemory,
        }
    }
}

impl From<&Outcome> for Status {
    fn from(outcome: &Outcome) -> Self {
        match outcome {
            Ok(_) => Self::Ok,
            Err(e) => e.into(),
        }
    }
}

/// Decodes the source, runs the cat map and encodes the destination.
///
/// The destination is either fully written or left untouched.
pub fn run(direction: Direction, req: &TransformRequest) -> Outcome {
    let iterations = u64::try_from(req.iterations).map_err(|_| {
        TransformError::new(
            Stage::Validate,
            &req.source,
            Error::InvalidIterationCount(req.iterations),
        )
    })?;

    let image =
        ppm::decode(&req.source).map_err(|e| TransformError::new(Stage::Decode, &req.source, e))?;

    let permuted = reshape(image, direction, iterations, req)
        .map_err(|e| TransformError::new(Stage::Permute, &req.source, e))?;

    ppm::encode(&req.destination, &permuted)
        .map_err(|e| TransformError::new(Stage::Encode, &req.destination, e))?;

    info!(
        "{direction:?} x{iterations}: {} -> {}",
        req.source.display(),
        req.destination.display()
    );
    Ok(Report {
        destination: req.destination.clone(),
        direction,
        iterations,
        width: permuted.width(),
        height: permuted.height(),
    })
}

fn reshape(
    image: ppm::PixelImage,
    direction: Direction,
    iterations: u64,
    req: &TransformRequest,
) -> Result<ppm::PixelImage, Error> {
    let image = match req.fit {
        Fit::Pad { fill } => catmap::pad_to_square(image, fill)?,
        Fit::Strict => image,
    };

    let out = catmap::permute(&image, direction, iterations)?;
    match req.crop {
        Some((width, height)) => catmap::crop(&out, width, height),
        None => Ok(out),
    }
}

pub fn scramble(req: &TransformRequest) -> Outcome {
    run(Direction::Scramble, req)
}

pub fn unscramble(req: &TransformRequest) -> Outcome {
    run(Direction::Unscramble, req)
}

/// Scrambles `source` into `destination` with default options.
pub fn scramble_file(source: impl AsRef<Path>, destination: impl AsRef<Path>, iterations: i64) -> Status {
    let req = TransformRequest::builder(source.as_ref(), destination.as_ref())
        .iterations(iterations)
        .build();
    Status::from(&scramble(&req))
}

/// Unscrambles `source` into `destination` with default options.
pub fn unscramble_file(source: impl AsRef<Path>, destination: impl AsRef<Path>, iterations: i64) -> Status {
    let req = TransformRequest::builder(source.as_ref(), destination.as_ref())
        .iterations(iterations)
        .build();
    Status::from(&unscramble(&req))
}
