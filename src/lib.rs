//! Library to reversibly scramble binary pixel maps.
//!
//! Images are scrambled with Arnold's cat map: every pixel of an `N x N`
//! image is moved to `(2x + y, x + y) mod N`, as many times as requested.
//! The map is a bijection, so:
//!
//! * No pixel is duplicated nor removed.
//! * All channels of a pixel are moved together.
//! * Unscrambling with the same iteration count restores the image exactly.
//!
//! This is a spatial permutation, not encryption.
//!
//! Files are read and written by [ppm], permutations live in [catmap] and
//! [transform] ties them into [scramble] and [unscramble].

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
//

pub mod catmap;
pub mod error;
pub mod ppm;
pub mod transform;

#[doc(inline)]
pub use crate::catmap::{permute, Direction};
#[doc(inline)]
pub use crate::error::{Error, FormatError, Stage, TransformError};
#[doc(inline)]
pub use crate::ppm::PixelImage;
#[doc(inline)]
pub use crate::transform::{
    scramble, scramble_file, unscramble, unscramble_file, Fit, Outcome, Report, Status,
    TransformRequest,
};
