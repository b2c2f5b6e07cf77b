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

//! Arnold's cat map over a square pixel grid.
//!
//! One forward step sends `(x, y)` to `(2x + y, x + y) mod N`, one inverse
//! step sends it to `(x - y, 2y - x) mod N`. Both matrices have determinant 1,
//! so each is a bijection of the grid for every `N`.

use std::num::NonZeroUsize;

use log::debug;
use ndarray::prelude::*;
use ndarray::Zip;

use crate::error::Error;
use crate::ppm::PixelImage;

/// Which way to run the cat map.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    Scramble,
    Unscramble,
}

impl Direction {
    /// The direction that undoes this one.
    pub fn inverse(self) -> Self {
        match self {
            Self::Scramble => Self::Unscramble,
            Self::Unscramble => Self::Scramble,
        }
    }

    /// One-step matrix, acting on column vectors `(x, y)`.
    pub fn matrix(self) -> [[i64; 2]; 2] {
        match self {
            Self::Scramble => [[2, 1], [1, 1]],
            Self::Unscramble => [[1, -1], [-1, 2]],
        }
    }
}

/// Coordinate map of a number of cat map steps on an `N x N` grid.
///
/// Stored as the step matrix raised to the iteration count, every entry
/// reduced into `[0, N)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CatMap {
    size: NonZeroUsize,
    n: u64,
    m: [[u64; 2]; 2],
}

impl CatMap {
    /// Map that leaves every position in place.
    pub fn identity(size: NonZeroUsize) -> Self {
        let n = size.get() as u64;
        Self {
            size,
            n,
            m: [[1 % n, 0], [0, 1 % n]],
        }
    }

    /// Single step of `direction`.
    pub fn step(n: NonZeroUsize, direction: Direction) -> Self {
        let mut ret = Self::identity(n);
        for (r, row) in direction.matrix().iter().enumerate() {
            for (c, &v) in row.iter().enumerate() {
                ret.m[r][c] = v.rem_euclid(ret.n as i64) as u64;
            }
        }
        ret
    }

    /// `iterations` steps of `direction`.
    pub fn new(n: NonZeroUsize, direction: Direction, iterations: u64) -> Self {
        Self::step(n, direction).pow(iterations)
    }

    pub fn size(&self) -> NonZeroUsize {
        self.size
    }

    pub fn matrix(&self) -> [[u64; 2]; 2] {
        self.m
    }

    pub fn is_identity(&self) -> bool {
        *self == Self::identity(self.size())
    }

    /// Map equivalent to applying `other` first, then `self`.
    pub fn compose(&self, other: &Self) -> Self {
        debug_assert_eq!(self.n, other.n);
        let (a, b) = (&self.m, &other.m);
        let mut m = [[0; 2]; 2];
        for (r, row) in m.iter_mut().enumerate() {
            for (c, v) in row.iter_mut().enumerate() {
                *v = mul_add_mod(a[r][0], b[0][c], a[r][1], b[1][c], self.n);
            }
        }
        Self { m, ..*self }
    }

    /// This map applied `k` times, by binary exponentiation.
    pub fn pow(&self, mut k: u64) -> Self {
        let mut ret = Self::identity(self.size());
        let mut base = *self;
        while k > 0 {
            if k & 1 == 1 {
                ret = base.compose(&ret);
            }
            base = base.compose(&base);
            k >>= 1;
        }
        ret
    }

    /// Destination of column `x`, row `y`.
    #[inline]
    pub fn apply(&self, x: usize, y: usize) -> (usize, usize) {
        let (x, y) = (x as u64, y as u64);
        let [[a, b], [c, d]] = self.m;
        (
            mul_add_mod(a, x, b, y, self.n) as usize,
            mul_add_mod(c, x, d, y, self.n) as usize,
        )
    }
}

#[inline]
fn mul_add_mod(a: u64, b: u64, c: u64, d: u64, n: u64) -> u64 {
    ((a as u128 * b as u128 + c as u128 * d as u128) % n as u128) as u64
}

/// Smallest `t >= 1` such that `t` forward steps are the identity on an
/// `n x n` grid.
pub fn period(n: NonZeroUsize) -> u64 {
    let step = CatMap::step(n, Direction::Scramble);
    let mut cur = step;
    let mut t = 1;
    while !cur.is_identity() {
        cur = step.compose(&cur);
        t += 1;
    }
    t
}

/// Moves every pixel of a square image along the cat map.
///
/// The output pixel at the destination of `(x, y)` after `iterations` steps
/// of `direction` is the input pixel at `(x, y)`. Whole RGB triples move
/// together.
pub fn permute(
    image: &PixelImage,
    direction: Direction,
    iterations: u64,
) -> Result<PixelImage, Error> {
    let (width, height) = (image.width(), image.height());
    if width != height {
        return Err(Error::UnsupportedDimensions { width, height });
    }

    let n = NonZeroUsize::new(width).ok_or(Error::UnsupportedDimensions { width, height })?;
    let map = CatMap::new(n, direction, iterations);
    debug!(
        "{direction:?} x{iterations} on {width}x{height}: matrix {:?}",
        map.matrix()
    );

    let mut out = PixelImage::filled(width, height, image.max_val(), 0)?;
    let mut dst = out.samples_mut();
    Zip::indexed(image.samples().lanes(Axis(2))).for_each(|(y, x), px| {
        let (x, y) = map.apply(x, y);
        dst.slice_mut(s![y, x, ..]).assign(&px);
    });

    Ok(out)
}

/// Pads a rectangular image to the next square, keeping it at the top-left.
///
/// New samples are `fill`, clamped to the image's maximum intensity.
/// A square image is returned as is.
pub fn pad_to_square(image: PixelImage, fill: u16) -> Result<PixelImage, Error> {
    let (width, height) = (image.width(), image.height());
    let n = width.max(height);
    if width == height {
        return Ok(image);
    }

    let mut out = PixelImage::filled(n, n, image.max_val(), fill)?;
    out.samples_mut()
        .slice_mut(s![..height, ..width, ..])
        .assign(&image.samples());
    Ok(out)
}

/// Top-left `width x height` region of an image.
pub fn crop(image: &PixelImage, width: usize, height: usize) -> Result<PixelImage, Error> {
    if width == 0 || height == 0 || width > image.width() || height > image.height() {
        return Err(Error::CropOutOfBounds {
            width: image.width(),
            height: image.height(),
            crop_width: width,
            crop_height: height,
        });
    }

    let mut out = PixelImage::filled(width, height, image.max_val(), 0)?;
    out.samples_mut()
        .assign(&image.samples().slice(s![..height, ..width, ..]));
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::collections::HashSet;

    use proptest::prelude::*;

    fn nz(n: usize) -> NonZeroUsize {
        NonZeroUsize::new(n).unwrap()
    }

    fn numbered(n: usize) -> PixelImage {
        let v = (0..n * n * 3).map(|i| (i % 65536) as u16).collect();
        PixelImage::from_vec(n, n, u16::MAX, v).unwrap()
    }

    /// Direct one-step formulas, applied `k` times.
    fn stepwise(n: usize, direction: Direction, k: u64, mut x: usize, mut y: usize) -> (usize, usize) {
        let n = n as i64;
        for _ in 0..k {
            let (a, b) = (x as i64, y as i64);
            let (a, b) = match direction {
                Direction::Scramble => (2 * a + b, a + b),
                Direction::Unscramble => (a - b, -a + 2 * b),
            };
            (x, y) = (a.rem_euclid(n) as usize, b.rem_euclid(n) as usize);
        }
        (x, y)
    }

    #[test]
    fn single_step_coordinates() {
        let map = CatMap::step(nz(4), Direction::Scramble);
        assert_eq!(map.apply(0, 0), (0, 0));
        assert_eq!(map.apply(1, 0), (2, 1));
        assert_eq!(map.apply(3, 2), (0, 1));

        let inv = CatMap::step(nz(4), Direction::Unscramble);
        assert_eq!(inv.matrix(), [[1, 3], [3, 2]]);
        assert_eq!(inv.apply(2, 1), (1, 0));
        assert_eq!(inv.apply(0, 1), (3, 2));
    }

    #[test]
    fn inverse_undoes_forward() {
        for n in 1..20 {
            let fwd = CatMap::step(nz(n), Direction::Scramble);
            let inv = CatMap::step(nz(n), Direction::Unscramble);
            assert!(inv.compose(&fwd).is_identity());
            assert!(fwd.compose(&inv).is_identity());
        }
    }

    #[test]
    fn power_matches_repeated_steps() {
        for n in [1, 2, 5, 7, 16] {
            for k in 0..25 {
                for direction in [Direction::Scramble, Direction::Unscramble] {
                    let map = CatMap::new(nz(n), direction, k);
                    for y in 0..n {
                        for x in 0..n {
                            assert_eq!(map.apply(x, y), stepwise(n, direction, k, x, y));
                        }
                    }
                }
            }
        }
    }

    #[test]
    fn known_periods() {
        let expected = [
            (1, 1),
            (2, 3),
            (3, 4),
            (4, 3),
            (5, 10),
            (8, 6),
            (10, 30),
            (100, 150),
            (124, 15),
            (150, 300),
            (256, 192),
        ];
        for (n, t) in expected {
            assert_eq!(period(nz(n)), t, "period of {n}");
        }
    }

    #[test]
    fn period_restores_image() {
        for n in [3, 8, 10] {
            let im = numbered(n);
            assert_eq!(permute(&im, Direction::Scramble, period(nz(n))).unwrap(), im);
            assert_ne!(permute(&im, Direction::Scramble, period(nz(n)) - 1).unwrap(), im);
        }
    }

    #[test]
    fn zero_iterations_is_identity() {
        let im = numbered(6);
        assert_eq!(permute(&im, Direction::Scramble, 0).unwrap(), im);
        assert_eq!(permute(&im, Direction::Unscramble, 0).unwrap(), im);
    }

    #[test]
    fn four_by_four_scenario() {
        let v: Vec<u16> = (0..48).map(|i| (i * 5) as u16).collect();
        let im = PixelImage::from_vec(4, 4, 255, v).unwrap();

        let two = permute(&im, Direction::Scramble, 2).unwrap();
        assert_eq!(permute(&two, Direction::Unscramble, 2).unwrap(), im);

        let one = permute(&im, Direction::Scramble, 1).unwrap();
        assert_ne!(one, im);
        // (1, 0) lands on (2, 1)
        assert_eq!(one.pixel(2, 1), im.pixel(1, 0));

        let pixels = |im: &PixelImage| {
            let mut v: Vec<_> = (0..16).map(|i| im.pixel(i % 4, i / 4)).collect();
            v.sort_unstable();
            v
        };
        assert_eq!(pixels(&one), pixels(&im));
    }

    #[test]
    fn rejects_non_square() {
        let im = PixelImage::filled(3, 2, 255, 7).unwrap();
        for direction in [Direction::Scramble, Direction::Unscramble] {
            assert!(matches!(
                permute(&im, direction, 1),
                Err(Error::UnsupportedDimensions {
                    width: 3,
                    height: 2
                })
            ));
        }
    }

    #[test]
    fn pad_then_crop() {
        let v = (0..2 * 3 * 3).map(|i| i as u16).collect();
        let im = PixelImage::from_vec(2, 3, 100, v).unwrap();

        let padded = pad_to_square(im.clone(), 500).unwrap();
        assert_eq!((padded.width(), padded.height()), (3, 3));
        assert_eq!(padded.pixel(2, 0), [100, 100, 100]);
        assert_eq!(padded.pixel(1, 2), im.pixel(1, 2));

        let scrambled = permute(&padded, Direction::Scramble, 5).unwrap();
        let restored = permute(&scrambled, Direction::Unscramble, 5).unwrap();
        assert_eq!(crop(&restored, 2, 3).unwrap(), im);
    }

    #[test]
    fn single_pixel_grid() {
        let map = CatMap::new(nz(1), Direction::Scramble, 5);
        assert!(map.is_identity());
        assert_eq!(map.apply(0, 0), (0, 0));
        assert_eq!(period(nz(1)), 1);
    }

    #[test]
    fn pad_keeps_square_image() {
        let im = numbered(3);
        assert_eq!(pad_to_square(im.clone(), 9).unwrap(), im);
    }

    #[test]
    fn crop_keeps_max_val() {
        let im = numbered(4);
        let out = crop(&im, 3, 2).unwrap();
        assert_eq!((out.width(), out.height(), out.max_val()), (3, 2, u16::MAX));
        assert_eq!(out.pixel(2, 1), im.pixel(2, 1));
    }

    #[test]
    fn crop_out_of_bounds() {
        let im = PixelImage::filled(2, 2, 255, 0).unwrap();
        assert!(matches!(crop(&im, 3, 1), Err(Error::CropOutOfBounds { .. })));
        assert!(matches!(crop(&im, 0, 1), Err(Error::CropOutOfBounds { .. })));
    }

    proptest! {
        #[test]
        fn round_trip(n in 1usize..12, k in 0u64..200, seed in any::<u64>()) {
            let v = (0..n * n * 3)
                .map(|i| (seed.wrapping_mul(i as u64 + 1) >> 40) as u16 & 0xff)
                .collect();
            let im = PixelImage::from_vec(n, n, 255, v).unwrap();
            let scrambled = permute(&im, Direction::Scramble, k).unwrap();
            prop_assert_eq!(permute(&scrambled, Direction::Unscramble, k).unwrap(), im);
        }

        #[test]
        fn map_is_bijection(n in 1usize..24, k in 0u64..1000, unscramble in any::<bool>()) {
            let direction = if unscramble { Direction::Unscramble } else { Direction::Scramble };
            let map = CatMap::new(nz(n), direction, k);
            let mut seen = HashSet::new();
            for y in 0..n {
                for x in 0..n {
                    let (a, b) = map.apply(x, y);
                    prop_assert!(a < n && b < n);
                    prop_assert!(seen.insert((a, b)));
                }
            }
        }
    }
}
