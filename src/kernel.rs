//! Integration of a triangular density against unit bins
//!
//! A triangle collapsed onto one axis becomes a piecewise-linear density: zero
//! at `f[0]`, peak `top = 2 * amplitude / (f[2] - f[0])` at `f[1]`, zero again
//! at `f[2]`. [`sweep`] walks the bins it overlaps from left to right and hands
//! every bin-sized piece of it to a [`StripSink`] together with the integrated
//! mass. The peak bin is visited twice, once per side.
use crate::{utils::bin_of, utils::sort3_by, Scalar, TOL};

/// Offset of the bin centre from its left edge
const BIN_CENTER: Scalar = 0.5;

/// Result of depositing a single triangle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Whole mass landed in the grid
    Deposited,
    /// Part of the mass fell outside of the grid and was dropped
    Clipped,
    /// Triangle collapsed to a point or a single bin and landed in the grid
    Collapsed,
    /// Nothing was written
    Skipped,
}

impl Outcome {
    /// Some mass was written into the grid
    pub fn is_written(self) -> bool {
        !matches!(self, Outcome::Skipped)
    }
}

/// Position of a coordinate relative to the grid `[0, bins]`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Clip {
    Below,
    Inside,
    Above,
}

impl Clip {
    /// Clip state of a coordinate
    pub fn of(value: Scalar, bins: usize) -> Self {
        if value < 0.0 {
            Clip::Below
        } else if value > bins as Scalar {
            Clip::Above
        } else {
            Clip::Inside
        }
    }

    /// Clip state of a bin index
    pub fn of_bin(bin: i64, bins: usize) -> Self {
        if bin < 0 {
            Clip::Below
        } else if bin >= bins as i64 {
            Clip::Above
        } else {
            Clip::Inside
        }
    }
}

/// How a triangle projects onto an axis
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Footprint<T> {
    /// All coordinates coincide within [`TOL`]
    Point(Scalar),
    /// All coordinates fall into the same bin
    Bin(i64),
    /// Items sorted by their coordinate
    Span([T; 3]),
}

impl<T: Copy> Footprint<T> {
    pub fn classify(items: [T; 3], coord: impl Fn(&T) -> Scalar) -> Self {
        let [f0, f1, f2] = items.map(|item| coord(&item));
        if (f0 - f1).abs() < TOL && (f0 - f2).abs() < TOL {
            tracing::trace!(x = f0, "triangle collapsed to a point");
            return Footprint::Point(f0);
        }
        let bin = bin_of(f0);
        if bin == bin_of(f1) && bin == bin_of(f2) {
            tracing::trace!(bin, "triangle collapsed to a single bin");
            return Footprint::Bin(bin);
        }
        Footprint::Span(sort3_by(items, coord))
    }
}

/// Spread a point mass over the bin containing it and its nearest neighbour
///
/// `deposit` receives the bin and the fraction of the mass it gets. The
/// neighbour is dropped at the grid edges.
pub fn split_point(x: Scalar, bins: usize, mut deposit: impl FnMut(usize, Scalar)) -> Outcome {
    let bin = bin_of(x);
    if Clip::of_bin(bin, bins) != Clip::Inside {
        tracing::trace!(x, bins, "point outside of the grid");
        return Outcome::Skipped;
    }
    let p = bin as usize;
    let diff = x - p as Scalar;
    if (diff - BIN_CENTER).abs() < TOL {
        deposit(p, 1.0);
        return Outcome::Collapsed;
    }
    let (neighbour, near, far) = if diff < BIN_CENTER {
        (p.checked_sub(1), BIN_CENTER + diff, BIN_CENTER - diff)
    } else {
        (
            Some(p + 1).filter(|n| *n < bins),
            1.0 + BIN_CENTER - diff,
            diff - BIN_CENTER,
        )
    };
    deposit(p, near);
    match neighbour {
        Some(neighbour) => {
            deposit(neighbour, far);
            Outcome::Collapsed
        }
        None => Outcome::Clipped,
    }
}

/// Index of the bin if it is inside of the grid
pub fn bin_index(bin: i64, bins: usize) -> Option<usize> {
    (Clip::of_bin(bin, bins) == Clip::Inside).then_some(bin as usize)
}

/// Side of the density peak
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    /// `[f[0], f[1]]`, density grows
    Rising,
    /// `[f[1], f[2]]`, density falls
    Falling,
}

/// Part of the density between `lo` and `hi` inside of a single bin
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Strip {
    pub bin: usize,
    pub lo: Scalar,
    pub hi: Scalar,
    /// Integral of the density over `[lo, hi]`
    pub mass: Scalar,
    pub side: Side,
    /// Strip covers the whole bin and directly follows a strip of the same side
    pub interior: bool,
}

/// Receiver of the strips produced by [`sweep`]
pub trait StripSink {
    fn strip(&mut self, strip: Strip);
}

impl<F> StripSink for F
where
    F: FnMut(Strip),
{
    fn strip(&mut self, strip: Strip) {
        self(strip)
    }
}

/// One linear side of the density
struct Ramp {
    start: Scalar,
    end: Scalar,
    /// Coordinate where density is zero
    anchor: Scalar,
    top: Scalar,
    side: Side,
}

impl Ramp {
    /// Signed distance from the anchor to the peak
    fn run(&self) -> Scalar {
        match self.side {
            Side::Rising => self.end - self.start,
            Side::Falling => self.start - self.end,
        }
    }

    #[inline]
    fn density(&self, x: Scalar) -> Scalar {
        self.top * ((x - self.anchor) / self.run())
    }

    #[inline]
    fn strip(&self, bin: usize, lo: Scalar, hi: Scalar) -> Strip {
        Strip {
            bin,
            lo,
            hi,
            // exact for a linear density
            mass: (hi - lo) * self.density(0.5 * (lo + hi)),
            side: self.side,
            interior: false,
        }
    }

    fn sweep(&self, bins: usize, sink: &mut impl StripSink) {
        let lo = self.start.max(0.0);
        let hi = self.end.min(bins as Scalar);
        if !(lo < hi) {
            return;
        }
        let first = lo.floor() as usize;
        let last = (hi.ceil() as usize - 1).max(first);
        if first == last {
            sink.strip(self.strip(first, lo, hi));
            return;
        }
        sink.strip(self.strip(first, lo, (first + 1) as Scalar));
        // full bins: mass is the density at the bin centre, it advances by
        // a constant step per bin
        let step = self.top / self.run();
        let mut mass = self.density(first as Scalar + 1.0 + BIN_CENTER);
        for bin in first + 1..last {
            sink.strip(Strip {
                bin,
                lo: bin as Scalar,
                hi: (bin + 1) as Scalar,
                mass,
                side: self.side,
                interior: true,
            });
            mass += step;
        }
        sink.strip(self.strip(last, last as Scalar, hi));
    }
}

/// Integrate triangular density over the bins `[0, bins)`
///
/// `freq` must be sorted in ascending order with `freq[2] > freq[0]`. Mass
/// outside of the grid is dropped. A side of zero width carries no mass and is
/// skipped.
pub fn sweep(
    freq: [Scalar; 3],
    amplitude: Scalar,
    bins: usize,
    sink: &mut impl StripSink,
) -> Outcome {
    let [f0, f1, f2] = freq;
    if !(f0.max(0.0) < f2.min(bins as Scalar)) {
        tracing::trace!(?freq, bins, "triangle outside of the grid");
        return Outcome::Skipped;
    }
    let top = 2.0 * amplitude / (f2 - f0);
    if f1 > f0 {
        let rising = Ramp {
            start: f0,
            end: f1,
            anchor: f0,
            top,
            side: Side::Rising,
        };
        rising.sweep(bins, sink);
    }
    if f2 > f1 {
        let falling = Ramp {
            start: f1,
            end: f2,
            anchor: f2,
            top,
            side: Side::Falling,
        };
        falling.sweep(bins, sink);
    }
    if Clip::of(f0, bins) == Clip::Below || Clip::of(f2, bins) == Clip::Above {
        Outcome::Clipped
    } else {
        Outcome::Deposited
    }
}
