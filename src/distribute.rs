use crate::{
    kernel::{bin_index, split_point, sweep, Footprint, Outcome, Strip},
    Scalar,
};

/// Triangle collapsed onto a single axis
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Triangle1D {
    /// Coordinates of the vertices in bin units, any order
    pub freq: [Scalar; 3],
    /// Total mass
    pub amplitude: Scalar,
}

impl Triangle1D {
    pub fn new(freq: [Scalar; 3], amplitude: Scalar) -> Self {
        Self { freq, amplitude }
    }

    pub fn footprint(&self) -> Footprint<Scalar> {
        Footprint::classify(self.freq, |f| *f)
    }

    /// Add triangle mass to the histogram, see [`distribute_1d`]
    pub fn distribute(&self, spec: &mut [Scalar]) -> Outcome {
        distribute_1d(self.freq, self.amplitude, spec)
    }
}

/// Add triangle mass to the histogram `spec`, one cell per unit bin
///
/// Every bin receives the integral of the triangular density over it. A
/// triangle that collapses to a point is split linearly between the two
/// nearest bin centres, one that fits into a single bin goes there entirely.
/// Mass outside of `[0, spec.len())` is dropped.
pub fn distribute_1d(freq: [Scalar; 3], amplitude: Scalar, spec: &mut [Scalar]) -> Outcome {
    if !amplitude.is_finite() || freq.iter().any(|f| !f.is_finite()) {
        tracing::warn!(?freq, amplitude, "non-finite triangle ignored");
        return Outcome::Skipped;
    }
    let bins = spec.len();
    match Footprint::classify(freq, |f| *f) {
        Footprint::Point(x) => split_point(x, bins, |bin, weight| spec[bin] += amplitude * weight),
        Footprint::Bin(bin) => match bin_index(bin, bins) {
            Some(bin) => {
                spec[bin] += amplitude;
                Outcome::Collapsed
            }
            None => Outcome::Skipped,
        },
        Footprint::Span(freq) => sweep(freq, amplitude, bins, &mut |strip: Strip| {
            spec[strip.bin] += strip.mass
        }),
    }
}
