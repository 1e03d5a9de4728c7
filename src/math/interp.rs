use itertools::Itertools;
use num_traits::Float;
use thiserror::Error;

#[derive(Debug, Clone, Copy, Error, PartialEq)]
pub enum InterpError {
    #[error("Interpolation needs at least two points, got {0}")]
    TooFewPoints(usize),

    #[error("{xp} is outside the tabulated range [{min}, {max})")]
    OutOfRange { xp: f64, min: f64, max: f64 },
}

/// Interval `[x[index], x[index + 1])` containing a point, and the point's
/// fractional position inside it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bracket<T> {
    pub index: usize,
    pub frac: T,
}

pub fn is_strictly_increasing<T: PartialOrd>(x: &[T]) -> bool {
    x.iter().tuple_windows().all(|(a, b)| a < b)
}

/// Finds the bracketing interval of `xp` in the strictly increasing `x`.
///
/// Points below the first or at/above the last abscissa are rejected; nothing is extrapolated.
pub fn bracket<T: Float>(x: &[T], xp: T) -> Result<Bracket<T>, InterpError> {
    if x.len() < 2 {
        return Err(InterpError::TooFewPoints(x.len()));
    }

    let first = x[0];
    let last = x[x.len() - 1];

    // Written so that NaN falls out of range too.
    if !(xp >= first && xp < last) {
        return Err(InterpError::OutOfRange {
            xp: to_f64(xp),
            min: to_f64(first),
            max: to_f64(last),
        });
    }

    let index = x.partition_point(|&v| v <= xp) - 1;
    let (x0, x1) = (x[index], x[index + 1]);

    Ok(Bracket {
        index,
        frac: (xp - x0) / (x1 - x0),
    })
}

#[inline]
pub fn lerp<T: Float>(y0: T, y1: T, frac: T) -> T {
    y0 + frac * (y1 - y0)
}

fn to_f64<T: Float>(v: T) -> f64 {
    v.to_f64().unwrap_or(f64::NAN)
}
