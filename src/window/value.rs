use std::time::Duration;

/// Arithmetic a sample type must provide to be averaged over a time window
///
/// The running sum is built with [`accumulate`](WindowValue::accumulate) and
/// shrunk with [`remove`](WindowValue::remove) as samples are evicted, so the
/// two should undo each other. Integers and `Duration` do so exactly. Floats
/// only approximately: every add/subtract rounds, and a long-lived window
/// accumulates that error in its sum.
///
/// # Overflow
/// - Integers use wrapping arithmetic. The sum stays exact modulo 2^N, so a
///   window whose true total exceeds `T` reports a wrapped average until the
///   offending samples are evicted, after which it is exact again.
/// - Floats follow IEEE semantics, including rounding. A small sample added
///   next to a much larger one can be absorbed and never come back out.
/// - `Duration` panics on overflow, like `Duration + Duration`.
pub trait WindowValue: Copy {
    /// Additive identity, used as the initial sum and default empty value
    fn zero() -> Self;

    /// Add a sample to the running sum
    fn accumulate(self, value: Self) -> Self;

    /// Take an evicted sample back out of the running sum
    fn remove(self, value: Self) -> Self;

    /// Divide the sum by the number of samples (`count` is never zero)
    fn div_count(self, count: usize) -> Self;
}

macro_rules! impl_signed {
    ($($t:ty),*) => {
        $(
            impl WindowValue for $t {
                fn zero() -> Self {
                    0
                }

                fn accumulate(self, value: Self) -> Self {
                    self.wrapping_add(value)
                }

                fn remove(self, value: Self) -> Self {
                    self.wrapping_sub(value)
                }

                fn div_count(self, count: usize) -> Self {
                    // Widen so counts beyond T::MAX cannot overflow
                    (self as i128 / count as i128) as Self
                }
            }
        )*
    };
}

macro_rules! impl_unsigned {
    ($($t:ty),*) => {
        $(
            impl WindowValue for $t {
                fn zero() -> Self {
                    0
                }

                fn accumulate(self, value: Self) -> Self {
                    self.wrapping_add(value)
                }

                fn remove(self, value: Self) -> Self {
                    self.wrapping_sub(value)
                }

                fn div_count(self, count: usize) -> Self {
                    (self as u128 / count as u128) as Self
                }
            }
        )*
    };
}

macro_rules! impl_float {
    ($($t:ty),*) => {
        $(
            impl WindowValue for $t {
                fn zero() -> Self {
                    0.0
                }

                fn accumulate(self, value: Self) -> Self {
                    self + value
                }

                fn remove(self, value: Self) -> Self {
                    self - value
                }

                fn div_count(self, count: usize) -> Self {
                    self / count as $t
                }
            }
        )*
    };
}

impl_signed!(i8, i16, i32, i64, i128, isize);
impl_unsigned!(u8, u16, u32, u64, u128, usize);
impl_float!(f32, f64);

impl WindowValue for Duration {
    fn zero() -> Self {
        Duration::ZERO
    }

    fn accumulate(self, value: Self) -> Self {
        self + value
    }

    fn remove(self, value: Self) -> Self {
        self - value
    }

    fn div_count(self, count: usize) -> Self {
        let nanos = self.as_nanos() / count as u128;
        Duration::new(
            (nanos / 1_000_000_000) as u64,
            (nanos % 1_000_000_000) as u32,
        )
    }
}
