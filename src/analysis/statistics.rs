//! Pure statistics used to build a weather report.
//!
//! Totals are well-defined on empty input (zero). Averages are not: an empty
//! series is reported as `StatisticsError::EmptySeries` instead of a zero or
//! NaN placeholder. Sums that leave the `Decimal` range are reported as
//! `StatisticsError::Overflow`.

use rust_decimal::{Decimal, RoundingStrategy};
use std::fmt;

use crate::model::{PrecipitationKind, PrecipitationObservation};

/// Number of decimal places carried by every report statistic.
pub const REPORT_DECIMAL_PLACES: u32 = 1;

#[derive(Debug, Clone, PartialEq)]
pub enum StatisticsError {
    /// An average was requested over no values.
    EmptySeries,
    /// A running sum exceeded the representable `Decimal` range.
    Overflow,
}

impl fmt::Display for StatisticsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StatisticsError::EmptySeries => write!(f, "cannot average an empty series"),
            StatisticsError::Overflow => write!(f, "sum exceeds the decimal range"),
        }
    }
}

impl std::error::Error for StatisticsError {}

/// Sum and count of `values`, failing instead of panicking on overflow.
fn checked_sum<I>(values: I) -> Result<(Decimal, u64), StatisticsError>
where
    I: IntoIterator<Item = Decimal>,
{
    values
        .into_iter()
        .try_fold((Decimal::ZERO, 0u64), |(sum, count), value| {
            sum.checked_add(value)
                .map(|sum| (sum, count + 1))
                .ok_or(StatisticsError::Overflow)
        })
}

/// Sum of `amount` over observations of the given kind. Zero for empty input.
pub fn total_by_kind(
    observations: &[PrecipitationObservation],
    kind: PrecipitationKind,
) -> Result<Decimal, StatisticsError> {
    let (sum, _) = checked_sum(
        observations
            .iter()
            .filter(|obs| obs.kind == kind)
            .map(|obs| obs.amount),
    )?;
    Ok(sum)
}

/// Arithmetic mean of `values`.
pub fn average<I>(values: I) -> Result<Decimal, StatisticsError>
where
    I: IntoIterator<Item = Decimal>,
{
    let (sum, count) = checked_sum(values)?;
    if count == 0 {
        return Err(StatisticsError::EmptySeries);
    }

    Ok(sum / Decimal::from(count))
}

/// Rounds to one decimal place, midpoints away from zero (`2.25 -> 2.3`,
/// `-2.25 -> -2.3`).
pub fn round_to_1(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(REPORT_DECIMAL_PLACES, RoundingStrategy::MidpointAwayFromZero)
}
