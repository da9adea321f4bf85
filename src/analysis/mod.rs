/// Derived statistics for weather reports.
///
/// Submodules:
/// - `statistics` - pure helpers that turn observation sets into the four
///   report fields (totals by precipitation kind, averages, rounding).

pub mod statistics;
