/// Clients for the upstream observation stores.
///
/// Submodules:
/// - `observations` - async HTTP client used by the aggregator to fetch
///   time-windowed temperature and precipitation sets.

pub mod observations;
