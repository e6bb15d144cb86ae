/// Observation selection for the beach temperature service.
///
/// Submodules:
/// - `staleness` — per-category maximum observation age.
/// - `selector`  — priority cascade producing zero or one temperature per beach.

pub mod selector;
pub mod staleness;

pub use selector::{resolve, resolve_all, select_current};
pub use staleness::StalenessPolicy;
