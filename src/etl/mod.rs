//! Extract → Transform → Load for one calendar day.
//!
//! Each stage lives in its own sibling module; this gateway re-exports the
//! pieces the binaries and tests use (EMBP).

mod extract;
mod load;
mod pipeline;
mod transform;

pub use extract::{Extractor, FetchError, EXTRACT_COLUMNS};
pub use load::{load, LoadReport};
pub use pipeline::{parse_run_date, Pipeline, RunReport};
pub use transform::{bucket_start, compute, transform, BUCKET_WIDTH_SECS};
