//! Result records returned by the typed adapters.

mod archive;
mod article;
mod paper;
mod record;
mod wolfram;

pub use archive::{ArchiveResult, Snapshot, WAYBACK_TIMESTAMP_FORMAT};
pub use article::PubMedArticle;
pub use paper::{ArxivPaper, ScholarPaper};
pub use record::{Record, ResultRecord, SortBy};
pub use wolfram::{Pod, ResultType, Subpod, WolframResult};
