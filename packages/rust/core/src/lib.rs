//! Collection assembly and channel tree composition.
//!
//! The crate owns the two pipeline phases: `crawl` enumerates the site's
//! search index into an intermediate resource tree, and `scrape` turns
//! each enumerated resource into a packaged document subtree and composes
//! the channel tree handed to the publisher.

pub mod assembler;
pub mod composer;
pub mod context;
pub mod pipeline;
pub mod sink;

pub use assembler::{assemble, AssembleOptions, AssembledCollection};
pub use composer::TreeComposer;
pub use context::CrossRefContext;
pub use pipeline::{crawl, scrape, Progress, RunSummary, SilentProgress};
pub use sink::{ArchiveWriter, JsonTreeWriter, TreeWriter, ZipArchive};
