//! Response-to-artifact pipeline: structure parsing, block extraction,
//! path-tree transformation and versioned merging.

pub mod extractor;
pub mod merge;
pub mod pipeline;
pub mod reasoning;
pub mod structure;
pub mod transformer;
pub mod versions;

pub use extractor::{extract_blocks, Platform};
pub use merge::{all_files, find_file, merge, update_file};
pub use pipeline::{run, ArtifactState, FileEdit, Workspace};
pub use reasoning::strip_reasoning;
pub use structure::parse_structure;
pub use transformer::{language_for_filename, normalize_path, transform};
pub use versions::VersionHistory;
