#![deny(clippy::all)]
#![allow(
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    clippy::must_use_candidate
)]

pub mod changeset;
pub mod index;
pub mod manifest;
pub mod request;
pub mod results;

pub use changeset::{
    has_manifest_extension, parent_directory, ChangeSet, ChangeSetEntry, FileChange, FileStatus,
    MANIFEST_EXTENSION,
};
pub use index::{IndexError, IndexTree, ManifestRow, PathPart, PathResolver, PATH_SEPARATOR};
pub use manifest::{
    add_manifest_to_package_manifest, merge_fragments, Manifest, ManifestError, ManifestFragment,
    ManifestType, MergeError, MinManifestInfo, PackageManifest, PackageVersionEntry,
};
pub use request::{RebuildRequest, ReferenceType, RequestError, UpdateRequest};
pub use results::{CommitResult, RebuildBatchResult, SourceResultType, UpdateBatchResult};
