//! Catalog snapshots and the per-project cache.
//!
//! Catalog items from a [`SnapshotSource`] are folded into an immutable
//! [`Snapshot`] of areas, dataset types, datasets and CityGML packages.
//! [`Repos`] keeps the current snapshot of every registered project and
//! [`Merger`] queries several of them as one catalog.

pub mod convert;
pub mod error;
pub mod manager;
pub mod merge;
pub mod model;
pub mod query;
pub mod repo;
pub mod snapshot;
pub mod source;

pub use error::{RepoError, RepoResult};
pub use manager::Repos;
pub use merge::Merger;
pub use model::{
    Area, AreaType, CityGmlAdmin, CityGmlDataset, Dataset, DatasetFormat, DatasetItem,
    DatasetType, DatasetTypeCategory, FloodingScale, Node, NodeKind, PlateauSpec,
    PlateauSpecMinor, River, RiverAdmin, Texture, Versioned,
};
pub use query::{AreasQuery, DatasetTypesQuery, DatasetsQuery};
pub use repo::{InMemoryRepo, Repo};
pub use snapshot::Snapshot;
pub use source::{LegacySource, SnapshotSource, StaticSource, StructuredSource};
