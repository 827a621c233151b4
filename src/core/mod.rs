//! Core module - geometry canonicalization, assembly building and persistence

pub mod align;
pub mod assets;
pub mod builder;
pub mod checksum;
pub mod config;
pub mod diff;
pub mod geometry;
pub mod git;
pub mod inventory;
pub mod location;
pub mod naming;
pub mod normalize;
pub mod observer;
pub mod project;
pub mod revision;
pub mod store;
pub mod template;

pub use align::{align, align_solids, AlignmentError, ALIGNMENT_TOLERANCE};
pub use assets::{write_assets, AssetError, AssetReport};
pub use builder::{AssemblyBuilder, BuildError, BuildOutput};
pub use checksum::{checksum, checksum_solid, Checksum, PartGroup, CHECKSUM_PRECISION};
pub use config::{ConfigError, ProjectConfig};
pub use diff::{diff, RevisionDiff};
pub use geometry::{
    AssemblyNode, Color, GeometryError, GeometryKernel, LeafPart, Mesh, MeshKernel,
    PrincipalAxes,
};
pub use git::{ChangeSummary, Git, GitError};
pub use inventory::{CatalogItem, Inventory, PartMetadata, PartVariation, VariationKey};
pub use location::Location;
pub use naming::{NameRegistry, NamingError};
pub use normalize::{normalize, NormalizedPart};
pub use observer::{BuildEvent, BuildObserver, NullObserver, TracingObserver};
pub use project::{AlignmentPolicy, Assembly, PartRef, Project, ProjectOptions};
pub use revision::{create_project, revise_project, CreateRequest, RevisionError, RevisionOutcome};
pub use store::{read_project, write_project, StoreError};
