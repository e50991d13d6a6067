pub mod api;
pub mod model;
pub mod overlay;

pub use api::DistributionApi;
pub use model::{JavaOptions, ModuleType, RawArtifact, RawDistribution, RawModule, RawServer};
pub use overlay::{DistributionIndex, ModuleEntry, ServerEntry};
