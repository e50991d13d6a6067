pub mod acquire;
pub mod discover;
pub mod rank;
pub mod settings;
pub mod version;

pub use acquire::{
    ensure_jvm, extract_jdk, latest_jdk_asset, runtime_dir, JdkDistribution, JdkInstall,
};
pub use discover::{discover_all, java_exec_from_root, platform_discoverers, JvmDiscoverer};
pub use rank::{rank_details, select_best, validate_install, JvmDetails};
pub use settings::{extract_settings, HotSpotSettings};
pub use version::{mc_version_at_least, JavaVersion};
