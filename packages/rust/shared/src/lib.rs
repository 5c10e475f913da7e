//! Shared types, errors, and configuration for the currichef workspace.

pub mod config;
pub mod error;
pub mod types;

pub use config::{
    AppConfig, ChannelConfig, DiscoveryConfig, ScrapeConfig, config_dir, config_file_path,
    init_config, load_config, load_config_from,
};
pub use error::{ChefError, Result};
pub use types::{
    CC_BY, ChannelTree, CollectionType, ContentKind, ContentNode, FileRef, LicenseInfo,
    RESOURCE_TREE_KIND, ResourceDescriptor, ResourceTree,
};
