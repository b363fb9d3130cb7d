//! Chain-facing collaborators of the reward calculator.

pub mod error;
pub mod models;
pub mod reader;
pub mod snapshot;

pub use error::{ChainError, SnapshotError};
pub use models::{
    EmissionRate, PoolDescriptor, PoolShare, RegistrySnapshot, StrategyInfo, VaultInfo,
};
pub use reader::{Bookkeeper, ChainStateReader};
pub use snapshot::{History, PoolSnapshot, SnapshotChain, SnapshotFile, StrategySnapshot};
