pub mod allocation;
pub mod import;
pub mod model;
pub mod session;

pub use self::allocation::LotAllocationStrategy;
pub use self::session::{
    AllocationSession, DialogResult, LotAllocationUi, SkipAllocationUi, StrategyAllocationUi,
};
