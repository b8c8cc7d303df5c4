pub mod analysis;
pub mod cur;
pub mod dashboard;
pub mod datasets;
pub mod export;
pub mod known;
pub mod sql;
pub mod views;

#[cfg(test)]
pub(crate) mod fakes;

pub use crate::domain::model::{DependsOn, ResourceFile};
pub use crate::domain::ports::{AthenaApi, ConfigProvider, QuickSightApi, Storage};
pub use crate::utils::error::Result;
