pub(crate) mod binning;
pub mod booster;
pub mod error;
pub mod matrix;
pub mod trainer;
pub(crate) mod tree;
