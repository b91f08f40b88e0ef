//! Export core modules shared by the CLI pipeline.

#[cfg(feature = "excel")]
pub mod excel_core;
