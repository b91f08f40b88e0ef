//! Daily Report AI Common Library
//!
//! CLIとパイプラインで共有される型とシート整形ロジック

pub mod types;
pub mod layout;
pub mod error;
pub mod sheet;
pub mod normalize;
pub mod consolidate;
pub mod parser;
pub mod prompts;
pub mod export;

pub use types::{ClassificationRecord, REQUIRED_KEYS, is_empty_value};
pub use layout::{SheetLayout, OUTPUT_HEADERS};
pub use error::{Error, Result};
pub use sheet::{MergeRegion, Sheet};
pub use normalize::normalize;
pub use consolidate::{consolidate, RowGroup};
pub use parser::{extract_json_object, parse_classification};
pub use prompts::{build_system_prompt, build_user_message, DEFAULT_PROMPT};
