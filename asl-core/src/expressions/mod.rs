mod path;
mod template;
mod variable;

pub use path::{InputPath, PathTarget};
pub use template::PayloadTemplate;
pub use variable::{VariableSample, Variables};

use serde_json::Value as JsonValue;

/// Compact JSON rendering used in failure causes.
pub fn to_json_str(value: &JsonValue) -> String {
    serde_json::to_string(value).unwrap_or_else(|_| value.to_string())
}
