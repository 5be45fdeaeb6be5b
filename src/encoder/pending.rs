use std::fmt::Write as _;
use std::sync::Arc;

use crate::typed_value::TypedValue;

/// Ziel eines offenen Attributs.
pub(super) enum AttributeTarget {
    /// Record ist geschrieben, der Wert folgt bei `end_attribute`.
    Regular,
    /// `xmlns` / `xmlns:p`: der Wert wird zur Namespace-Deklaration.
    Xmlns { prefix: Arc<str> },
}

/// Gepufferter Attributwert.
pub(super) struct PendingAttribute {
    pub(super) target: AttributeTarget,
    pub(super) values: Vec<TypedValue>,
}

impl PendingAttribute {
    pub(super) fn new(target: AttributeTarget) -> Self {
        Self { target, values: Vec::new() }
    }

    /// Ein einzelner Wert bleibt typisiert, mehrere werden zu Text verkettet.
    pub(super) fn merged_value(&self) -> TypedValue {
        match self.values.as_slice() {
            [] => TypedValue::Text("".into()),
            [single] => single.clone(),
            many => {
                let mut text = String::new();
                for value in many {
                    let _ = write!(text, "{value}");
                }
                TypedValue::Text(text.into())
            }
        }
    }
}
