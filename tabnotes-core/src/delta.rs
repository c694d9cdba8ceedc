//! Rich-text document encoding exchanged with the editor.
//!
//! A document is an ordered list of insert operations. Each insert is a text
//! run or an embedded object, optionally carrying formatting attributes.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
pub struct Delta {
    #[serde(default)]
    pub ops: Vec<Op>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Op {
    pub insert: Insert,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attributes: Option<Map<String, Value>>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(untagged)]
pub enum Insert {
    Text(String),
    Embed(Value),
}

/// Values of the `list` attribute.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ListFormat {
    Ordered,
    Bullet,
    Check,
    Checked,
    Unchecked,
}

impl ListFormat {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "ordered" => Some(ListFormat::Ordered),
            "bullet" => Some(ListFormat::Bullet),
            "check" => Some(ListFormat::Check),
            "checked" => Some(ListFormat::Checked),
            "unchecked" => Some(ListFormat::Unchecked),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ListFormat::Ordered => "ordered",
            ListFormat::Bullet => "bullet",
            ListFormat::Check => "check",
            ListFormat::Checked => "checked",
            ListFormat::Unchecked => "unchecked",
        }
    }

    pub fn is_checklist(self) -> bool {
        matches!(
            self,
            ListFormat::Check | ListFormat::Checked | ListFormat::Unchecked
        )
    }
}

impl Delta {
    pub fn new(ops: Vec<Op>) -> Self {
        Self { ops }
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }
}

impl Op {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            insert: Insert::Text(text.into()),
            attributes: None,
        }
    }

    pub fn embed(value: Value) -> Self {
        Self {
            insert: Insert::Embed(value),
            attributes: None,
        }
    }

    pub fn with_attribute(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.attributes
            .get_or_insert_with(Map::new)
            .insert(key.to_string(), value.into());
        self
    }

    pub fn with_list(self, format: ListFormat) -> Self {
        self.with_attribute("list", format.as_str())
    }

    /// Inserted text, or `""` for embeds.
    pub fn text_run(&self) -> &str {
        match &self.insert {
            Insert::Text(text) => text,
            Insert::Embed(_) => "",
        }
    }

    pub fn list_format(&self) -> Option<ListFormat> {
        self.attributes
            .as_ref()?
            .get("list")?
            .as_str()
            .and_then(ListFormat::parse)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_editor_json() {
        let delta: Delta = serde_json::from_value(json!({
            "ops": [
                {"insert": "Title\n", "attributes": {"header": 1}},
                {"insert": {"image": "data:image/png;base64,AA=="}},
                {"insert": "Buy milk"},
                {"insert": "\n", "attributes": {"list": "unchecked"}}
            ]
        }))
        .unwrap();

        assert_eq!(delta.ops.len(), 4);
        assert_eq!(delta.ops[0].text_run(), "Title\n");
        assert_eq!(delta.ops[1].text_run(), "");
        assert_eq!(delta.ops[3].list_format(), Some(ListFormat::Unchecked));
        assert_eq!(delta.ops[0].list_format(), None);
    }

    #[test]
    fn missing_ops_is_empty_document() {
        let delta: Delta = serde_json::from_value(json!({})).unwrap();
        assert!(delta.is_empty());
    }

    #[test]
    fn unknown_list_value_is_ignored() {
        let op = Op::text("x").with_attribute("list", "roman");
        assert_eq!(op.list_format(), None);
    }

    #[test]
    fn plain_ops_serialize_without_attributes() {
        let value = serde_json::to_value(Delta::new(vec![Op::text("hi")])).unwrap();
        assert_eq!(value, json!({"ops": [{"insert": "hi"}]}));
    }
}
