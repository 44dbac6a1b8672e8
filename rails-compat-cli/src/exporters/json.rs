use json::{from, object, JsonValue};
use rails_compat::util::marshal::models::{ObjectWrapper, Value, WrapperKind, WrapperTag};

use crate::{
    app::{error::RuntimeError, runtime::Config},
    exporters::exporter::{open_output, Exporter, Output, Writer},
};

/// Renders values as a single JSON document
///
/// Hashes keyed by strings and symbols become objects, like `Hash#to_json` in Ruby. Other hashes
/// become arrays of `[key, value]` pairs. Integers outside the `i64` range are written as strings.
pub struct JSON<'a> {
    /// Data that is setup from the application's runtime
    pub config: &'a Config,
    /// Where the rendered document goes
    pub file: Output,
}

impl<'a> Exporter<'a> for JSON<'a> {
    fn new(config: &'a Config) -> Result<Self, RuntimeError> {
        Ok(JSON {
            config,
            file: open_output(config)?,
        })
    }

    fn export(&mut self, value: &Value) -> Result<(), RuntimeError> {
        if let Some(path) = &self.config.options.export_path {
            eprintln!("Exporting to {} as json...", path.display());
        }
        let mut text = self.format_value(value, 0).pretty(2);
        text.push('\n');
        JSON::write_to_file(&mut self.file, &text)
    }
}

impl Writer for JSON<'_> {
    type Rendered = JsonValue;

    fn format_value(&self, value: &Value, indent: usize) -> JsonValue {
        match value {
            Value::Nil => JsonValue::Null,
            Value::Bool(flag) => from(*flag),
            Value::Integer(number) => match value.as_i64() {
                Some(small) => from(small),
                None => from(number.to_string()),
            },
            Value::String(text) => from(text.as_str()),
            Value::Symbol(symbol) => from(symbol.trim_start_matches(':')),
            Value::Array(items) => JsonValue::Array(
                items
                    .iter()
                    .map(|item| self.format_value(item, indent + 1))
                    .collect(),
            ),
            Value::Hash(pairs) => self.format_hash(pairs, indent),
            Value::Object(wrapper) => self.format_object(wrapper, indent),
        }
    }

    fn format_hash(&self, pairs: &[(Value, Value)], indent: usize) -> JsonValue {
        let keys: Option<Vec<&str>> = pairs
            .iter()
            .map(|(key, _)| key.as_str().or_else(|| key.as_symbol()))
            .collect();

        match keys {
            Some(keys) => {
                let mut json_hash = object! {};
                for (key, (_, value)) in keys.into_iter().zip(pairs) {
                    json_hash[key] = self.format_value(value, indent + 1);
                }
                json_hash
            }
            None => JsonValue::Array(
                pairs
                    .iter()
                    .map(|(key, value)| {
                        JsonValue::Array(vec![
                            self.format_value(key, indent + 1),
                            self.format_value(value, indent + 1),
                        ])
                    })
                    .collect(),
            ),
        }
    }

    fn format_object(&self, wrapper: &ObjectWrapper, indent: usize) -> JsonValue {
        let mut json_object = object! {};
        json_object["type"] = from(wrapper.kind.to_string());
        if let Some(class_name) = wrapper.class_name() {
            json_object["class"] = from(class_name);
        }
        if let Some(WrapperTag::Link(index)) = &wrapper.tag {
            json_object["link"] = from(*index);
        }

        match wrapper.kind {
            WrapperKind::Object => {
                let mut ivars = object! {};
                for (name, value) in wrapper.fields() {
                    let name = name
                        .as_symbol()
                        .map_or_else(|| name.to_string(), str::to_string);
                    ivars[name.as_str()] = self.format_value(value, indent + 1);
                }
                json_object["ivars"] = ivars;
            }
            _ if !wrapper.children.is_empty() => {
                json_object["children"] = JsonValue::Array(
                    wrapper
                        .children
                        .iter()
                        .map(|child| self.format_value(child, indent + 1))
                        .collect(),
                );
            }
            _ => {}
        }
        json_object
    }
}
