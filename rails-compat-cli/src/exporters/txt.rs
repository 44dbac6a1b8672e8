use rails_compat::util::marshal::models::{ObjectWrapper, Value, WrapperKind};

use crate::{
    app::{error::RuntimeError, runtime::Config},
    exporters::exporter::{open_output, Exporter, Output, Writer},
};

const INDENT: &str = "  ";

/// Renders values as an indented tree, one scalar per line
pub struct TXT<'a> {
    /// Data that is setup from the application's runtime
    pub config: &'a Config,
    /// Where the rendered text goes
    pub file: Output,
}

impl<'a> Exporter<'a> for TXT<'a> {
    fn new(config: &'a Config) -> Result<Self, RuntimeError> {
        Ok(TXT {
            config,
            file: open_output(config)?,
        })
    }

    fn export(&mut self, value: &Value) -> Result<(), RuntimeError> {
        if let Some(path) = &self.config.options.export_path {
            eprintln!("Exporting to {} as txt...", path.display());
        }
        let mut text = self.format_value(value, 0);
        text.push('\n');
        TXT::write_to_file(&mut self.file, &text)
    }
}

impl Writer for TXT<'_> {
    type Rendered = String;

    fn format_value(&self, value: &Value, indent: usize) -> String {
        match value {
            Value::Array(items) if !items.is_empty() => items
                .iter()
                .map(|item| self.format_entry("-", item, indent))
                .collect::<Vec<_>>()
                .join("\n"),
            Value::Hash(pairs) if !pairs.is_empty() => self.format_hash(pairs, indent),
            Value::Object(wrapper) if !wrapper.children.is_empty() => {
                self.format_object(wrapper, indent)
            }
            _ => format!("{}{value}", INDENT.repeat(indent)),
        }
    }

    fn format_hash(&self, pairs: &[(Value, Value)], indent: usize) -> String {
        pairs
            .iter()
            .map(|(key, value)| self.format_entry(&format!("{key} =>"), value, indent))
            .collect::<Vec<_>>()
            .join("\n")
    }

    fn format_object(&self, wrapper: &ObjectWrapper, indent: usize) -> String {
        let name = match (wrapper.class_name(), &wrapper.tag) {
            (Some(class_name), _) => format!(" {class_name}"),
            (None, Some(tag)) => format!(" {tag}"),
            (None, None) => String::new(),
        };
        let mut lines = vec![format!("{}#<{}{name}>", INDENT.repeat(indent), wrapper.kind)];

        match wrapper.kind {
            WrapperKind::Object => lines.extend(
                wrapper
                    .fields()
                    .map(|(field, value)| self.format_entry(&format!("{field} =>"), value, indent + 1)),
            ),
            _ => lines.extend(
                wrapper
                    .children
                    .iter()
                    .map(|child| self.format_entry("-", child, indent + 1)),
            ),
        }
        lines.join("\n")
    }
}

impl TXT<'_> {
    /// Format a labeled value, moving it to the following lines if it has children
    fn format_entry(&self, label: &str, value: &Value, indent: usize) -> String {
        let padding = INDENT.repeat(indent);
        if has_children(value) {
            format!("{padding}{label}\n{}", self.format_value(value, indent + 1))
        } else {
            format!("{padding}{label} {value}")
        }
    }
}

fn has_children(value: &Value) -> bool {
    match value {
        Value::Array(items) => !items.is_empty(),
        Value::Hash(pairs) => !pairs.is_empty(),
        Value::Object(wrapper) => !wrapper.children.is_empty(),
        _ => false,
    }
}
