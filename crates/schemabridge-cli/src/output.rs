//! Output formatting and writing utilities
//!
//! Results are written as JSON, YAML or a human-readable rendering. Machine
//! formats serialize the same structures the human renderer walks.

use crate::cli::OutputFormat;
use crate::error::Result;
use colored::Colorize;
use schemabridge_core::{FieldDescription, SchemaDescription, SourceErrorItem, ValidationState};
use serde::Serialize;
use serde_json::{Map, Value};
use std::io::{self, Write};
use tracing::trace;

/// Outcome of validating one data file, as reported by `validate`
#[derive(Debug, Clone, Serialize)]
pub struct ValidationReport {
    pub model: String,
    pub valid: bool,
    pub state: ValidationState,
    /// Serialized representation of the validated data
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Map<String, Value>>,
    /// Errors in derived shape
    #[serde(skip_serializing_if = "Option::is_none")]
    pub errors: Option<Value>,
    /// Untranslated source errors when the source model has error authority
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_errors: Option<Vec<SourceErrorItem>>,
}

/// Trait for formatting output
pub trait OutputFormatter {
    /// Format a serializable value
    fn format<T: Serialize>(&self, value: &T) -> Result<String>;

    /// Format derived schema descriptions
    fn format_schemas(&self, schemas: &[SchemaDescription], use_color: bool) -> Result<String>;

    /// Format a validation report
    fn format_report(&self, report: &ValidationReport, use_color: bool) -> Result<String>;
}

impl OutputFormatter for OutputFormat {
    fn format<T: Serialize>(&self, value: &T) -> Result<String> {
        match self {
            OutputFormat::Json => Ok(serde_json::to_string(value)?),
            OutputFormat::JsonPretty | OutputFormat::Human => Ok(serde_json::to_string_pretty(value)?),
            OutputFormat::Yaml => Ok(serde_yaml::to_string(value)?),
        }
    }

    fn format_schemas(&self, schemas: &[SchemaDescription], use_color: bool) -> Result<String> {
        match self {
            OutputFormat::Human => Ok(format_schemas_human(schemas, use_color)),
            _ => self.format(&schemas),
        }
    }

    fn format_report(&self, report: &ValidationReport, use_color: bool) -> Result<String> {
        match self {
            OutputFormat::Human => format_report_human(report, use_color),
            _ => self.format(report),
        }
    }
}

/// Output writer that handles different output formats and colors
pub struct OutputWriter {
    format: OutputFormat,
    use_color: bool,
    quiet: bool,
    writer: Box<dyn Write>,
}

impl OutputWriter {
    /// Create a new output writer on stdout
    pub fn new(format: OutputFormat, use_color: bool, quiet: bool) -> Self {
        Self::with_writer(format, use_color, quiet, Box::new(io::stdout()))
    }

    /// Create an output writer with a custom writer
    pub fn with_writer(format: OutputFormat, use_color: bool, quiet: bool, writer: Box<dyn Write>) -> Self {
        Self {
            format,
            use_color,
            quiet,
            writer,
        }
    }

    /// Write a line of output
    pub fn writeln(&mut self, content: &str) -> Result<()> {
        writeln!(self.writer, "{}", content)?;
        self.writer.flush()?;
        Ok(())
    }

    /// Write an info message (human format only)
    pub fn info(&mut self, message: &str) -> Result<()> {
        if self.quiet || self.format != OutputFormat::Human {
            return Ok(());
        }
        if self.use_color {
            self.writeln(&format!("{} {}", "ℹ".blue(), message))
        } else {
            self.writeln(&format!("INFO: {}", message))
        }
    }

    /// Write a warning message (human format only)
    pub fn warning(&mut self, message: &str) -> Result<()> {
        if self.format != OutputFormat::Human {
            return Ok(());
        }
        if self.use_color {
            self.writeln(&message.yellow().to_string())
        } else {
            self.writeln(&format!("WARNING: {}", message))
        }
    }

    /// Write schema descriptions
    pub fn schemas(&mut self, schemas: &[SchemaDescription]) -> Result<()> {
        trace!(count = schemas.len(), "Writing schema descriptions");
        let formatted = self.format.format_schemas(schemas, self.use_color)?;
        self.writeln(formatted.trim_end())
    }

    /// Write a validation report
    pub fn report(&mut self, report: &ValidationReport) -> Result<()> {
        trace!(model = %report.model, valid = report.valid, "Writing validation report");
        let formatted = self.format.format_report(report, self.use_color)?;
        self.writeln(formatted.trim_end())
    }
}

fn format_schemas_human(schemas: &[SchemaDescription], use_color: bool) -> String {
    let mut out = String::new();
    for (index, schema) in schemas.iter().enumerate() {
        if index > 0 {
            out.push('\n');
        }
        let title = format!("{} (model {})", schema.name, schema.model);
        if use_color {
            out.push_str(&format!("═══ {} ═══\n", title).bright_blue().to_string());
        } else {
            out.push_str(&format!("=== {} ===\n", title));
        }
        out.push_str(&format!(
            "  config: validate_against_source={}, error_authority={}, backpopulate={}{}\n",
            schema.config.validate_against_source,
            schema.config.error_authority,
            schema.config.backpopulate,
            if schema.manual { ", manual" } else { "" }
        ));

        let width = schema.fields.iter().map(|f| f.name.len()).max().unwrap_or(0);
        for field in &schema.fields {
            let name = format!("{:width$}", field.name, width = width);
            let name = if use_color { name.bold().to_string() } else { name };
            out.push_str(&format!("  {}  {}\n", name, describe_field(field)));
        }

        for warning in &schema.warnings {
            let line = format!("  warning: {}: {}", warning.field, warning.message);
            if use_color {
                out.push_str(&line.yellow().to_string());
            } else {
                out.push_str(&line);
            }
            out.push('\n');
        }
    }
    out
}

/// One-line summary of a field: kind, then flags and options
fn describe_field(field: &FieldDescription) -> String {
    let mut parts = vec![field_type(field)];
    parts.push(if field.required { "required" } else { "optional" }.to_string());
    if field.allow_null {
        parts.push("nullable".to_string());
    }
    if field.validation_key != field.name {
        parts.push(format!("key={}", field.validation_key));
    }
    if field.serialization_key != field.validation_key {
        parts.push(format!("output_key={}", field.serialization_key));
    }
    if let Some(default) = &field.default {
        parts.push(format!("default={}", default));
    }
    if let Some(min) = field.min_length {
        parts.push(format!("min_length={}", min));
    }
    if let Some(max) = field.max_length {
        parts.push(format!("max_length={}", max));
    }
    if let Some(min) = field.min_value {
        parts.push(format!("min_value={}", min));
    }
    if let Some(max) = field.max_value {
        parts.push(format!("max_value={}", max));
    }
    if let (Some(digits), Some(places)) = (field.max_digits, field.decimal_places) {
        parts.push(format!("digits={}/{}", digits, places));
    }
    if let Some(pattern) = &field.pattern {
        parts.push(format!("pattern={}", pattern));
    }
    if let Some(choices) = &field.choices {
        let choices: Vec<String> = choices.iter().map(Value::to_string).collect();
        parts.push(format!("choices=[{}]", choices.join(", ")));
    }
    if let Some(help) = &field.help_text {
        parts.push(format!("\"{}\"", help));
    }
    parts.join("  ")
}

/// Kind with children spelled out, e.g. `ListField<NestedSchema(JobSchema)>`
fn field_type(field: &FieldDescription) -> String {
    let base = match &field.schema {
        Some(schema) => format!("{}({})", field.kind, schema),
        None => field.kind.clone(),
    };
    match &field.child {
        Some(child) => format!("{}<{}>", base, field_type(child)),
        None => base,
    }
}

fn format_report_human(report: &ValidationReport, use_color: bool) -> Result<String> {
    let mut out = String::new();
    let headline = if report.valid {
        format!("✓ {} is valid ({})", report.model, report.state)
    } else {
        format!("✗ {} is invalid ({})", report.model, report.state)
    };
    out.push_str(&match (use_color, report.valid) {
        (true, true) => headline.green().to_string(),
        (true, false) => headline.red().to_string(),
        (false, _) => headline,
    });
    out.push('\n');

    if let Some(data) = &report.data {
        out.push_str(&serde_json::to_string_pretty(data)?);
        out.push('\n');
    }

    if let Some(errors) = &report.errors {
        let mut lines = Vec::new();
        flatten_errors(errors, "", &mut lines);
        for (path, message) in lines {
            let location = if path.is_empty() { "(root)".to_string() } else { path };
            let location = if use_color { location.bold().to_string() } else { location };
            out.push_str(&format!("  {}: {}\n", location, message));
        }
    }

    if let Some(items) = &report.source_errors {
        for item in items {
            let location: Vec<String> = item.loc.iter().map(ToString::to_string).collect();
            out.push_str(&format!("  {}: {} [type={}]\n", location.join("."), item.msg, item.kind));
        }
    }

    Ok(out)
}

/// Flatten a nested error mapping into `(dotted.path, message)` pairs
fn flatten_errors(value: &Value, path: &str, out: &mut Vec<(String, String)>) {
    match value {
        Value::Object(map) => {
            for (key, nested) in map {
                let nested_path = if path.is_empty() {
                    key.clone()
                } else {
                    format!("{}.{}", path, key)
                };
                flatten_errors(nested, &nested_path, out);
            }
        }
        Value::Array(items) => {
            for item in items {
                flatten_errors(item, path, out);
            }
        }
        Value::String(message) => out.push((path.to_string(), message.clone())),
        other => out.push((path.to_string(), other.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use schemabridge_core::{FieldDescriptor, SchemaRegistry, SourceModel, TypeAnnotation};
    use serde_json::json;

    fn schema_descriptions() -> Vec<SchemaDescription> {
        let job = SourceModel::derived("Job")
            .field(FieldDescriptor::new("title", TypeAnnotation::Str))
            .build();
        let person = SourceModel::derived("Person")
            .field(FieldDescriptor::new("name", TypeAnnotation::Str).alias("fullName"))
            .field(FieldDescriptor::new("jobs", TypeAnnotation::list(TypeAnnotation::model(&job))))
            .build();
        let schema = SchemaRegistry::new().get_or_build(&person).unwrap();
        vec![schema.describe()]
    }

    #[test]
    fn test_human_schema_rendering() {
        let rendered = format_schemas_human(&schema_descriptions(), false);
        assert!(rendered.starts_with("=== PersonSchema (model Person) ===\n"));
        assert!(rendered.contains("config: validate_against_source=false, error_authority=derived, backpopulate=true"));
        assert!(rendered.contains("name  CharField  required  key=fullName"));
        assert!(rendered.contains("jobs  ListField<NestedSchema(JobSchema)>  required"));
    }

    #[test]
    fn test_machine_formats_serialize_descriptions() {
        let schemas = schema_descriptions();
        let json = OutputFormat::Json.format_schemas(&schemas, false).unwrap();
        let parsed: Value = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed[0]["name"], json!("PersonSchema"));
        assert_eq!(parsed[0]["fields"][1]["child"]["schema"], json!("JobSchema"));

        let yaml = OutputFormat::Yaml.format_schemas(&schemas, false).unwrap();
        assert!(yaml.contains("name: PersonSchema"));
    }

    #[test]
    fn test_flatten_errors() {
        let mut lines = Vec::new();
        flatten_errors(
            &json!({"age": ["A valid integer is required."], "jobs": {"0": {"title": ["This field is required."]}}}),
            "",
            &mut lines,
        );
        assert_eq!(
            lines,
            vec![
                ("age".to_string(), "A valid integer is required.".to_string()),
                ("jobs.0.title".to_string(), "This field is required.".to_string()),
            ]
        );
    }

    #[test]
    fn test_human_report_rendering() {
        let report = ValidationReport {
            model: "Person".into(),
            valid: false,
            state: ValidationState::DerivedRejected,
            data: None,
            errors: Some(json!({"age": ["A valid integer is required."]})),
            source_errors: None,
        };
        let rendered = format_report_human(&report, false).unwrap();
        assert!(rendered.starts_with("✗ Person is invalid"));
        assert!(rendered.contains("  age: A valid integer is required.\n"));

        let json = OutputFormat::Json.format_report(&report, false).unwrap();
        assert!(!json.contains("source_errors"));
    }
}
