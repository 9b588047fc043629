use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use std::io::Read;
use std::path::{Path, PathBuf};

use crate::builder::QueryBuilder;
use crate::config::{self, FieldsConfig};
use crate::error::QueryError;
use crate::fields::FieldRegistry;
use crate::tree::{parse_query_str, NodePath, Rule, Value};
use crate::validate::{validate, ValidationOptions};

use super::exit_codes;
use super::output::{
    self, CheckData, CoerceData, ErrorData, FieldData, OutputMode, VerifyData,
};

#[derive(Parser)]
#[command(name = "qtree")]
#[command(about = "Build, inspect and validate rule-tree queries against a field registry")]
#[command(version)]
pub struct Cli {
    /// Path to fields file (overrides QTREE_FIELDS env var and default location)
    #[arg(long, global = true)]
    pub fields: Option<PathBuf>,

    /// Output in JSON format (auto-enabled when stdout is piped)
    #[arg(short, long, global = true)]
    pub json: bool,

    /// Force text output even when stdout is piped
    #[arg(long, global = true, conflicts_with = "json")]
    pub no_json: bool,

    /// Suppress all output on success (errors still go to stderr)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace); QTREE_LOG overrides
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// List fields with their operators and defaults
    Fields {
        /// Show a single field
        field: Option<String>,

        /// Output one field id per line
        #[arg(long, conflicts_with = "format")]
        names: bool,

        /// Format each field with a template, e.g. "{id}: {type}"
        #[arg(long)]
        format: Option<String>,
    },

    /// Validate a query file against the fields
    Check {
        /// Query file, or "-" to read stdin
        query: String,

        /// Also reject empty groups, missing operators and blank values
        #[arg(long)]
        strict: bool,
    },

    /// Print a starter query built from the field defaults
    New {
        /// Number of default rules in the root group
        #[arg(short, long, default_value_t = 1)]
        rules: usize,
    },

    /// Show how a value is reshaped for an operator
    Coerce {
        /// Field id
        #[arg(short, long)]
        field: String,

        /// Operator, e.g. "in" or "between"
        #[arg(short, long)]
        operator: String,

        /// Value as JSON; anything that is not JSON is taken as a string
        #[arg(allow_hyphen_values = true)]
        value: String,
    },

    /// Verify the fields file
    Verify,
}

pub fn execute(cli: Cli) -> Result<()> {
    let fields_path = cli.fields.as_deref();

    match cli.command {
        Commands::Fields {
            field,
            names,
            format,
        } => {
            let output_mode =
                OutputMode::from_flags(cli.json, cli.no_json, cli.quiet, names, format.is_some());
            let (_, registry) = load_registry(fields_path, output_mode);

            let ids: Vec<&str> = match &field {
                Some(id) => {
                    if let Err(e) = registry.describe(id) {
                        fail_query_error(output_mode, exit_codes::INVALID_ARGS, &e);
                    }
                    vec![id.as_str()]
                }
                None => registry.field_ids().collect(),
            };

            let data: Vec<FieldData> = ids
                .iter()
                .filter_map(|id| FieldData::from_registry(&registry, id))
                .collect();

            match output_mode {
                OutputMode::Json => {
                    if field.is_some() {
                        output::print_json(&data[0]);
                    } else {
                        output::print_json(&data);
                    }
                }
                OutputMode::Names => {
                    for f in &data {
                        println!("{}", f.id);
                    }
                }
                OutputMode::Format => {
                    let template = format.as_deref().unwrap_or("{id}");
                    for f in &data {
                        println!("{}", output::format_template(template, f));
                    }
                }
                OutputMode::Text => {
                    if field.is_some() {
                        print_field_detail(&data[0]);
                    } else {
                        print_field_table(&data);
                    }
                }
                OutputMode::Quiet => {}
            }
            Ok(())
        }

        Commands::Check { query, strict } => {
            let output_mode = OutputMode::from_flags(cli.json, cli.no_json, cli.quiet, false, false);
            let (config, registry) = load_registry(fields_path, output_mode);

            let text = read_query(&query)?;
            let tree = match parse_query_str(&text) {
                Ok(tree) => tree,
                Err(e) => fail(
                    output_mode,
                    exit_codes::INVALID_QUERY,
                    &format!("invalid query: {}", e),
                    ErrorData::default(),
                ),
            };

            let options = if strict {
                ValidationOptions::strict()
            } else {
                config.settings.validation.clone()
            };

            match validate(&tree, &registry, &options) {
                None => {
                    match output_mode {
                        OutputMode::Json => output::print_json(&CheckData {
                            valid: true,
                            rules: tree.rule_count(),
                        }),
                        OutputMode::Quiet => {}
                        _ => println!("✓ Query is valid ({} rule(s))", tree.rule_count()),
                    }
                    Ok(())
                }
                Some(report) => {
                    let count = report.error_count();
                    fail(
                        output_mode,
                        exit_codes::INVALID_QUERY,
                        &format!("query has {} error(s)", count),
                        ErrorData {
                            report: Some(report),
                            ..Default::default()
                        },
                    )
                }
            }
        }

        Commands::New { rules } => {
            let output_mode = OutputMode::from_flags(cli.json, cli.no_json, cli.quiet, false, false);
            let (config, registry) = load_registry(fields_path, output_mode);

            let mut builder =
                QueryBuilder::new(registry).with_operator_policy(config.settings.invalid_operator);
            for _ in 0..rules {
                if let Err(e) = builder.add_rule(&NodePath::root()) {
                    fail_query_error(output_mode, exit_codes::CONFIG_ERROR, &e);
                }
            }

            // the query itself is the output, so it can be redirected to a file
            let json = serde_json::to_string_pretty(builder.root())
                .context("Failed to serialize query")?;
            if !output_mode.is_quiet() {
                println!("{}", json);
            }
            Ok(())
        }

        Commands::Coerce {
            field,
            operator,
            value,
        } => {
            let output_mode = OutputMode::from_flags(cli.json, cli.no_json, cli.quiet, false, false);
            let (_, registry) = load_registry(fields_path, output_mode);

            let descriptor = match registry.describe(&field) {
                Ok(d) => d,
                Err(e) => fail_query_error(output_mode, exit_codes::INVALID_ARGS, &e),
            };

            let allowed = registry.operators_for(&field).unwrap_or_default();
            if !allowed.contains(&operator) {
                let e = QueryError::InvalidOperator {
                    field: field.clone(),
                    operator: operator.clone(),
                };
                fail(
                    output_mode,
                    exit_codes::INVALID_ARGS,
                    &e.to_string(),
                    ErrorData {
                        suggestions: Some(allowed),
                        ..Default::default()
                    },
                );
            }

            let input = parse_value(&value);
            let rule = Rule {
                field: field.clone(),
                operator: Some(operator.clone()),
                value: input.clone(),
                entity: descriptor.entity.clone(),
            };
            let coerced = registry.coerce_value_for_operator(&operator, input.clone(), &rule);

            match output_mode {
                OutputMode::Json => output::print_json(&CoerceData {
                    field,
                    arity: registry.arity_of(&operator).to_string(),
                    operator,
                    input,
                    value: coerced,
                }),
                OutputMode::Quiet => {}
                _ => println!("{}", coerced),
            }
            Ok(())
        }

        Commands::Verify => {
            let output_mode = OutputMode::from_flags(cli.json, cli.no_json, cli.quiet, false, false);
            let path = config::get_fields_path(fields_path)?;

            let (config, errors) = match config::verify(&path) {
                Ok(verified) => verified,
                Err(e) => fail(
                    output_mode,
                    exit_codes::CONFIG_ERROR,
                    &format!("{:#}", e),
                    ErrorData::default(),
                ),
            };

            if !errors.is_empty() {
                fail(
                    output_mode,
                    exit_codes::CONFIG_ERROR,
                    &format!(
                        "fields file has {} error(s): {}",
                        errors.len(),
                        path.display()
                    ),
                    ErrorData {
                        errors: Some(errors),
                        ..Default::default()
                    },
                );
            }

            let fields = config.fields.len();
            match output_mode {
                OutputMode::Json => output::print_json(&VerifyData {
                    path: path.display().to_string(),
                    valid: true,
                    fields,
                }),
                OutputMode::Quiet => {}
                _ => println!("✓ Fields file is valid: {}", path.display()),
            }
            Ok(())
        }
    }
}

/// load the fields file and build its registry, exiting with CONFIG_ERROR on failure
fn load_registry(path: Option<&Path>, output_mode: OutputMode) -> (FieldsConfig, FieldRegistry) {
    let loaded = config::get_fields_path(path)
        .and_then(|p| config::load(&p))
        .and_then(|config| {
            let registry = config.to_registry()?;
            Ok((config, registry))
        });

    match loaded {
        Ok(loaded) => loaded,
        Err(e) => fail(
            output_mode,
            exit_codes::CONFIG_ERROR,
            &format!("{:#}", e),
            ErrorData::default(),
        ),
    }
}

fn read_query(source: &str) -> Result<String> {
    if source == "-" {
        let mut text = String::new();
        std::io::stdin()
            .read_to_string(&mut text)
            .context("Failed to read query from stdin")?;
        return Ok(text);
    }

    std::fs::read_to_string(source).with_context(|| format!("Failed to read query file: {}", source))
}

/// JSON when it parses as a value, otherwise the raw text as a string
fn parse_value(raw: &str) -> Value {
    serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()))
}

fn fail_query_error(output_mode: OutputMode, code: i32, error: &QueryError) -> ! {
    fail(
        output_mode,
        code,
        &error.to_string(),
        ErrorData {
            suggestions: Some(error.suggestions().to_vec()).filter(|s| !s.is_empty()),
            ..Default::default()
        },
    )
}

/// report an error in the active output mode and exit with `code`
fn fail(output_mode: OutputMode, code: i32, message: &str, data: ErrorData) -> ! {
    if output_mode.is_json() {
        output::print_json_error_with_data(code, message, data);
    } else {
        eprintln!("error: {}", message);
        if let Some(suggestions) = &data.suggestions {
            eprintln!("  did you mean: {}", suggestions.join(", "));
        }
        for error in data.errors.iter().flatten() {
            eprintln!("  - {}", error);
        }
        if let Some(report) = &data.report {
            for message in report.messages() {
                eprintln!("  - {}", message);
            }
        }
    }
    std::process::exit(code);
}

fn print_field_table(fields: &[FieldData]) {
    if fields.is_empty() {
        println!("No fields defined");
        return;
    }

    let id_width = fields.iter().map(|f| f.id.len()).max().unwrap_or(0);
    let type_width = fields.iter().map(|f| f.field_type.len()).max().unwrap_or(0);

    for f in fields {
        println!(
            "{:<id_width$}  {:<type_width$}  [{}]  default: {} {}",
            f.id,
            f.field_type,
            f.operators.join(", "),
            f.default_operator.as_deref().unwrap_or("-"),
            f.default_value,
        );
    }
}

fn print_field_detail(field: &FieldData) {
    println!("{} ({})", field.id, field.name);
    println!("  type:      {}", field.field_type);
    println!("  operators: {}", field.operators.join(", "));
    println!(
        "  default:   {} {}",
        field.default_operator.as_deref().unwrap_or("-"),
        field.default_value
    );
    println!("  nullable:  {}", if field.nullable { "yes" } else { "no" });
    if let Some(entity) = &field.entity {
        println!("  entity:    {}", entity);
    }
    if !field.options.is_empty() {
        let options: Vec<String> = field
            .options
            .iter()
            .map(|o| format!("{}={}", o.name, o.value))
            .collect();
        println!("  options:   {}", options.join(", "));
    }
}
