use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use clap::{Parser, Subcommand};
use dealform::condition;
use dealform::gateway::PropertyValues;
use dealform::prelude::*;
use dealform::render::render_sections;
use dealform::render::SaveButton;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

/// Preview deal forms and call the CRM property API from the command line
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Cli {
    /// Optional TOML settings file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// API token, overriding the settings file
    #[arg(long, global = true, env = "HUBSPOT_API_KEY", hide_env_values = true)]
    token: Option<String>,

    /// API base URL, overriding the settings file
    #[arg(long, global = true)]
    base_url: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Render a form offline and explain each section's visibility
    Preview {
        /// Path to the field schema JSON file
        schema: PathBuf,
        /// Optional JSON object of remote property values
        #[arg(long)]
        values: Option<PathBuf>,
    },
    /// Fetch the option sets for the schema's dropdown fields
    Options {
        schema: PathBuf,
    },
    /// Fetch the current values of a deal
    Values {
        #[arg(long)]
        deal: String,
        schema: PathBuf,
    },
    /// Patch raw property values on a deal
    Patch {
        #[arg(long)]
        deal: String,
        /// A property assignment, `key=value`. Repeatable.
        #[arg(long = "set", value_parser = parse_assignment, required = true)]
        assignments: Vec<(String, String)>,
    },
    /// Upload a file and print its url
    Upload {
        path: PathBuf,
        #[arg(long)]
        mime: Option<String>,
    },
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Command::Preview { ref schema, ref values } => run_preview(schema, values.as_deref()),
        Command::Options { ref schema } => {
            let schema = load_schema(schema);
            let gateway = connect(&cli);
            let options = gateway
                .fetch_options(&schema.option_keys())
                .await
                .unwrap_or_else(|e| exit_with_error(&format!("Failed to fetch options: {}", e)));
            print_json(&options.into_iter().collect::<BTreeMap<_, _>>());
        }
        Command::Values { ref deal, ref schema } => {
            let schema = load_schema(schema);
            let gateway = connect(&cli);
            let values = gateway
                .fetch_values(deal, &schema.value_keys())
                .await
                .unwrap_or_else(|e| exit_with_error(&format!("Failed to fetch values: {}", e)));
            print_json(&values.into_iter().collect::<BTreeMap<_, _>>());
        }
        Command::Patch {
            ref deal,
            ref assignments,
        } => {
            let gateway = connect(&cli);
            let updates: PatchPayload = assignments
                .iter()
                .map(|(k, v)| (k.clone(), serde_json::Value::String(v.clone())))
                .collect();
            match gateway.patch_values(deal, &updates).await {
                Ok(PatchOutcome::Applied { result }) => print_json(&result),
                Ok(PatchOutcome::Rejected { status, message }) => {
                    exit_with_error(&format!("Patch rejected ({}): {}", status, message))
                }
                Err(e) => exit_with_error(&format!("Patch failed: {}", e)),
            }
        }
        Command::Upload { ref path, ref mime } => {
            let gateway = connect(&cli);
            let upload = read_upload(path, mime.clone());
            let uploaded = gateway
                .upload_file(&upload)
                .await
                .unwrap_or_else(|e| exit_with_error(&format!("Upload failed: {}", e)));
            println!("{}", uploaded.url);
        }
    }
}

fn run_preview(schema_path: &Path, values_path: Option<&Path>) {
    let schema = load_schema(schema_path);

    let state = match values_path {
        Some(path) => {
            let content = read_file(path);
            let values: PropertyValues = serde_json::from_str(&content).unwrap_or_else(|e| {
                exit_with_error(&format!("Failed to parse values JSON: {}", e))
            });
            FormState::from_remote(&schema, &values, &OptionSet::default())
        }
        None => FormState::new(),
    };

    println!("--- Visibility ---");
    for section in schema.sections() {
        let trace = condition::explain(section.condition.as_ref(), &state);
        let mark = if trace.outcome().is_visible() {
            "shown"
        } else {
            "hidden"
        };
        println!("  {:<6} {}: {}", mark, section.name, trace);
    }

    let view = FormView {
        sections: render_sections(&schema, &state, &OptionSet::default()),
        save: SaveButton {
            enabled: true,
            pending_changes: 0,
        },
    };
    println!("\n--- Form ---");
    println!("{}", view);
}

fn load_schema(path: &Path) -> FieldSchema {
    let content = read_file(path);
    FieldSchema::from_json(&content)
        .unwrap_or_else(|e| exit_with_error(&format!("Failed to load schema: {}", e)))
}

fn connect(cli: &Cli) -> CrmGateway<dealform::gateway::ReqwestTransport> {
    let mut config = GatewayConfig::load(cli.config.as_deref())
        .unwrap_or_else(|e| exit_with_error(&e.to_string()));
    if let Some(token) = &cli.token {
        config.token = Some(token.clone());
    }
    if let Some(base_url) = &cli.base_url {
        config.base_url = base_url.clone();
    }
    CrmGateway::from_config(&config).unwrap_or_else(|e| exit_with_error(&e.to_string()))
}

fn read_upload(path: &Path, mime: Option<String>) -> FileUpload {
    let bytes = fs::read(path).unwrap_or_else(|e| {
        exit_with_error(&format!("Failed to read file '{}': {}", path.display(), e))
    });
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| exit_with_error("Upload path has no file name"));
    let mime_type = mime.unwrap_or_else(|| guess_mime(path).to_string());

    FileUpload {
        file_name,
        base64: STANDARD.encode(bytes),
        mime_type,
    }
}

fn guess_mime(path: &Path) -> &'static str {
    let extension = path
        .extension()
        .map(|e| e.to_string_lossy().to_ascii_lowercase())
        .unwrap_or_default();
    match extension.as_str() {
        "pdf" => "application/pdf",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "txt" => "text/plain",
        "csv" => "text/csv",
        "json" => "application/json",
        _ => "application/octet-stream",
    }
}

fn parse_assignment(raw: &str) -> std::result::Result<(String, String), String> {
    let (key, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected key=value, got '{}'", raw))?;
    let key = key.trim();
    if key.is_empty() {
        return Err(format!("empty property name in '{}'", raw));
    }
    Ok((key.to_string(), value.to_string()))
}

fn read_file(path: &Path) -> String {
    fs::read_to_string(path).unwrap_or_else(|e| {
        exit_with_error(&format!("Failed to read file '{}': {}", path.display(), e))
    })
}

fn print_json<T: serde::Serialize>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(json) => println!("{}", json),
        Err(e) => exit_with_error(&format!("Failed to serialize output: {}", e)),
    }
}

fn exit_with_error(message: &str) -> ! {
    eprintln!("\nError: {}", message);
    std::process::exit(1);
}
