use clap::{Parser, Subcommand};
use std::error::Error;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use virtuoso_convert::assistants::{AssistantsApi, AssistantsClient, CreateAssistant, Tool};
use virtuoso_convert::config;
use virtuoso_convert::convert::{
    CancelToken, ConvertError, ConvertOptions, Converter, ExtractionMode, read_steps,
};
use virtuoso_convert::steps::{StepIndexPolicy, ValidationReport, validate_report};

/// Virtuoso Convert - Selenium test scripts to Virtuoso test steps
#[derive(Parser, Debug)]
#[command(
    name = "virtuoso-convert",
    about = "Convert Selenium test scripts to validated Virtuoso test steps through a hosted assistant",
    after_help = "ENVIRONMENT VARIABLES:\n\
        OPENAI_API_KEY               Assistants API credential\n\
        OPENAI_BASE_URL              Assistants API base URL\n\
        OPENAI_ASSISTANT_ID          Assistant used by `convert`\n\
        VIRTUOSO_POLL_INTERVAL_MS    Delay between run status checks (ms)\n\
        VIRTUOSO_POLL_TIMEOUT        Give up on a run after N seconds (0 = never)\n\
        VIRTUOSO_OUTPUT              Output file for converted steps\n\
        VIRTUOSO_EXTRACTION          fenced or brackets\n\
        VIRTUOSO_STRICT_STEP_INDEX   Treat stepIndex mismatch as an error\n\
        RUST_LOG                     Log filter (default: virtuoso_convert=info)"
)]
struct Args {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Convert a Selenium test script with the configured assistant
    Convert {
        /// Path to the test script
        input: PathBuf,

        /// Where to write the validated steps
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Assistant that performs the conversion
        #[arg(short, long)]
        assistant_id: Option<String>,

        /// Delay in milliseconds between run status checks
        #[arg(long)]
        poll_interval_ms: Option<u64>,

        /// Give up on the run after this many seconds (0 waits forever)
        #[arg(long)]
        timeout_secs: Option<u64>,

        /// How the JSON array is located in the reply. `fenced` takes the one
        /// fenced array block, or a lone well-formed array in prose; `brackets`
        /// takes everything from the first `[` to the last `]`
        #[arg(long, value_enum)]
        extraction: Option<ExtractionMode>,

        /// Treat a stepIndex that differs from the step position as an error
        #[arg(long)]
        strict_step_index: bool,

        /// Extra instructions for this run
        #[arg(long)]
        instructions: Option<String>,

        /// Output results as JSON
        #[arg(long)]
        json: bool,
    },

    /// Validate a steps file without contacting the service
    Validate {
        /// Path to a JSON steps file
        file: PathBuf,

        /// Treat a stepIndex that differs from the step position as an error
        #[arg(long)]
        strict_step_index: bool,

        /// Output the validation report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Create a new assistant
    CreateAssistant {
        /// Assistant name
        #[arg(short, long)]
        name: String,

        /// Instructions text
        #[arg(short, long, required_unless_present = "instructions_file", conflicts_with = "instructions_file")]
        instructions: Option<String>,

        /// Read instructions from a file
        #[arg(long)]
        instructions_file: Option<PathBuf>,

        /// Model to bind (default: VIRTUOSO_MODEL or gpt-4-turbo-preview)
        #[arg(short, long)]
        model: Option<String>,

        /// Tool to enable: code_interpreter or file_search (repeatable)
        #[arg(long = "tool", value_parser = parse_tool)]
        tools: Vec<Tool>,

        /// Output the created assistant as JSON
        #[arg(long)]
        json: bool,
    },
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<ExitCode, Box<dyn Error>> {
    dotenvy::dotenv().ok();
    init_logging();

    let args = Args::parse();
    let cfg = config::get();

    match args.command {
        Some(Commands::Convert {
            input,
            output,
            assistant_id,
            poll_interval_ms,
            timeout_secs,
            extraction,
            strict_step_index,
            instructions,
            json,
        }) => {
            let assistant_id = assistant_id
                .or_else(|| cfg.converter.assistant_id.clone())
                .ok_or_else(|| {
                    format!(
                        "No assistant id. Pass --assistant-id or set {}",
                        config::ENV_ASSISTANT_ID
                    )
                })?;

            let mut poll = cfg.converter.poll_options();
            if let Some(ms) = poll_interval_ms {
                poll.interval = Duration::from_millis(ms);
            }
            if let Some(secs) = timeout_secs {
                poll.deadline = (secs > 0).then(|| Duration::from_secs(secs));
            }

            let mut options = ConvertOptions::new(assistant_id).poll(poll);
            if let Some(path) = output {
                options = options.output_path(path);
            }
            if let Some(mode) = extraction {
                options = options.extraction(mode);
            }
            if strict_step_index {
                options = options.step_index_policy(StepIndexPolicy::Strict);
            }
            if let Some(text) = instructions {
                options = options.instructions(text);
            }

            let client = AssistantsClient::from_settings(&cfg.api)?;
            let converter = Converter::new(client, options);

            let cancel = CancelToken::new();
            let on_interrupt = cancel.clone();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    tracing::warn!("Interrupted, cancelling conversion");
                    on_interrupt.cancel();
                }
            });

            match converter.convert_file(&input, &cancel).await {
                Ok(outcome) => {
                    if json {
                        println!("{}", serde_json::to_string_pretty(&outcome)?);
                    } else {
                        println!(
                            "Conversion successful! Virtuoso steps saved to {}",
                            outcome.output_path.display()
                        );
                        println!("Total steps converted: {}", outcome.step_count);
                        for (action, count) in &outcome.actions {
                            println!("  {}: {}", action, count);
                        }
                        for warning in outcome.report.warnings() {
                            println!("  warning: {}", warning);
                        }
                    }
                    Ok(ExitCode::SUCCESS)
                }
                // Transport and service errors are not handled here
                Err(ConvertError::Api(e)) => Err(e.into()),
                Err(e) => {
                    report_failure(&e, json)?;
                    Ok(ExitCode::FAILURE)
                }
            }
        }

        Some(Commands::Validate {
            file,
            strict_step_index,
            json,
        }) => {
            let policy = if strict_step_index {
                StepIndexPolicy::Strict
            } else {
                cfg.converter.step_index_policy
            };

            let steps = match read_steps(&file) {
                Ok(steps) => steps,
                Err(e) => {
                    eprintln!("Could not read {}: {}", file.display(), e);
                    return Ok(ExitCode::FAILURE);
                }
            };

            let report = validate_report(&steps, policy);
            report.log();

            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                print_report(&file, &report);
            }

            Ok(if report.is_valid() {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            })
        }

        Some(Commands::CreateAssistant {
            name,
            instructions,
            instructions_file,
            model,
            tools,
            json,
        }) => {
            let instructions = match (instructions, instructions_file) {
                (Some(text), _) => text,
                (None, Some(path)) => read_instructions(&path)?,
                (None, None) => return Err("--instructions or --instructions-file is required".into()),
            };

            let request = CreateAssistant::new(name, instructions)
                .model(model.unwrap_or_else(|| cfg.api.model.clone()))
                .tools(tools);

            let client = AssistantsClient::from_settings(&cfg.api)?;
            let assistant = client.create_assistant(&request).await?;

            if json {
                println!("{}", serde_json::to_string_pretty(&assistant)?);
            } else {
                println!("Created assistant: {}", assistant.id);
                println!("  Model: {}", assistant.model);
                println!("Set {}={} to convert with it.", config::ENV_ASSISTANT_ID, assistant.id);
            }
            Ok(ExitCode::SUCCESS)
        }

        None => {
            println!("Virtuoso Convert - Selenium test scripts to Virtuoso test steps");
            println!();
            println!("Usage: virtuoso-convert <COMMAND>");
            println!();
            println!("Commands:");
            println!("  convert           Convert a test script with the configured assistant");
            println!("  validate          Validate a steps file offline");
            println!("  create-assistant  Create a new assistant");
            println!();
            println!("Run with --help for more information.");
            Ok(ExitCode::SUCCESS)
        }
    }
}

fn init_logging() {
    let filter = tracing_subscriber::EnvFilter::new(
        std::env::var("RUST_LOG").unwrap_or_else(|_| "virtuoso_convert=info".into()),
    );
    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .init();
}

fn report_failure(error: &ConvertError, json: bool) -> Result<(), Box<dyn Error>> {
    if json {
        let report = match error {
            ConvertError::Validation(report) => Some(report),
            _ => None,
        };
        let body = serde_json::json!({
            "success": false,
            "error": error.to_string(),
            "report": report,
            "response": error.raw_response(),
        });
        println!("{}", serde_json::to_string_pretty(&body)?);
        return Ok(());
    }

    eprintln!("{}", error);
    if let ConvertError::Validation(report) = error {
        for issue in report.errors() {
            eprintln!("  {}", issue);
        }
        eprintln!("Validation failed. The steps were not saved.");
    }
    if let Some(raw) = error.raw_response() {
        eprintln!("Response content:");
        eprintln!("{}", raw);
    }
    Ok(())
}

fn print_report(file: &Path, report: &ValidationReport) {
    if report.is_valid() {
        println!("{}: {} steps, valid", file.display(), report.step_count);
    } else {
        println!(
            "{}: {} steps, {} error(s)",
            file.display(),
            report.step_count,
            report.errors().count()
        );
    }
    for issue in &report.issues {
        println!("  {:?}: {}", issue.severity, issue);
    }
}

fn read_instructions(path: &Path) -> Result<String, Box<dyn Error>> {
    std::fs::read_to_string(path)
        .map_err(|e| format!("Could not read instructions from {}: {}", path.display(), e).into())
}

fn parse_tool(name: &str) -> Result<Tool, String> {
    Tool::from_name(name)
        .ok_or_else(|| format!("Unknown tool '{}'. Use: code_interpreter or file_search", name))
}
