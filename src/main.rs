use clap::{Parser, Subcommand};
use std::error::Error;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

use flow_verify::config::{self, Config};
use flow_verify::evidence::EvidenceCapturer;
use flow_verify::runner::{SuiteReport, run_suite};
use flow_verify::scenario::{Orchestrator, Outcome, catalog};
use flow_verify::session::ChromeLauncher;

/// flow-verify - Browser-driven verification of the document upload workflow
#[derive(Parser, Debug)]
#[command(
    name = "flow-verify",
    about = "Drive a browser through the upload and processing workflow and capture evidence",
    after_help = "ENVIRONMENT VARIABLES:\n\
        FLOW_VERIFY_BASE_URL       Base URL of the application under test\n\
        FLOW_VERIFY_EMAIL          Sign-in email\n\
        FLOW_VERIFY_PASSWORD       Sign-in password\n\
        FLOW_VERIFY_SAMPLE         Document to upload\n\
        FLOW_VERIFY_ARTIFACT_DIR   Directory for screenshots and manifests\n\
        FLOW_VERIFY_HEADLESS       Run without a browser window (true/false)\n\
        FLOW_VERIFY_VIEWPORT       Browser window size as WxH\n\
        FLOW_VERIFY_POLL_MS        Condition polling interval in milliseconds\n\
        FLOW_VERIFY_TIMEOUT_SCALE  Factor applied to every timeout budget\n\
        FLOW_VERIFY_TIMEOUTS       Per-budget timeouts as name=ms, comma separated\n\
        FLOW_VERIFY_CHROME         Chrome/Chromium executable"
)]
struct Args {
    #[command(subcommand)]
    command: Commands,

    /// Base URL of the application under test
    #[arg(long, global = true, env = config::ENV_BASE_URL)]
    base_url: Option<String>,

    /// Sign-in email
    #[arg(long, global = true, env = config::ENV_EMAIL)]
    email: Option<String>,

    /// Sign-in password
    #[arg(long, global = true, env = config::ENV_PASSWORD, hide_env_values = true)]
    password: Option<String>,

    /// Document uploaded by the upload scenarios
    #[arg(long, global = true, env = config::ENV_SAMPLE)]
    sample: Option<PathBuf>,

    /// Directory for screenshots and manifests
    #[arg(long, short = 'o', global = true, env = config::ENV_ARTIFACT_DIR)]
    artifacts: Option<PathBuf>,

    /// Show the browser window
    #[arg(long, global = true)]
    headed: bool,

    /// Browser window size as WxH (e.g., 1280x720)
    #[arg(long, global = true, env = config::ENV_VIEWPORT)]
    viewport: Option<String>,

    /// Condition polling interval in milliseconds
    #[arg(long, global = true, env = config::ENV_POLL_MS)]
    poll_ms: Option<u64>,

    /// Multiply every timeout budget (e.g., 2.5 for a slow environment)
    #[arg(long, global = true, env = config::ENV_TIMEOUT_SCALE)]
    timeout_scale: Option<f64>,

    /// Override one timeout budget as NAME=MS (page_ready, login_redirect,
    /// upload_control, processing, terminal_marker, page_content); repeatable
    #[arg(
        long = "timeout",
        value_name = "NAME=MS",
        global = true,
        env = config::ENV_TIMEOUTS,
        value_delimiter = ','
    )]
    timeouts: Vec<String>,

    /// Print the suite report as JSON on stdout
    #[arg(long, global = true)]
    json: bool,

    /// Also write the suite report as JSON to this file
    #[arg(long, global = true)]
    report: Option<PathBuf>,

    /// Debug logging
    #[arg(long, short = 'v', global = true)]
    verbose: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run scenarios against the application (default: all)
    Run {
        /// Scenario names, see `flow-verify list`
        scenarios: Vec<String>,
    },

    /// List the available scenarios
    List,
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();
    init_tracing(args.verbose);

    match run(args).await {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::from(1),
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::from(2)
        }
    }
}

/// Returns whether every selected scenario passed
async fn run(args: Args) -> Result<bool, Box<dyn Error>> {
    let config = build_config(&args)?;

    match args.command {
        Commands::List => {
            for scenario in catalog::all(&config)? {
                println!("{:<22} {}", scenario.name, scenario.description);
            }
            Ok(true)
        }

        Commands::Run { ref scenarios } => {
            let selected = if scenarios.is_empty() {
                catalog::all(&config)?
            } else {
                scenarios
                    .iter()
                    .map(|name| catalog::by_name(&config, name))
                    .collect::<Result<Vec<_>, _>>()?
            };

            let capturer = EvidenceCapturer::new(&config.artifacts.dir);
            let orchestrator = Orchestrator::from_config(&config, &capturer);
            let mut launcher = ChromeLauncher::new(config.browser.clone());

            let suite = run_suite(&mut launcher, &orchestrator, &selected).await?;

            if let Some(path) = &args.report {
                suite.write_json(path)?;
            }
            if args.json {
                println!("{}", serde_json::to_string_pretty(&suite)?);
            } else {
                print_summary(&suite);
            }
            Ok(suite.success())
        }
    }
}

fn build_config(args: &Args) -> Result<Config, Box<dyn Error>> {
    let mut config = config::get().clone();

    if let Some(url) = &args.base_url {
        config = config.base_url(url);
    }
    if args.email.is_some() || args.password.is_some() {
        let email = args
            .email
            .clone()
            .unwrap_or_else(|| config.credentials.email.clone());
        let password = args
            .password
            .clone()
            .unwrap_or_else(|| config.credentials.password.clone());
        config = config.credentials(email, password);
    }
    if let Some(sample) = &args.sample {
        config = config.sample_path(sample);
    }
    if let Some(dir) = &args.artifacts {
        config = config.artifact_dir(dir);
    }
    if let Some(size) = &args.viewport {
        let (width, height) = config::parse_viewport(size)
            .ok_or_else(|| format!("Invalid viewport '{}'. Use WxH (e.g., 1280x720)", size))?;
        config.browser.viewport_width = width;
        config.browser.viewport_height = height;
    }
    if args.headed {
        config.browser.headless = false;
    }
    if let Some(ms) = args.poll_ms {
        if ms == 0 {
            return Err("Poll interval must be non-zero".into());
        }
        config.timeouts.poll_interval = std::time::Duration::from_millis(ms);
    }
    if let Some(factor) = args.timeout_scale {
        config.timeouts = config.timeouts.scaled(factor)?;
    }
    // Per-budget overrides apply after scaling so they are taken literally
    for spec in &args.timeouts {
        let (name, budget) = config::parse_timeout_override(spec)
            .ok_or_else(|| format!("Invalid timeout '{}'. Use NAME=MS (e.g., processing=20000)", spec))?;
        config.timeouts.set_budget(&name, budget)?;
    }
    Ok(config)
}

fn print_summary(suite: &SuiteReport) {
    for report in &suite.scenarios {
        match &report.outcome {
            Outcome::Success => println!("PASS  {} ({} ms)", report.name, report.duration_ms),
            Outcome::Failure { reason, .. } => {
                println!("FAIL  {} at {}: {}", report.name, report.reached, reason)
            }
            Outcome::Pending => println!("????  {}", report.name),
        }
        if let Some(evidence) = &report.evidence {
            println!("      screenshot: {}", evidence.image_path.display());
        }
    }
    println!();
    println!(
        "{} passed, {} failed ({} ms)",
        suite.passed, suite.failed, suite.duration_ms
    );
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("flow_verify=debug,info")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
