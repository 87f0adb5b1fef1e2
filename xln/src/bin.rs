// Scenario-runner binary: reads a scenario DSL file, parses it, and
// replays it against a fresh `Environment`, printing the same
// `{success, framesGenerated, errors?}` summary the runtime-facing API
// returns. A single `init_tracing` call runs before anything else.

use std::fs;
use std::path::PathBuf;

use clap::Parser;
use xln::{execute_scenario, init_tracing, parse_scenario, Config, Environment};

#[derive(Parser)]
#[command(name = "xln", about = "Runs an XLN scenario file against a fresh environment")]
struct Cli {
    /// Path to a scenario DSL file.
    scenario: PathBuf,

    /// Starting wall-clock value (ms) the scenario's jurisdictions see as "now".
    #[arg(long, default_value_t = 0)]
    now_ms: u64,

    /// Override the fixed-point delivery bound.
    #[arg(long)]
    fixed_point_iteration_bound: Option<usize>,
}

fn main() -> anyhow::Result<()> {
    init_tracing("info");
    let cli = Cli::parse();

    let text = fs::read_to_string(&cli.scenario)?;
    let (scenario, parse_errors) = parse_scenario(&text);
    if !parse_errors.is_empty() {
        for error in &parse_errors {
            eprintln!("parse error: {error}");
        }
        anyhow::bail!("{} scenario parse error(s) in {}", parse_errors.len(), cli.scenario.display());
    }

    let mut config = Config::default();
    if let Some(bound) = cli.fixed_point_iteration_bound {
        config = config.with_fixed_point_iteration_bound(bound);
    }
    let mut env = Environment::new(config);

    let result = execute_scenario(&mut env, &scenario);
    println!("success: {}", result.success);
    println!("frames generated: {}", result.frames_generated);
    if let Some(errors) = &result.errors {
        for error in errors {
            println!("error: {error}");
        }
    }

    if !result.success {
        std::process::exit(1);
    }
    Ok(())
}
