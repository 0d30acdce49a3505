// crates/flowcli/src/main.rs

mod scenarios;

use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use flowcore::{ExecutionEvent, Node, NodeEvent, Value};
use flowruntime::{default_app, App, RuntimeConfig};
use scenarios::Scenario;
use std::collections::HashMap;
use std::io::Write;
use std::sync::Arc;
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "flow")]
#[command(about = "Flow Engine CLI", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a built-in workflow
    Run {
        /// Which workflow to run
        #[arg(value_enum)]
        scenario: Scenario,

        /// Input data as JSON, replacing the scenario default
        #[arg(short, long)]
        input: Option<String>,

        /// Show verbose output
        #[arg(short, long)]
        verbose: bool,

        /// Fail the run on the first node error instead of logging it
        #[arg(short, long)]
        debug: bool,

        /// Print execution events after the run
        #[arg(short, long)]
        events: bool,
    },

    /// List the built-in workflows
    Scenarios,

    /// List available node types
    Nodes,
}

/// Convert a serde_json::Value to flowcore::Value
fn json_to_value(json: serde_json::Value) -> Value {
    match json {
        serde_json::Value::Null => Value::Null,
        serde_json::Value::Bool(b) => Value::Bool(b),
        serde_json::Value::Number(n) => Value::Number(n.as_f64().unwrap_or_default()),
        serde_json::Value::String(s) => Value::String(s),
        serde_json::Value::Array(arr) => Value::Array(arr.into_iter().map(json_to_value).collect()),
        serde_json::Value::Object(obj) => {
            let map: HashMap<String, Value> = obj.into_iter().map(|(k, v)| (k, json_to_value(v))).collect();
            Value::Object(map)
        }
    }
}

/// `FLOW_LOG` wins over `--verbose`.
fn init_logging(verbose: bool) {
    let fallback = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_env("FLOW_LOG").unwrap_or_else(|_| EnvFilter::new(fallback));
    tracing_subscriber::fmt().with_env_filter(filter).with_target(false).init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            scenario,
            input,
            verbose,
            debug,
            events,
        } => {
            init_logging(verbose);
            run_scenario(scenario, input, debug, events)?;
        }

        Commands::Scenarios => {
            list_scenarios();
        }

        Commands::Nodes => {
            list_nodes();
        }
    }

    Ok(())
}

fn run_scenario(scenario: Scenario, input: Option<String>, debug: bool, show_events: bool) -> Result<()> {
    let app: Arc<App> = if debug {
        let config = RuntimeConfig {
            debug: true,
            ..RuntimeConfig::from_env()?
        };
        Arc::new(App::with_config(config))
    } else {
        default_app()
    };

    let input = match input {
        Some(raw) => json_to_value(serde_json::from_str(&raw)?),
        None => scenario.default_input(),
    };

    println!("🚀 Running {:?}: {}", scenario, scenario.describe());
    println!("   Input: {}", input);

    let mut events = app.subscribe_events();
    let roots = scenario.build(&app, input);
    app.validate(&roots)?;
    debug!(?scenario, roots = roots.len(), "workflow wired");
    println!("   {}", app.info());
    println!();

    app.run()?;

    if show_events {
        println!("📡 Events:");
        while let Ok(event) = events.try_recv() {
            print_event(&event);
        }
        println!();
    }

    let results = app.take_results();
    println!("📤 Results:");
    for record in &results {
        println!("   {}", record);
    }
    if app.queue_len() > 0 {
        println!("   ({} entries left in the queue)", app.queue_len());
    }

    println!();
    println!("🧬 Provenance:");
    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    flowcore::provenance::dump(&mut out, &results)?;
    out.flush()?;

    Ok(())
}

fn print_event(event: &ExecutionEvent) {
    match event {
        ExecutionEvent::RunStarted { queued, .. } => {
            println!("  ▶️  Run started with {} queued", queued);
        }
        ExecutionEvent::RunFinished {
            outcome,
            dispatched,
            duration_ms,
            ..
        } => {
            println!("  ✨ Run finished ({:?}): {} dispatched in {}ms", outcome, dispatched, duration_ms);
        }
        ExecutionEvent::StateChanged { from, to, .. } => {
            println!("  🔀 {} -> {}", from, to);
        }
        ExecutionEvent::NodeStarted { node, .. } => {
            println!("  ⚡ Starting node: {}", node);
        }
        ExecutionEvent::NodeCompleted { node, duration_ms, .. } => {
            println!("  ✅ Node {} completed in {}ms", node, duration_ms);
        }
        ExecutionEvent::NodeFailed { node, error, .. } => {
            println!("  ❌ Node {} failed: {}", node, error);
        }
        ExecutionEvent::NodeEvent { node_id, event, .. } => match event {
            NodeEvent::Info { message } => println!("     ℹ️  [{}] {}", node_id, message),
            NodeEvent::Warning { message } => println!("     ⚠️  [{}] {}", node_id, message),
            NodeEvent::Progress { percent, message } => match message {
                Some(msg) => println!("     📊 [{}] {}% - {}", node_id, percent, msg),
                None => println!("     📊 [{}] {}%", node_id, percent),
            },
        },
    }
}

fn list_scenarios() {
    println!("🗺️  Built-in workflows:");
    println!();
    for scenario in Scenario::value_variants() {
        if let Some(name) = scenario.to_possible_value() {
            println!("  • {} (input: {})", name.get_name(), scenario.default_input());
            println!("    {}", scenario.describe());
        }
    }
}

fn list_nodes() {
    println!("📦 Available Node Types:");
    println!();

    let nodes: Vec<(Box<dyn Node>, &str)> = vec![
        (Box::new(flownodes::Constant::new(Value::Null)), "Emit a fixed value"),
        (Box::new(flownodes::Increment), "Add one to a number"),
        (Box::new(flownodes::Scale::new(1.0)), "Multiply a number by a factor"),
        (Box::new(flownodes::AddConstant::new(0.0)), "Add a fixed amount to a number"),
        (Box::new(flownodes::Sum), "Sum numbers, flattening arrays"),
        (Box::new(flownodes::Concat::new("")), "Join values into a string"),
        (Box::new(flownodes::JsonParseNode), "Parse a JSON string"),
        (Box::new(flownodes::JsonStringifyNode), "Serialize a value to JSON"),
        (Box::new(flownodes::DebugNode), "Log the input and pass it through"),
        (
            Box::new(flownodes::DelayNode::new(std::time::Duration::ZERO)),
            "Sleep, then pass the input through",
        ),
    ];
    for (node, description) in &nodes {
        println!("  • {}", node.node_type());
        println!("    {}", description);
    }
}
