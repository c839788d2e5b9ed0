//! flowbn CLI - compile attack-flow scenario graphs into probabilistic
//! network definitions.
//!
//! Usage:
//!   flowbn <file>                     # Compile and print a summary
//!   flowbn <file> -o json             # Emit the full model as JSON
//!   flowbn <file> --max-group-size 4  # Widen partition groups

use clap::Parser;
use flowbn_core::{compile, CompileConfig, FlowGraph};
use flowbn_model::VariableKind;
use std::process;

#[derive(Parser)]
#[command(name = "flowbn")]
#[command(version)]
#[command(about = "flowbn - attack-flow to probabilistic-model compiler")]
#[command(
    long_about = "Compile attack-flow scenario graphs (actions, conditions, operators, assets) \
into probabilistic network definitions with fuzzy tactic success estimates"
)]
struct Cli {
    /// Input scenario graph (JSON)
    #[arg(value_name = "FILE")]
    file: String,

    /// Output format: summary, json, or debug
    #[arg(short, long, default_value = "summary", value_name = "FORMAT")]
    output: String,

    /// Maximum parents per partition group
    #[arg(long, default_value_t = 3, value_name = "N")]
    max_group_size: usize,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let source = match std::fs::read_to_string(&cli.file) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Error reading file '{}': {}", cli.file, e);
            process::exit(1);
        }
    };

    let flow: FlowGraph = match serde_json::from_str(&source) {
        Ok(f) => f,
        Err(e) => {
            eprintln!("Error parsing '{}': {}", cli.file, e);
            process::exit(1);
        }
    };

    let config = CompileConfig::default().with_max_group_size(cli.max_group_size);
    let model = match compile(&flow, &config) {
        Ok(m) => m,
        Err(e) => {
            eprintln!("Compilation error: {}", e);
            process::exit(1);
        }
    };

    match cli.output.as_str() {
        "json" => {
            let doc = serde_json::json!({
                "network": model.network,
                "recommendations": model.recommendations,
                "groups": model.groups,
            });
            match serde_json::to_string_pretty(&doc) {
                Ok(json) => println!("{}", json),
                Err(e) => {
                    eprintln!("Error serializing to JSON: {}", e);
                    process::exit(1);
                }
            }
        }
        "debug" => {
            println!("{:#?}", model.network);
        }
        _ => print_summary(&cli.file, &model),
    }
}

fn print_summary(file: &str, model: &flowbn_core::CompiledModel) {
    println!("✓ Compiled '{}' successfully\n", file);

    let gates = model
        .network
        .variables()
        .iter()
        .filter(|v| v.kind == VariableKind::NoisyMax)
        .count();
    println!(
        "Network: {} variables ({} noisy-max gates), {} arcs",
        model.network.variables().len(),
        gates,
        model.network.arcs().len()
    );

    if !model.groups.partitions.is_empty() {
        println!("\nPartitions:");
        for p in &model.groups.partitions {
            println!("  {}: {} groups", p.node_id, p.groups.len());
        }
    }
    if !model.groups.divorces.is_empty() {
        println!("\nDivorce hubs:");
        for d in &model.groups.divorces {
            println!("  {}: {} children", d.node_id, d.children.len());
        }
    }
    if !model.groups.logics.is_empty() {
        println!("\nLogic operators:");
        for l in &model.groups.logics {
            println!("  {}: {:?} over {} parents", l.node_id, l.op, l.parents.len());
        }
    }

    if !model.recommendations.is_empty() {
        println!("\nRecommendations:");
        for r in &model.recommendations {
            let mut notes = Vec::new();
            if r.actions.partition {
                notes.push(format!("partition parents ({} parents)", r.parent_count));
            }
            if r.actions.divorce {
                notes.push(format!("divorce children ({} children)", r.child_count));
            }
            if let Some(logic) = r.actions.logic {
                notes.push(format!("logic {:?}", logic));
            }
            println!("  {}: {}", r.node_id, notes.join(", "));
        }
    }
}
