//! Voltaic - transient circuit simulator
//!
//! Loads a circuit record file, runs a transient simulation and writes the
//! node voltages as CSV to stdout.
//!
//! # Usage
//!
//! ```bash
//! RUST_LOG=voltaic_core=debug voltaic circuit.txt --duration 50m --node 1 --node 2
//! ```

use std::io::{self, BufWriter, Write};
use std::path::PathBuf;

use clap::Parser;
use tracing_subscriber::EnvFilter;
use voltaic_core::{
    circuit::{validate_circuit, NodeId},
    error::{Result, SimError},
    netlist::{self, parse_value},
    solver::{SimulatorConfig, DEFAULT_MAX_ITERATIONS, DEFAULT_TIMESTEP, DEFAULT_TOLERANCE},
    Simulator,
};

/// Transient circuit simulator
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the circuit record file
    #[arg(value_name = "CIRCUIT_FILE")]
    circuit_file: PathBuf,

    /// Timestep in seconds (unit prefixes allowed, e.g. 5u)
    #[arg(short, long, value_parser = parse_seconds, default_value_t = DEFAULT_TIMESTEP)]
    timestep: f64,

    /// Simulated time in seconds (unit prefixes allowed, e.g. 20m)
    #[arg(short, long, value_parser = parse_seconds, default_value_t = 0.1)]
    duration: f64,

    /// Maximum Newton-Raphson iterations per timestep
    #[arg(long, default_value_t = DEFAULT_MAX_ITERATIONS)]
    max_iterations: usize,

    /// Convergence tolerance on the solution vector
    #[arg(long, default_value_t = DEFAULT_TOLERANCE)]
    tolerance: f64,

    /// Node to include in the output (repeatable; default: all nodes)
    #[arg(short, long = "node", value_name = "N")]
    nodes: Vec<usize>,
}

fn parse_seconds(text: &str) -> std::result::Result<f64, String> {
    parse_value(text).ok_or_else(|| format!("invalid time value '{text}'"))
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .init();

    let args = Args::parse();

    let circuit = netlist::load_file(&args.circuit_file)?;
    validate_circuit(&circuit)?;

    for &node in &args.nodes {
        circuit.check_node(NodeId(node))?;
    }

    let config = SimulatorConfig::new()
        .with_timestep(args.timestep)
        .with_max_iterations(args.max_iterations)
        .with_tolerance(args.tolerance);
    let mut simulator = Simulator::with_config(circuit, config)?;

    let trace = simulator.run_until(args.duration)?;

    let nodes: Vec<NodeId> = args.nodes.iter().copied().map(NodeId).collect();
    let stdout = io::stdout();
    let mut out = BufWriter::new(stdout.lock());
    trace.write_csv(&mut out, &nodes)?;
    out.flush().map_err(|e| SimError::Output {
        message: e.to_string(),
    })?;

    Ok(())
}
