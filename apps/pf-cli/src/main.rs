use clap::{Parser, Subcommand};
use pf_circuit::{Circuit, CircuitDocument, CircuitError};
use pf_core::{CircuitDomain, Fluid, Real, Thermal};
use pf_sim::{Network, NetworkSample, SimError, SimModel, SimOptions, SimRecord, run_sim};
use pf_tune::{GainMatrix, Knob, Target, TuneConfig, TuneError, tune};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
enum CliError {
    #[error("Failed to access {}: {source}", path.display())]
    Io { path: PathBuf, source: io::Error },

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Unknown circuit domain '{0}' (expected 'fluid' or 'thermal')")]
    UnknownDomain(String),

    #[error("Circuit '{circuit}' has nodes with no path to a reference: {}", nodes.join(", "))]
    FloatingNodes { circuit: String, nodes: Vec<String> },

    #[error(transparent)]
    Circuit(#[from] CircuitError),

    #[error(transparent)]
    Sim(#[from] SimError),

    #[error(transparent)]
    Tune(#[from] TuneError),
}

type CliResult<T> = Result<T, CliError>;

#[derive(Clone, Copy)]
enum DomainKind {
    Fluid,
    Thermal,
}

fn domain_of(doc: &CircuitDocument) -> CliResult<DomainKind> {
    if doc.domain == Fluid::NAME {
        Ok(DomainKind::Fluid)
    } else if doc.domain == Thermal::NAME {
        Ok(DomainKind::Thermal)
    } else {
        Err(CliError::UnknownDomain(doc.domain.clone()))
    }
}

#[derive(Parser)]
#[command(name = "pf-cli")]
#[command(about = "PhysioFlow CLI - lumped-parameter physiology circuit tool", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate a circuit file (structure, element values, connectivity)
    Validate {
        /// Path to the circuit YAML file
        circuit_path: PathBuf,
    },
    /// Run a fixed-step simulation and write the recorded states as JSON
    Run {
        /// Path to the circuit YAML file
        circuit_path: PathBuf,
        /// Time step in seconds
        #[arg(long, default_value_t = 0.02)]
        dt: f64,
        /// End time in seconds
        #[arg(long)]
        t_end: f64,
        /// Record every N-th step
        #[arg(long, default_value_t = 10)]
        record_every: usize,
        /// Output JSON file (defaults to stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Stabilize a circuit and tune its parameters toward baselines
    Tune {
        /// Path to the circuit YAML file
        circuit_path: PathBuf,
        /// Path to the tuning YAML file (config, targets, knobs, gains)
        tuning_path: PathBuf,
        /// Write the tuned circuit here as YAML
        #[arg(long)]
        save: Option<PathBuf>,
    },
}

/// Tuning setup read from YAML.
#[derive(Debug, Deserialize)]
struct TuningFile {
    #[serde(default)]
    config: TuneConfig,
    targets: Vec<Target>,
    #[serde(default)]
    knobs: Vec<Knob>,
    /// One row per knob, one column per target.
    #[serde(default)]
    gains: Vec<Vec<Real>>,
}

/// Recorded run with the names needed to read the sample vectors.
#[derive(Serialize)]
struct RunOutput<'a> {
    circuit: &'a str,
    domain: &'static str,
    nodes: Vec<&'a str>,
    paths: Vec<&'a str>,
    record: SimRecord<NetworkSample>,
}

fn main() -> CliResult<()> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Validate { circuit_path } => cmd_validate(&circuit_path),
        Commands::Run {
            circuit_path,
            dt,
            t_end,
            record_every,
            output,
        } => {
            let opts = SimOptions {
                dt,
                t_end,
                record_every,
                ..SimOptions::default()
            };
            cmd_run(&circuit_path, &opts, output.as_deref())
        }
        Commands::Tune {
            circuit_path,
            tuning_path,
            save,
        } => cmd_tune(&circuit_path, &tuning_path, save.as_deref()),
    }
}

fn read_yaml<T: serde::de::DeserializeOwned>(path: &Path) -> CliResult<T> {
    let text = fs::read_to_string(path).map_err(|source| CliError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(serde_yaml::from_str(&text)?)
}

fn write_text(path: &Path, text: &str) -> CliResult<()> {
    fs::write(path, text).map_err(|source| CliError::Io {
        path: path.to_path_buf(),
        source,
    })
}

fn cmd_validate(circuit_path: &Path) -> CliResult<()> {
    println!("Validating circuit: {}", circuit_path.display());
    let doc: CircuitDocument = read_yaml(circuit_path)?;
    match domain_of(&doc)? {
        DomainKind::Fluid => report_structure(&Circuit::<Fluid>::from_document(&doc)?),
        DomainKind::Thermal => report_structure(&Circuit::<Thermal>::from_document(&doc)?),
    }
}

/// Names of nodes that cannot reach a reference node.
fn floating_node_names<D: CircuitDomain>(circuit: &Circuit<D>) -> Vec<String> {
    circuit
        .find_floating_nodes()
        .into_iter()
        .filter_map(|id| circuit.node(id).map(|n| n.name.clone()))
        .collect()
}

fn report_structure<D: CircuitDomain>(circuit: &Circuit<D>) -> CliResult<()> {
    let floating = floating_node_names(circuit);
    if !floating.is_empty() {
        for name in &floating {
            println!("✗ Node '{name}' is floating");
        }
        return Err(CliError::FloatingNodes {
            circuit: circuit.name().to_string(),
            nodes: floating,
        });
    }
    println!("✓ Circuit '{}' is valid", circuit.name());
    println!("  Domain: {} ({}, {}, {})", D::NAME, D::POTENTIAL_UNIT, D::FLUX_UNIT, D::QUANTITY_UNIT);
    println!("  Nodes: {}", circuit.nodes().len());
    println!("  Paths: {}", circuit.paths().len());
    println!("  Reference nodes: {}", circuit.reference_nodes().count());
    Ok(())
}

fn cmd_run(circuit_path: &Path, opts: &SimOptions, output: Option<&Path>) -> CliResult<()> {
    let doc: CircuitDocument = read_yaml(circuit_path)?;
    let json = match domain_of(&doc)? {
        DomainKind::Fluid => run_network(Network::new(Circuit::<Fluid>::from_document(&doc)?), opts)?,
        DomainKind::Thermal => run_network(Network::new(Circuit::<Thermal>::from_document(&doc)?), opts)?,
    };
    match output {
        Some(path) => {
            write_text(path, &json)?;
            println!("Wrote {}", path.display());
        }
        None => println!("{json}"),
    }
    Ok(())
}

fn run_network<D>(mut model: Network<D>, opts: &SimOptions) -> CliResult<String>
where
    D: CircuitDomain,
    Network<D>: SimModel<Domain = D, Sample = NetworkSample>,
{
    let record = run_sim(&mut model, opts)?;
    let circuit = &model.circuit;
    let out = RunOutput {
        circuit: circuit.name(),
        domain: D::NAME,
        nodes: circuit.nodes().iter().map(|n| n.name.as_str()).collect(),
        paths: circuit.paths().iter().map(|p| p.name.as_str()).collect(),
        record,
    };
    Ok(serde_json::to_string_pretty(&out)?)
}

fn cmd_tune(circuit_path: &Path, tuning_path: &Path, save: Option<&Path>) -> CliResult<()> {
    let doc: CircuitDocument = read_yaml(circuit_path)?;
    let tuning: TuningFile = read_yaml(tuning_path)?;
    let tuned = match domain_of(&doc)? {
        DomainKind::Fluid => tune_network(Network::new(Circuit::<Fluid>::from_document(&doc)?), &tuning)?,
        DomainKind::Thermal => tune_network(Network::new(Circuit::<Thermal>::from_document(&doc)?), &tuning)?,
    };
    if let Some(path) = save {
        write_text(path, &serde_yaml::to_string(&tuned)?)?;
        tracing::info!(path = %path.display(), "tuned circuit saved");
        println!("Saved tuned circuit to {}", path.display());
    }
    Ok(())
}

fn tune_network<D>(mut model: Network<D>, tuning: &TuningFile) -> CliResult<CircuitDocument>
where
    D: CircuitDomain,
    Network<D>: SimModel<Domain = D>,
{
    let policy = GainMatrix::new(tuning.gains.clone());
    let report = tune(&mut model, &tuning.targets, &tuning.knobs, policy, &tuning.config)?;

    println!("✓ {}", report.summary());
    for (name, value) in &report.metrics {
        println!("  {name}: {value:.4}");
    }
    for (name, scale) in &report.scales {
        println!("  knob {name}: x{scale:.4}");
    }
    Ok(model.circuit.to_document())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pf_circuit::CircuitBuilder;

    #[test]
    fn validate_reports_floating_nodes() {
        let mut b = CircuitBuilder::<Fluid>::new("island");
        let g = b.add_reference_node("ground", 0.0);
        let a = b.add_node("a");
        let x = b.add_node("x");
        let y = b.add_node("y");
        b.add_resistor("ra", a, g, 1.0);
        b.add_resistor("xy", x, y, 1.0);
        let circuit = b.build().unwrap();

        assert_eq!(floating_node_names(&circuit), vec!["x".to_string(), "y".to_string()]);
        match report_structure(&circuit) {
            Err(CliError::FloatingNodes { circuit, nodes }) => {
                assert_eq!(circuit, "island");
                assert_eq!(nodes, ["x", "y"]);
            }
            other => panic!("expected floating nodes, got {other:?}"),
        }
    }

    #[test]
    fn connected_circuit_validates() {
        let mut b = CircuitBuilder::<Thermal>::new("core");
        let ambient = b.add_reference_node("ambient", 300.0);
        let core = b.add_node("core");
        b.add_resistor("skin", core, ambient, 0.1);
        assert!(report_structure(&b.build().unwrap()).is_ok());
    }
}
