//! Rumor Routing - sensor network simulation
//!
//! Runs the rumor routing protocol over a node layout: events fire at
//! random nodes, agents gossip routing knowledge, and periodic requests try
//! to locate events and report back.

use std::fs;
use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use rumor_routing::{scenarios, topology, SimConfig, Simulation};

#[derive(Parser)]
#[command(
    name = "rumor-routing",
    about = "Rumor routing simulation over a 2-D sensor field",
    version
)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a full simulation over a node layout file
    Run {
        /// Layout file: node count, then one `x,y` pair per line
        file: PathBuf,

        /// Number of ticks to run
        #[arg(short, long, default_value = "10000")]
        ticks: u64,

        /// RNG seed for a reproducible run
        #[arg(short, long)]
        seed: Option<u64>,

        /// Agent TTL in hops
        #[arg(long, default_value = "50")]
        agent_ttl: u32,

        /// Request TTL per attempt
        #[arg(long, default_value = "45")]
        request_ttl: u32,

        /// Number of request-origin nodes
        #[arg(long, default_value = "4")]
        request_nodes: usize,

        /// Dispatch requests every this many ticks
        #[arg(long, default_value = "400")]
        request_period: u64,

        /// Neighbor radius over the 2-D coordinates
        #[arg(long, default_value = "15.0")]
        radius: f64,

        /// Print the run statistics as JSON instead of the text summary
        #[arg(long)]
        json: bool,
    },

    /// Run the canonical two-node find-and-report scenario
    TwoNode,

    /// Run the corridor scenario (agent seeds a line, request follows)
    Corridor {
        /// Corridor length in nodes
        #[arg(short, long, default_value = "8")]
        length: usize,

        /// RNG seed
        #[arg(short, long, default_value = "42")]
        seed: u64,
    },

    /// Run a probabilistic grid scenario
    Grid {
        /// Grid width in nodes
        #[arg(long, default_value = "8")]
        width: usize,

        /// Grid height in nodes
        #[arg(long, default_value = "8")]
        height: usize,

        /// Number of ticks to run
        #[arg(short, long, default_value = "10000")]
        ticks: u64,

        /// RNG seed
        #[arg(short, long, default_value = "42")]
        seed: u64,
    },

    /// Parse a layout file and visualize its adjacency
    Topology {
        /// Layout file
        file: PathBuf,

        /// Neighbor radius over the 2-D coordinates
        #[arg(long, default_value = "15.0")]
        radius: f64,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(filter)
        .init();

    match cli.command {
        Commands::Run {
            file,
            ticks,
            seed,
            agent_ttl,
            request_ttl,
            request_nodes,
            request_period,
            radius,
            json,
        } => {
            let input = fs::read_to_string(&file)?;
            let positions = topology::parse_layout(&input)?;
            let field = topology::Field::from_positions(&positions, radius);

            let mut sim = Simulation::new(
                field,
                SimConfig {
                    max_ticks: ticks,
                    agent_ttl,
                    request_ttl,
                    request_node_count: request_nodes,
                    request_period,
                    seed,
                    ..SimConfig::default()
                },
            )?;
            sim.run();

            for report in &sim.reports {
                println!("{report}");
            }
            if json {
                println!("{}", serde_json::to_string_pretty(&sim.stats)?);
            } else {
                println!("{}", sim.summary());
            }
        }
        Commands::TwoNode => {
            scenarios::run_two_node_scenario();
        }
        Commands::Corridor { length, seed } => {
            scenarios::run_corridor_scenario(length, seed);
        }
        Commands::Grid {
            width,
            height,
            ticks,
            seed,
        } => {
            scenarios::run_grid_scenario(width, height, ticks, seed);
        }
        Commands::Topology { file, radius } => {
            let input = fs::read_to_string(&file)?;
            let positions = topology::parse_layout(&input)?;
            let field = topology::Field::from_positions(&positions, radius);
            println!("{}", field.visualize());
        }
    }

    Ok(())
}
