use clap::Parser;
use lattice_gather::build_info;
use lattice_gather::checks;
use lattice_gather::comm::*;
use lattice_gather::field::*;
use lattice_gather::gather::*;
use lattice_gather::geometry::*;
use lattice_gather::params::*;
use lattice_gather::partition::*;
use lattice_gather::pipeline::*;
use lattice_gather::stencil::*;
use lattice_gather::util::*;
use rand::Rng;
use tracing_subscriber::EnvFilter;

/// Halo exchange demo on a 4D lattice split over in-process nodes.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
pub struct Args {
    /// Number of nodes, each one runs on its own thread.
    #[arg(short, long, default_value = "2")]
    pub nodes: usize,

    /// Lattice extents, comma separated.
    #[arg(short, long, value_delimiter = ',', num_args = 4, default_value = "8,8,8,8")]
    pub extents: Vec<i32>,

    /// Seed for the per-site generators.
    #[arg(short, long, default_value = "1")]
    pub seed: u64,

    /// Chunk size to use for parallelism.
    #[arg(short, long, default_value = "1000")]
    pub chunk_size: usize,

    /// The number of threads per node, 0 lets rayon decide.
    #[arg(short, long, default_value = "0")]
    pub threads: usize,

    /// How the stencil terms are scheduled.
    #[arg(short, long, default_value = "pipelined")]
    pub mode: PipelineMode,

    /// Antiperiodic boundary in the last dimension.
    #[arg(long)]
    pub antiperiodic: bool,

    /// Print build information and quit
    #[arg(long)]
    pub build_info: bool,
}

impl Args {
    pub fn lattice_parameters(&self) -> LatticeParameters<4> {
        let mut boundaries = [Boundary::Periodic; 4];
        if self.antiperiodic {
            boundaries[3] = Boundary::Antiperiodic;
        }
        LatticeParameters::new(Coord::from_column_slice(&self.extents), self.nodes)
            .with_seed(self.seed)
            .with_chunk_size(self.chunk_size)
            .with_boundaries(boundaries)
    }
}

#[derive(Debug)]
struct NodeSummary {
    sites: usize,
    field_sum: f64,
    operator_sum: f64,
    sequential_matches: bool,
}

fn product(_: &Term, _: &Site<4>, values: &TermValues<'_>) -> f64 {
    values.all::<f64>().product()
}

fn main() {
    let args = Args::parse();
    if args.build_info {
        build_info::print_report("halo_demo", args.nodes);
        return;
    }

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    #[cfg(feature = "profile-with-puffin")]
    let _puffin_server = {
        let server_addr = format!("127.0.0.1:{}", puffin_http::DEFAULT_PORT);
        println!("Run this to view profiling data:  puffin_viewer {server_addr}");
        profiling::puffin::set_scopes_on(true);
        puffin_http::Server::new(&server_addr).unwrap()
    };

    if args.threads > 0 {
        rayon::ThreadPoolBuilder::new()
            .num_threads(args.threads)
            .thread_name(|i| format!("rayon_thread_{}", i))
            .build_global()
            .unwrap();
    }

    let params = args.lattice_parameters();
    let geometry = match Geometry::new(&params) {
        Ok(g) => g,
        Err(e) => {
            eprintln!("ERROR: {}", e);
            std::process::exit(1);
        }
    };
    build_info::print_report("halo_demo", geometry.number_of_nodes());

    let summaries = launch(params.nodes, |comm| {
        let mut partition: Partition<4> =
            Partition::build(geometry.clone(), comm.this_node(), &params);
        partition.print_report();

        let operator = StencilOperator::from_capabilities(
            &mut partition,
            &[
                Capability::NeighborSum,
                Capability::Gradient,
                Capability::DiagonalPairs,
            ],
        );
        let phi = {
            let mut values = Vec::with_capacity(partition.sites_on_node());
            for mut site in partition.sites_mut() {
                let v = site.prn_mut().map_or(0.0, |rng| rng.gen_range(-1.0..1.0));
                values.push(v);
            }
            Field::from_vec(values)
        };
        let chi = Field::from_fn(&partition, |s| s.coord().sum() as f64);

        let mut engine =
            GatherEngine::new(&partition, comm, params.slots).unwrap();

        let mut pipelined = vec![Field::new(&partition); operator.outputs()];
        operator.apply(
            &StencilPipeline::new(args.mode),
            &mut engine,
            &[&phi, &chi],
            product,
            &mut pipelined,
            ParityFilter::EvenAndOdd,
        );
        let mut sequential = vec![Field::new(&partition); operator.outputs()];
        operator.apply(
            &StencilPipeline::new(PipelineMode::Sequential),
            &mut engine,
            &[&phi, &chi],
            product,
            &mut sequential,
            ParityFilter::EvenAndOdd,
        );

        let closed = [
            Direction::Forward(0),
            Direction::Forward(3),
            Direction::Backward(0),
            Direction::Backward(3),
        ];
        let transported = shift_along_path(&mut engine, &phi, &closed);
        checks::check_residual(
            "plaquette transport",
            checks::max_abs_difference(phi.as_slice(), transported.as_slice()),
            checks::DEFAULT_TOLERANCE,
        );

        let local_field: f64 = phi.as_slice().iter().sum();
        let local_operator: f64 = pipelined.iter().map(|f| f.as_slice().iter().sum::<f64>()).sum();
        let comm = engine.comm_mut();
        let totals = {
            let mut v = [local_field, local_operator, partition.sites_on_node() as f64];
            comm.sum_f64_slice(&mut v);
            v
        };
        NodeSummary {
            sites: totals[2] as usize,
            field_sum: totals[0],
            operator_sum: totals[1],
            sequential_matches: pipelined == sequential,
        }
    });

    let first = &summaries[0];
    println!("Halo Demo Report:");
    println!("  lattice sites: {}", first.sites);
    println!("  sum of phi: {:.6}", first.field_sum);
    println!("  sum of operator outputs: {:.6}", first.operator_sum);
    println!(
        "  pipelined matches sequential on all nodes: {}",
        summaries.iter().all(|s| s.sequential_matches)
    );
}
