use clap::{Args, Parser, Subcommand, ValueEnum};
use gd_area::{AddError, Area, AreaError, GridObject, GridSystem, LayoutEntry};
use gd_core::GdError;
use gd_index::{SolverMode, StateSizes};
use gd_model::{ComponentKind, GridComponent, ModelError, StateBlock};
use serde::Serialize;
use thiserror::Error;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "gd-cli")]
#[command(about = "Grid DAE indexing CLI - size, place and inspect nested area trees", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print where every object lands in the flat solver arrays
    Layout {
        #[command(flatten)]
        tree: TreeArgs,
        /// Print the layout as JSON
        #[arg(long)]
        json: bool,
    },
    /// Print the name of every state index
    Names {
        #[command(flatten)]
        tree: TreeArgs,
    },
    /// Verify that the placement partitions the state and root arrays
    Check {
        #[command(flatten)]
        tree: TreeArgs,
    },
}

/// Shape of the synthetic tree.
#[derive(Args, Debug, Clone)]
struct TreeArgs {
    /// Solver configuration to lay out
    #[arg(long, value_enum, default_value_t = ModeArg::Dae)]
    mode: ModeArg,
    /// Nesting depth below the root area
    #[arg(long, default_value_t = 1)]
    depth: usize,
    /// Sub-areas per area
    #[arg(long, default_value_t = 2)]
    areas: usize,
    /// Buses per area
    #[arg(long, default_value_t = 2)]
    buses: usize,
    /// Generator-like components per area
    #[arg(long, default_value_t = 1)]
    models: usize,
    /// Algebraic states per generator
    #[arg(long, default_value_t = 1)]
    alg: usize,
    /// Differential states per generator
    #[arg(long, default_value_t = 2)]
    diff: usize,
    /// Relays per area
    #[arg(long, default_value_t = 1)]
    relays: usize,
    /// Algebraic states owned by every area
    #[arg(long, default_value_t = 0)]
    own: usize,
}

#[derive(ValueEnum, Debug, Clone, Copy)]
enum ModeArg {
    PowerFlow,
    Dae,
    DynAlgebraic,
    DynDifferential,
}

impl ModeArg {
    fn solver_mode(self) -> SolverMode {
        match self {
            ModeArg::PowerFlow => SolverMode::POWER_FLOW,
            ModeArg::Dae => SolverMode::DAE,
            ModeArg::DynAlgebraic => SolverMode::DYN_ALGEBRAIC,
            ModeArg::DynDifferential => SolverMode::DYN_DIFFERENTIAL,
        }
    }
}

#[derive(Error, Debug)]
enum CliError {
    #[error(transparent)]
    Area(#[from] AreaError),

    #[error(transparent)]
    Model(#[from] ModelError),

    #[error(transparent)]
    Core(#[from] GdError),

    #[error("JSON output failed: {0}")]
    Json(#[from] serde_json::Error),
}

impl From<AddError> for CliError {
    fn from(err: AddError) -> Self {
        CliError::Area(err.reason)
    }
}

type CliResult<T> = Result<T, CliError>;

#[derive(Serialize)]
struct Report<'a> {
    mode: SolverMode,
    total: StateSizes,
    max_index: Option<usize>,
    entries: &'a [LayoutEntry],
}

fn main() -> CliResult<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Layout { tree, json } => cmd_layout(&tree, json),
        Commands::Names { tree } => cmd_names(&tree),
        Commands::Check { tree } => cmd_check(&tree),
    }
}

fn build_area(name: &str, level: usize, args: &TreeArgs) -> CliResult<Area> {
    let mut area = Area::new(name).with_local_states(args.own);
    for k in 0..args.buses {
        let mut bus = StateBlock::bus(format!("bus{k}"));
        bus.set("voltage", 1.0 - 0.01 * k as f64)?;
        area.add(GridObject::terminal(bus))?;
    }
    for k in 0..args.models {
        let model = StateBlock::new(format!("gen{k}"), ComponentKind::Submodel)
            .with_states(args.alg, args.diff)
            .with_setpoint(1.0);
        area.add(GridObject::terminal(model))?;
    }
    if level < args.depth {
        for k in 0..args.areas {
            area.add(build_area(&format!("{name}_{k}"), level + 1, args)?)?;
        }
    }
    for k in 0..args.relays {
        area.add(GridObject::monitor(StateBlock::relay(format!("relay{k}"))))?;
    }
    Ok(area)
}

fn build_system(args: &TreeArgs) -> CliResult<(GridSystem, SolverMode)> {
    let root = build_area("grid", 0, args)?;
    tracing::debug!(depth = args.depth, "tree built");
    Ok((GridSystem::from_area(root), args.mode.solver_mode()))
}

fn fmt_offset(offset: Option<usize>) -> String {
    offset.map_or_else(|| "-".to_string(), |o| o.to_string())
}

fn cmd_layout(args: &TreeArgs, json: bool) -> CliResult<()> {
    let (mut system, mode) = build_system(args)?;
    let entries = system.layout(&mode);
    let report = Report {
        mode,
        total: system.sizes(&mode),
        max_index: system.max_index(&mode),
        entries: &entries,
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    println!(
        "{:<40} {:<9} {:>5} {:>5} {:>5} {:>5} {:>5} {:>6}",
        "object", "kind", "v", "a", "alg", "diff", "root", "states"
    );
    for e in report.entries {
        println!(
            "{:<40} {:<9} {:>5} {:>5} {:>5} {:>5} {:>5} {:>6}",
            e.path,
            e.kind.as_str(),
            fmt_offset(e.v_offset),
            fmt_offset(e.a_offset),
            fmt_offset(e.alg_offset),
            fmt_offset(e.diff_offset),
            fmt_offset(e.root_offset),
            e.local.state_count()
        );
    }
    println!();
    println!("  States: {}", report.total.state_count());
    println!("  Roots: {}", report.total.root_count());
    println!("  Jacobian entries: {}", report.total.jac_size);
    println!("  Max index: {}", fmt_offset(report.max_index));
    Ok(())
}

fn cmd_names(args: &TreeArgs) -> CliResult<()> {
    let (mut system, mode) = build_system(args)?;
    for (i, name) in system.state_names(&mode).iter().enumerate() {
        println!("{i:>6}  {name}");
    }
    Ok(())
}

/// Collect every occupied state and root index of the tree.
fn occupied(area: &Area, mode: &SolverMode, states: &mut Vec<usize>, roots: &mut Vec<usize>) {
    if let Some(r) = area.core().local_ranges(mode) {
        states.extend(r.states());
    }
    for sub in area.areas() {
        occupied(sub, mode, states, roots);
    }
    for child in area
        .children()
        .filter(|c| c.kind() != ComponentKind::Area && c.is_enabled())
    {
        if let Some(r) = child.core().local_ranges(mode) {
            states.extend(r.states());
            roots.extend(r.roots.clone());
        }
    }
}

fn ensure_partition(what: &str, mut indices: Vec<usize>, count: usize) -> CliResult<()> {
    indices.sort_unstable();
    if indices.iter().copied().eq(0..count) {
        return Ok(());
    }
    Err(GdError::Layout {
        what: format!("{what} indices do not partition 0..{count}"),
    }
    .into())
}

fn cmd_check(args: &TreeArgs) -> CliResult<()> {
    let (mut system, mode) = build_system(args)?;
    let total = system.sizes(&mode);
    let mut states = Vec::new();
    let mut roots = Vec::new();
    occupied(system.root(), &mode, &mut states, &mut roots);
    ensure_partition("state", states, total.state_count())?;
    ensure_partition("root", roots, total.root_count())?;
    println!(
        "✓ {} states and {} roots placed without overlap",
        total.state_count(),
        total.root_count()
    );
    Ok(())
}
