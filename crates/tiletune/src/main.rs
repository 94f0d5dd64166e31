//! Command-line surface of the transpose autotuner.
//!
//! `tune` sweeps tile candidates for one problem size and reports the
//! fastest configuration, `check` validates one generated kernel against
//! the reference transpose, and `print-code` emits the generated source.

use std::error::Error;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand, ValueEnum};
use rand::Rng;

use tiletune::{
    candidates, sweep, BufferAccess, ComputeServer, ConfTable, CpuServer, ElemType, GlobalConfig,
    Problem, SweepOptions, SweepOutcome, TransposeConf, TransposeKernel, REPORT_HEADER,
};

#[derive(Parser)]
#[command(name = "tiletune")]
#[command(about = "Autotuner for tiled OpenCL matrix-transpose kernels")]
#[command(version)]
struct Cli {
    /// Log level when RUST_LOG is not set (error, warn, info, debug, trace)
    #[arg(long, value_name = "LEVEL", global = true, default_value = "warn")]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Sweep tile candidates and report the fastest configuration
    Tune(TuneArgs),
    /// Run one generated kernel and count mismatches against the reference
    Check(CheckArgs),
    /// Print the generated kernel source for one configuration
    PrintCode(PrintCodeArgs),
}

/// The problem shape shared by every subcommand.
#[derive(Args, Clone)]
struct ProblemArgs {
    /// Rows of the input matrix
    #[arg(short = 'M', value_name = "ROWS")]
    m: u32,

    /// Columns of the input matrix (the fast-varying dimension)
    #[arg(short = 'N', value_name = "COLS")]
    n: u32,

    /// Alignment granularity for row starts, in elements
    #[arg(long, default_value_t = 32)]
    padding: u32,

    /// Vector width of the target execution units
    #[arg(long, default_value_t = 32)]
    vector: u32,

    /// Element type (OpenCL C scalar name)
    #[arg(long = "type", value_name = "TYPE", default_value = "float")]
    elem_type: ElemType,
}

impl ProblemArgs {
    fn problem(&self) -> Result<Problem, Box<dyn Error>> {
        if self.m == 0 || self.n == 0 {
            return Err("matrix dimensions must be positive".into());
        }
        Ok(Problem::new(
            self.m,
            self.n,
            self.padding,
            self.vector,
            self.elem_type.cl_name().to_string(),
            self.elem_type.size(),
        ))
    }
}

#[derive(Args, Clone)]
struct DeviceArgs {
    /// OpenCL platform index
    #[arg(long, default_value_t = 0)]
    platform: usize,

    /// OpenCL device index
    #[arg(long, default_value_t = 0)]
    device: usize,

    /// Execution backend
    #[arg(long, value_enum, default_value_t = Backend::default())]
    backend: Backend,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum Backend {
    /// The OpenCL device selected by --platform/--device
    Opencl,
    /// The sequential host transpose (no accelerator involved)
    Host,
}

impl Default for Backend {
    fn default() -> Self {
        if cfg!(feature = "opencl") {
            Backend::Opencl
        } else {
            Backend::Host
        }
    }
}

#[derive(Args)]
struct TuneArgs {
    #[command(flatten)]
    problem: ProblemArgs,

    #[command(flatten)]
    device: DeviceArgs,

    /// Timed iterations per candidate (defaults from tiletune.toml)
    #[arg(long)]
    iterations: Option<u32>,

    /// Smallest tile to try
    #[arg(long, default_value_t = 8)]
    min_tile: u32,

    /// Largest tile to try
    #[arg(long)]
    max_tile: u32,

    /// Step between tiles; defaults to the vector width
    #[arg(long)]
    step: Option<u32>,

    /// Print every candidate's kernel source to stdout
    #[arg(long)]
    print_code: bool,

    /// Persist the winning configuration into this table file
    #[arg(long, value_name = "FILE")]
    save_conf: Option<PathBuf>,
}

#[derive(Args)]
struct CheckArgs {
    #[command(flatten)]
    problem: ProblemArgs,

    #[command(flatten)]
    device: DeviceArgs,

    /// Tile to check; defaults to the table's best-known configuration
    #[arg(long)]
    tile: Option<u32>,

    /// Configuration table consulted when --tile is absent
    #[arg(long, value_name = "FILE")]
    conf: Option<PathBuf>,

    /// Print the kernel source before running it
    #[arg(long)]
    print_code: bool,
}

#[derive(Args)]
struct PrintCodeArgs {
    #[command(flatten)]
    problem: ProblemArgs,

    /// Tile to generate for
    #[arg(long)]
    tile: u32,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(cli.log_level.clone()),
    )
    .init();

    let result = match cli.command {
        Command::Tune(args) => run_tune(args),
        Command::Check(args) => run_check(args),
        Command::PrintCode(args) => run_print_code(args),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("{err}");
            ExitCode::FAILURE
        }
    }
}

fn run_tune(args: TuneArgs) -> Result<(), Box<dyn Error>> {
    let config = GlobalConfig::load();
    let problem = args.problem.problem()?;
    let opts = SweepOptions {
        min_tile: args.min_tile,
        max_tile: args.max_tile,
        step: args.step.unwrap_or(args.problem.vector),
        iterations: args.iterations.unwrap_or(config.tuning.iterations),
        build_options: config.tuning.build_options.clone(),
        print_code: args.print_code,
    };

    if candidates(problem.m, &opts).is_empty() {
        log::warn!(
            "no tile in [{}, {}] stepped by {} divides M = {}",
            opts.min_tile,
            opts.max_tile,
            opts.step,
            problem.m
        );
    }

    let input = random_input(&problem, args.problem.elem_type);
    let outcome = sweep_on_backend(&args.device, &problem, &opts, &input)?;

    println!();
    println!("{REPORT_HEADER}");
    println!();
    for row in &outcome.rows {
        println!("{row}");
    }
    println!();

    match &outcome.best {
        Some(best) => {
            println!("best configuration: {}", best.conf);
            if let Some(path) = &args.save_conf {
                let mut table = ConfTable::new();
                if path.exists() {
                    table.load(path)?;
                }
                table.insert(&problem.type_name, problem.m, problem.n, best.conf);
                table.save(path)?;
                println!("saved to {}", path.display());
            }
        }
        None => println!("no candidate survived the sweep"),
    }

    Ok(())
}

fn run_check(args: CheckArgs) -> Result<(), Box<dyn Error>> {
    let config = GlobalConfig::load();
    let problem = args.problem.problem()?;

    let tile = match args.tile {
        Some(tile) => tile,
        None => {
            let mut table = ConfTable::new();
            let path = args
                .conf
                .clone()
                .or_else(|| config.table.file.clone())
                .ok_or("no --tile given and no configuration table to consult")?;
            table.load(&path)?;
            table
                .lookup(&problem.type_name, problem.m, problem.n)
                .ok_or_else(|| {
                    format!(
                        "no table entry for {} {}x{}",
                        problem.type_name, problem.m, problem.n
                    )
                })?
                .items_per_block()
        }
    };

    if args.device.backend == Backend::Host {
        log::warn!("the host backend checks the harness itself, not a device");
    }

    let kernel = problem.kernel(TransposeConf::new(tile));
    if args.print_code {
        println!("{kernel}");
    }

    let input = random_input(&problem, args.problem.elem_type);
    let output = run_once_on_backend(
        &args.device,
        &problem,
        &kernel,
        &input,
        &config.tuning.build_options,
    )?;

    let (wrong, total) = count_mismatches(&problem, &input, &output);
    println!();
    println!("Wrong samples: {wrong} ({}%).", (wrong * 100) / total);
    println!();
    Ok(())
}

fn run_print_code(args: PrintCodeArgs) -> Result<(), Box<dyn Error>> {
    let problem = args.problem.problem()?;
    let kernel = problem.kernel(TransposeConf::new(args.tile));
    println!("{kernel}");
    Ok(())
}

/// Counts elements of the device output that differ from the reference
/// transpose of `input`. Elements only move, so bytewise comparison is
/// exact for every element type.
fn count_mismatches(problem: &Problem, input: &[u8], output: &[u8]) -> (u64, u64) {
    let es = problem.elem_size;
    let padded_n = tiletune::pad(problem.n as usize, problem.padding as usize);
    let padded_m = tiletune::pad(problem.m as usize, problem.padding as usize);

    let mut wrong = 0u64;
    for i in 0..problem.m as usize {
        for j in 0..problem.n as usize {
            let src = ((i * padded_n) + j) * es;
            let dst = ((j * padded_m) + i) * es;
            if input[src..src + es] != output[dst..dst + es] {
                wrong += 1;
            }
        }
    }
    (wrong, problem.m as u64 * problem.n as u64)
}

/// Fills the padded input region with small random values, matching the
/// original tooling's `rand() % 10` seeds.
fn random_input(problem: &Problem, elem: ElemType) -> Vec<u8> {
    let len = problem.input_bytes() / elem.size();
    let mut rng = rand::thread_rng();

    fn fill<T: bytemuck::Pod>(len: usize, mut next: impl FnMut() -> T) -> Vec<u8> {
        let values: Vec<T> = (0..len).map(|_| next()).collect();
        bytemuck::cast_slice(&values).to_vec()
    }

    match elem {
        ElemType::Char => fill(len, || rng.gen_range(0i8..10)),
        ElemType::UChar => fill(len, || rng.gen_range(0u8..10)),
        ElemType::Short => fill(len, || rng.gen_range(0i16..10)),
        ElemType::UShort => fill(len, || rng.gen_range(0u16..10)),
        ElemType::Int => fill(len, || rng.gen_range(0i32..10)),
        ElemType::UInt => fill(len, || rng.gen_range(0u32..10)),
        ElemType::Long => fill(len, || rng.gen_range(0i64..10)),
        ElemType::ULong => fill(len, || rng.gen_range(0u64..10)),
        ElemType::Float => fill(len, || rng.gen_range(0.0f32..10.0)),
        ElemType::Double => fill(len, || rng.gen_range(0.0f64..10.0)),
    }
}

fn sweep_on_backend(
    device: &DeviceArgs,
    problem: &Problem,
    opts: &SweepOptions,
    input: &[u8],
) -> Result<SweepOutcome, Box<dyn Error>> {
    match device.backend {
        Backend::Host => {
            let mut server = host_server(problem);
            Ok(sweep(&mut server, problem, opts, input)?)
        }
        Backend::Opencl => {
            #[cfg(feature = "opencl")]
            {
                let mut server = opencl_server(device)?;
                Ok(sweep(&mut server, problem, opts, input)?)
            }
            #[cfg(not(feature = "opencl"))]
            {
                Err(no_opencl_support(device))
            }
        }
    }
}

fn run_once_on_backend(
    device: &DeviceArgs,
    problem: &Problem,
    kernel: &TransposeKernel,
    input: &[u8],
    build_options: &str,
) -> Result<Vec<u8>, Box<dyn Error>> {
    match device.backend {
        Backend::Host => {
            let mut server = host_server(problem);
            Ok(execute_once(&mut server, problem, kernel, input, build_options)?)
        }
        Backend::Opencl => {
            #[cfg(feature = "opencl")]
            {
                let mut server = opencl_server(device)?;
                Ok(execute_once(&mut server, problem, kernel, input, build_options)?)
            }
            #[cfg(not(feature = "opencl"))]
            {
                Err(no_opencl_support(device))
            }
        }
    }
}

/// One compile-upload-launch-download round trip.
fn execute_once<S: ComputeServer>(
    server: &mut S,
    problem: &Problem,
    kernel: &TransposeKernel,
    input: &[u8],
    build_options: &str,
) -> Result<Vec<u8>, tiletune::ServerError> {
    let compiled = server.compile(TransposeKernel::ENTRY_POINT, &kernel.source(), build_options)?;
    let mut input_buffer = server.create_buffer(problem.input_bytes(), BufferAccess::ReadOnly)?;
    server.write_buffer(&mut input_buffer, input)?;
    let mut output_buffer = server.create_buffer(problem.output_bytes(), BufferAccess::WriteOnly)?;

    server.launch(&compiled, &kernel.work_size(), &input_buffer, &mut output_buffer)?;

    let mut output = vec![0u8; problem.output_bytes()];
    server.read_buffer(&output_buffer, &mut output)?;
    Ok(output)
}

fn host_server(problem: &Problem) -> CpuServer {
    CpuServer::new(
        problem.m as usize,
        problem.n as usize,
        problem.padding as usize,
        problem.elem_size,
    )
}

#[cfg(feature = "opencl")]
fn opencl_server(device: &DeviceArgs) -> Result<tiletune::opencl::OpenClServer, Box<dyn Error>> {
    let selected = tiletune::opencl::OpenClDevice::from_indices(device.platform, device.device)?;
    Ok(tiletune::opencl::OpenClServer::new(selected)?)
}

#[cfg(not(feature = "opencl"))]
fn no_opencl_support(device: &DeviceArgs) -> Box<dyn Error> {
    format!(
        "this build has no OpenCL support (requested platform {}, device {}); rebuild with --features opencl",
        device.platform, device.device
    )
    .into()
}
