use std::time::Instant;

use derive_new::new;
use tiletune_common::{giga, pad, OnlineStats};
use tiletune_kernel::{TransposeConf, TransposeKernel};

use crate::{BufferAccess, CandidateRow, ComputeServer, ServerError};

/// The fixed problem shape of one tuning run.
#[derive(Debug, Clone, new)]
pub struct Problem {
    /// Logical row extent of the input.
    pub m: u32,
    /// Logical column extent of the input (fast-varying dimension).
    pub n: u32,
    /// Alignment granularity for row starts.
    pub padding: u32,
    /// SIMD lane count of the target execution units.
    pub vector: u32,
    /// OpenCL C spelling of the element type, emitted verbatim.
    pub type_name: String,
    /// Width of one element in bytes.
    pub elem_size: usize,
}

impl Problem {
    /// Host/device size of the input buffer in bytes.
    pub fn input_bytes(&self) -> usize {
        self.m as usize * pad(self.n as usize, self.padding as usize) * self.elem_size
    }

    /// Host/device size of the output buffer in bytes.
    pub fn output_bytes(&self) -> usize {
        self.n as usize * pad(self.m as usize, self.padding as usize) * self.elem_size
    }

    /// The generator for one candidate configuration of this problem.
    pub fn kernel(&self, conf: TransposeConf) -> TransposeKernel {
        TransposeKernel::new(
            conf,
            self.m,
            self.n,
            self.padding,
            self.vector,
            self.type_name.clone(),
        )
    }
}

/// Bounds and settings of one sweep.
#[derive(Debug, Clone)]
pub struct SweepOptions {
    /// Smallest tile to consider.
    pub min_tile: u32,
    /// Largest tile to consider.
    pub max_tile: u32,
    /// Increment between considered tiles (commonly the vector width).
    pub step: u32,
    /// Timed iterations per candidate (one warm-up run comes extra).
    pub iterations: u32,
    /// Options handed to the device compiler.
    pub build_options: String,
    /// Whether to print every candidate's kernel source to stdout.
    pub print_code: bool,
}

/// Everything a finished sweep produced.
#[derive(Debug, Clone)]
pub struct SweepOutcome {
    /// One row per candidate that compiled and ran to completion.
    pub rows: Vec<CandidateRow>,
    /// The row with the best mean throughput, if any candidate survived.
    pub best: Option<CandidateRow>,
}

/// Candidate tiles for a sweep over `m`: every `step`-aligned value in
/// `[min_tile, max_tile]` that divides `m` evenly, in ascending order.
/// An empty result is a valid, if unhelpful, outcome.
pub fn candidates(m: u32, opts: &SweepOptions) -> Vec<u32> {
    let mut tiles = Vec::new();
    if opts.step == 0 {
        log::warn!("tile step of 0 enumerates nothing");
        return tiles;
    }

    let mut tile = opts.min_tile;
    while tile <= opts.max_tile {
        if tile != 0 && m % tile == 0 {
            tiles.push(tile);
        }
        tile += opts.step;
    }
    tiles
}

/// Runs one autotuning sweep for the given problem.
///
/// Candidates run strictly one after another against the same pair of
/// device buffers; `input` is uploaded once before the first candidate.
/// A candidate whose compilation or execution fails is logged and
/// skipped; a fatal device error aborts the sweep and is returned.
///
/// # Panics
///
/// Panics when `input` does not match [`Problem::input_bytes`].
pub fn sweep<S: ComputeServer>(
    server: &mut S,
    problem: &Problem,
    opts: &SweepOptions,
    input: &[u8],
) -> Result<SweepOutcome, ServerError> {
    assert_eq!(
        input.len(),
        problem.input_bytes(),
        "input does not match the problem shape"
    );

    let mut input_buffer = server.create_buffer(problem.input_bytes(), BufferAccess::ReadOnly)?;
    server.write_buffer(&mut input_buffer, input)?;
    let mut output_buffer = server.create_buffer(problem.output_bytes(), BufferAccess::WriteOnly)?;

    let tiles = candidates(problem.m, opts);
    log::info!(
        "sweeping {} candidate(s) for {}x{} {}",
        tiles.len(),
        problem.m,
        problem.n,
        problem.type_name
    );

    let mut rows = Vec::with_capacity(tiles.len());

    'candidates: for tile in tiles {
        let conf = TransposeConf::new(tile);
        let kernel = problem.kernel(conf);
        let source = kernel.source();
        if opts.print_code {
            println!("{source}");
        }

        let compiled = match server.compile(TransposeKernel::ENTRY_POINT, &source, &opts.build_options)
        {
            Ok(compiled) => compiled,
            Err(err) if err.is_fatal() => return Err(err),
            Err(err) => {
                log::warn!("skipping candidate {conf}: {err}");
                continue;
            }
        };

        let work = kernel.work_size();
        let bytes = kernel.bytes_moved(problem.elem_size);
        let mut time_stats = OnlineStats::new();
        let mut gbs_stats = OnlineStats::new();

        // Warm-up run, absorbing one-time compilation and caching latency.
        if let Err(err) = server.launch(&compiled, &work, &input_buffer, &mut output_buffer) {
            if err.is_fatal() {
                return Err(err);
            }
            log::warn!("skipping candidate {conf}: {err}");
            continue;
        }

        for _ in 0..opts.iterations {
            let started = Instant::now();
            if let Err(err) = server.launch(&compiled, &work, &input_buffer, &mut output_buffer) {
                if err.is_fatal() {
                    return Err(err);
                }
                log::warn!("skipping candidate {conf}: {err}");
                continue 'candidates;
            }
            let seconds = started.elapsed().as_secs_f64();
            time_stats.add(seconds);
            gbs_stats.add(giga(bytes) / seconds);
        }

        let row = CandidateRow {
            m: problem.m,
            n: problem.n,
            conf,
            gbs_mean: gbs_stats.mean(),
            gbs_std_dev: gbs_stats.std_dev(),
            time_mean: time_stats.mean(),
            time_std_dev: time_stats.std_dev(),
            time_cov: time_stats.coefficient_of_variation(),
        };
        log::debug!("measured {row}");
        rows.push(row);
    }

    let best = select_best(&rows).cloned();
    Ok(SweepOutcome { rows, best })
}

/// The row with the highest mean throughput; ties resolve to the lower
/// throughput spread, then to the earlier (smaller) tile.
fn select_best(rows: &[CandidateRow]) -> Option<&CandidateRow> {
    let mut best: Option<&CandidateRow> = None;
    for row in rows {
        let better = match best {
            None => true,
            Some(current) => {
                row.gbs_mean > current.gbs_mean
                    || (row.gbs_mean == current.gbs_mean && row.gbs_std_dev < current.gbs_std_dev)
            }
        };
        if better {
            best = Some(row);
        }
    }
    best
}
