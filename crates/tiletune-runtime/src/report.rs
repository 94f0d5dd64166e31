use core::fmt::{self, Display};

use tiletune_kernel::TransposeConf;

/// Header line preceding the per-candidate report rows.
pub const REPORT_HEADER: &str = "# M N nrItemsPerBlock GB/s GB/s_err time time_err COV";

/// Aggregate measurements for one evaluated candidate.
#[derive(Debug, Clone)]
pub struct CandidateRow {
    /// Logical row extent of the input.
    pub m: u32,
    /// Logical column extent of the input.
    pub n: u32,
    /// The candidate configuration.
    pub conf: TransposeConf,
    /// Mean throughput in GB/s across the timed iterations.
    pub gbs_mean: f64,
    /// Throughput standard deviation in GB/s.
    pub gbs_std_dev: f64,
    /// Mean elapsed time per iteration in seconds.
    pub time_mean: f64,
    /// Elapsed-time standard deviation in seconds.
    pub time_std_dev: f64,
    /// Elapsed-time coefficient of variation.
    pub time_cov: f64,
}

impl Display for CandidateRow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} {} {:.3} {:.3} {:.6} {:.6} {:.6}",
            self.m,
            self.n,
            self.conf,
            self.gbs_mean,
            self.gbs_std_dev,
            self.time_mean,
            self.time_std_dev,
            self.time_cov
        )
    }
}
