use core::fmt::{self, Display};

use tiletune_common::pad;

use crate::TransposeConf;

/// Condition under which a kernel statement fragment is emitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Emit {
    /// Part of every kernel variant.
    Always,
    /// Only when the work-group spans more than one hardware vector
    /// (`tile > vector`), i.e. when lockstep execution cannot be assumed.
    MultiVector,
    /// Only when the work-group is exactly one hardware vector.
    Lockstep,
    /// Only when the work-group is not exactly one hardware vector.
    NonLockstep,
}

impl Emit {
    /// Whether fragments with this tag belong to the kernel built for the
    /// given tile and vector width.
    pub fn applies(self, tile: u32, vector: u32) -> bool {
        match self {
            Emit::Always => true,
            Emit::MultiVector => needs_barrier(tile, vector),
            Emit::Lockstep => tile == vector,
            Emit::NonLockstep => tile != vector,
        }
    }
}

/// One kernel statement (or statement group) plus its emission condition.
#[derive(Debug, Clone)]
pub struct Fragment {
    /// When this fragment is part of the rendered kernel.
    pub emit: Emit,
    /// The statement text, without a trailing newline.
    pub text: String,
}

/// Whether explicit work-group barriers are required between the load,
/// rotate and store phases. With `tile <= vector` all lanes of the group
/// execute in lockstep and the phases cannot overtake each other; relying
/// on that is an optimization that is only safe while the lockstep
/// guarantee actually holds on the target hardware.
pub const fn needs_barrier(tile: u32, vector: u32) -> bool {
    tile > vector
}

/// Host-side mirror of the rotation guard emitted into the kernel.
///
/// Lane `lane` swaps the cell pair it reaches at rotation step `i` only
/// when this returns true. For `tile != vector` the guard admits each pair
/// exactly once: a pair at cyclic distance `d` is reached by one lane at
/// `i = d` and by the opposite lane at `i = tile - d`, and the
/// `i < tile - tile/2` bound cuts off the second visit (for even tiles the
/// `d == tile/2` pairs are reached twice at `i == tile/2`, where only the
/// lanes below the diagonal act). For `tile == vector` the guard is
/// trivially true: both visits execute simultaneously in lockstep and net
/// out to a single exchange.
pub const fn swap_permitted(tile: u32, vector: u32, i: u32, lane: u32) -> bool {
    if tile == vector {
        i < tile || lane < tile / 2
    } else {
        i < tile - tile / 2 || lane < tile / 2
    }
}

/// Generator for one tiled-transpose kernel variant.
///
/// Maps a tuning configuration and a fixed problem shape to OpenCL C text.
/// The statements are kept as an ordered fragment list, each tagged with
/// its emission condition; rendering filters the list against the actual
/// tile and vector width and joins the survivors. Generation itself cannot
/// fail: a nonsensical configuration (such as a zero tile) yields text the
/// device compiler rejects.
#[derive(Debug, Clone)]
pub struct TransposeKernel {
    conf: TransposeConf,
    m: u32,
    n: u32,
    padding: u32,
    vector: u32,
    type_name: String,
}

/// Launch geometry for one kernel dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkSize {
    /// Global work size per dimension.
    pub global: [usize; 2],
    /// Local (work-group) size per dimension.
    pub local: [usize; 2],
}

impl TransposeKernel {
    /// The entry-point name of every generated kernel.
    pub const ENTRY_POINT: &'static str = "transpose";

    /// A generator for the given configuration and problem shape.
    pub fn new(
        conf: TransposeConf,
        m: u32,
        n: u32,
        padding: u32,
        vector: u32,
        type_name: impl Into<String>,
    ) -> Self {
        Self {
            conf,
            m,
            n,
            padding,
            vector,
            type_name: type_name.into(),
        }
    }

    /// The configuration this variant was generated for.
    pub fn conf(&self) -> TransposeConf {
        self.conf
    }

    /// The ordered fragment list, including fragments whose condition does
    /// not hold for this configuration.
    pub fn fragments(&self) -> Vec<Fragment> {
        let tile = self.conf.items_per_block();
        let t = &self.type_name;
        let padded_n = pad(self.n as usize, self.padding as usize);
        let padded_m = pad(self.m as usize, self.padding as usize);
        let n = self.n;
        let half = tile / 2;

        let mut fragments = Vec::with_capacity(9);
        let mut frag = |emit: Emit, text: String| fragments.push(Fragment { emit, text });

        frag(
            Emit::Always,
            format!(
                "__kernel void {name}(__global const {t} * const restrict input, __global {t} * const restrict output) {{\n\
                 const unsigned int baseM = get_group_id(0) * {tile};\n\
                 const unsigned int baseN = get_group_id(1) * {tile};\n\
                 __local {t} tempStorage[{elements}];",
                name = Self::ENTRY_POINT,
                elements = tile * tile,
            ),
        );
        frag(
            Emit::Always,
            format!(
                "for ( unsigned int m = 0; m < {tile}; m++ ) {{\n\
                 if ( baseN + get_local_id(0) < {n} ) {{\n\
                 tempStorage[(m * {tile}) + get_local_id(0)] = input[((baseM + m) * {padded_n}) + (baseN + get_local_id(0))];\n\
                 }}\n\
                 }}",
            ),
        );
        frag(Emit::MultiVector, "barrier(CLK_LOCAL_MEM_FENCE);".to_string());
        frag(
            Emit::Always,
            format!(
                "for ( unsigned int i = 1; i <= {half}; i++ ) {{\n\
                 unsigned int localItem = (get_local_id(0) + i) % {tile};\n\
                 {t} temp = 0;",
            ),
        );
        frag(
            Emit::Lockstep,
            format!("if ( (i < {tile}) || (get_local_id(0) < {half}) ) {{"),
        );
        frag(
            Emit::NonLockstep,
            format!(
                "if ( (i < {bound}) || (get_local_id(0) < {half}) ) {{",
                bound = tile - half,
            ),
        );
        frag(
            Emit::Always,
            format!(
                "temp = tempStorage[(get_local_id(0) * {tile}) + localItem];\n\
                 tempStorage[(get_local_id(0) * {tile}) + localItem] = tempStorage[(localItem * {tile}) + get_local_id(0)];\n\
                 tempStorage[(localItem * {tile}) + get_local_id(0)] = temp;\n\
                 }}\n\
                 }}",
            ),
        );
        frag(Emit::MultiVector, "barrier(CLK_LOCAL_MEM_FENCE);".to_string());
        frag(
            Emit::Always,
            format!(
                "for ( unsigned int n = 0; n < {tile}; n++ ) {{\n\
                 if ( baseN + n < {n_limit} ) {{\n\
                 output[((baseN + n) * {padded_m}) + (baseM + get_local_id(0))] = tempStorage[(n * {tile}) + get_local_id(0)];\n\
                 }}\n\
                 }}\n\
                 }}",
                n_limit = n,
            ),
        );

        fragments
    }

    /// The rendered kernel source.
    pub fn source(&self) -> String {
        self.to_string()
    }

    /// The launch geometry: one work-group column per tile of N, one
    /// work-item row per element of M.
    pub fn work_size(&self) -> WorkSize {
        let tile = self.conf.items_per_block().max(1) as usize;
        let groups_n = (self.n as usize).div_ceil(tile);
        WorkSize {
            global: [self.m as usize, groups_n],
            local: [self.conf.items_per_block() as usize, 1],
        }
    }

    /// Bytes crossing the memory bus for one execution: every logical
    /// element is read once and written once.
    pub fn bytes_moved(&self, elem_size: usize) -> u64 {
        2 * self.m as u64 * self.n as u64 * elem_size as u64
    }
}

impl Display for TransposeKernel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tile = self.conf.items_per_block();
        for fragment in self.fragments() {
            if fragment.emit.applies(tile, self.vector) {
                writeln!(f, "{}", fragment.text)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kernel(tile: u32, m: u32, n: u32, padding: u32, vector: u32) -> TransposeKernel {
        TransposeKernel::new(TransposeConf::new(tile), m, n, padding, vector, "float")
    }

    #[test]
    fn barrier_predicate_tracks_vector_width() {
        assert!(needs_barrier(64, 32));
        assert!(!needs_barrier(32, 32));
        assert!(!needs_barrier(16, 32));
    }

    #[test]
    fn emit_conditions() {
        assert!(Emit::Always.applies(8, 32));
        assert!(Emit::MultiVector.applies(64, 32));
        assert!(!Emit::MultiVector.applies(32, 32));
        assert!(!Emit::MultiVector.applies(8, 32));
        assert!(Emit::Lockstep.applies(32, 32));
        assert!(!Emit::Lockstep.applies(16, 32));
        assert!(Emit::NonLockstep.applies(16, 32));
        assert!(!Emit::NonLockstep.applies(32, 32));
    }

    #[test]
    fn barriers_only_for_multi_vector_groups() {
        let wide = kernel(64, 128, 128, 32, 32).source();
        assert_eq!(wide.matches("barrier(CLK_LOCAL_MEM_FENCE);").count(), 2);

        let lockstep = kernel(32, 128, 128, 32, 32).source();
        assert_eq!(lockstep.matches("barrier").count(), 0);

        let narrow = kernel(16, 128, 128, 32, 32).source();
        assert_eq!(narrow.matches("barrier").count(), 0);
    }

    #[test]
    fn rotation_guard_follows_lockstep_equality() {
        // tile == vector: trivially-true lockstep guard.
        let lockstep = kernel(32, 128, 128, 32, 32).source();
        assert!(lockstep.contains("if ( (i < 32) || (get_local_id(0) < 16) ) {"));

        // tile != vector: single-swap guard bounded at tile - tile/2.
        let guarded = kernel(16, 128, 128, 32, 32).source();
        assert!(guarded.contains("if ( (i < 8) || (get_local_id(0) < 8) ) {"));

        let odd = kernel(5, 125, 100, 32, 32).source();
        assert!(odd.contains("if ( (i < 3) || (get_local_id(0) < 2) ) {"));
    }

    #[test]
    fn offsets_use_padded_strides() {
        let source = kernel(4, 12, 10, 0, 32).source();
        // Unpadded: input stride is N, output stride is M.
        assert!(source.contains("input[((baseM + m) * 10) + (baseN + get_local_id(0))]"));
        assert!(source.contains("output[((baseN + n) * 12) + (baseM + get_local_id(0))]"));

        let padded = kernel(4, 12, 10, 8, 32).source();
        assert!(padded.contains("input[((baseM + m) * 16) + (baseN + get_local_id(0))]"));
        assert!(padded.contains("output[((baseN + n) * 16) + (baseM + get_local_id(0))]"));
    }

    #[test]
    fn type_name_is_emitted_verbatim() {
        let kernel = TransposeKernel::new(TransposeConf::new(8), 64, 64, 32, 32, "unsigned int");
        let source = kernel.source();
        assert!(source.contains("__global const unsigned int * const restrict input"));
        assert!(source.contains("__local unsigned int tempStorage[64];"));
        assert!(source.contains("unsigned int temp = 0;"));
    }

    #[test]
    fn work_size_covers_partial_tiles() {
        let kernel = kernel(16, 64, 50, 32, 32);
        assert_eq!(
            kernel.work_size(),
            WorkSize {
                global: [64, 4],
                local: [16, 1],
            }
        );
    }

    #[test]
    fn bytes_moved_counts_read_and_write() {
        assert_eq!(kernel(16, 64, 50, 32, 32).bytes_moved(4), 2 * 64 * 50 * 4);
    }

    #[test]
    fn full_source_for_worked_example() {
        let expected = "\
__kernel void transpose(__global const float * const restrict input, __global float * const restrict output) {
const unsigned int baseM = get_group_id(0) * 16;
const unsigned int baseN = get_group_id(1) * 16;
__local float tempStorage[256];
for ( unsigned int m = 0; m < 16; m++ ) {
if ( baseN + get_local_id(0) < 50 ) {
tempStorage[(m * 16) + get_local_id(0)] = input[((baseM + m) * 64) + (baseN + get_local_id(0))];
}
}
for ( unsigned int i = 1; i <= 8; i++ ) {
unsigned int localItem = (get_local_id(0) + i) % 16;
float temp = 0;
if ( (i < 8) || (get_local_id(0) < 8) ) {
temp = tempStorage[(get_local_id(0) * 16) + localItem];
tempStorage[(get_local_id(0) * 16) + localItem] = tempStorage[(localItem * 16) + get_local_id(0)];
tempStorage[(localItem * 16) + get_local_id(0)] = temp;
}
}
for ( unsigned int n = 0; n < 16; n++ ) {
if ( baseN + n < 50 ) {
output[((baseN + n) * 64) + (baseM + get_local_id(0))] = tempStorage[(n * 16) + get_local_id(0)];
}
}
}
";
        assert_eq!(kernel(16, 64, 50, 32, 32).source(), expected);
    }
}
