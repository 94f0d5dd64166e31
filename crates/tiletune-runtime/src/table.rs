use std::fs;
use std::io::{self, Write};
use std::path::Path;

use hashbrown::HashMap;
use tiletune_kernel::TransposeConf;

/// Best-known configurations keyed by element-type name and matrix size.
///
/// Persisted as a line-oriented text table, one record per line:
///
/// ```text
/// # M x N  items  type
/// 1024x768 32 float
/// 2048x2048 64 unsigned int
/// ```
///
/// The type name comes last so multi-word OpenCL spellings need no
/// quoting. Loading is fail-soft: malformed records are logged and
/// skipped, well-formed ones are appended to whatever the table already
/// holds. The table is only ever read and written from one thread.
#[derive(Debug, Default)]
pub struct ConfTable {
    entries: HashMap<(String, u32, u32), TransposeConf>,
}

impl ConfTable {
    /// An empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// The best-known configuration for a type and matrix size, if any.
    pub fn lookup(&self, type_name: &str, m: u32, n: u32) -> Option<TransposeConf> {
        self.entries
            .get(&(type_name.to_string(), m, n))
            .copied()
    }

    /// Records the best-known configuration for a type and matrix size,
    /// replacing any previous record.
    pub fn insert(&mut self, type_name: &str, m: u32, n: u32, conf: TransposeConf) {
        self.entries.insert((type_name.to_string(), m, n), conf);
    }

    /// Number of records in the table.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the table holds no records.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Loads records from `path`, appending to the current table.
    ///
    /// Returns the number of records added. Blank lines and `#` comments
    /// are ignored; lines that do not parse are reported through the
    /// logger and skipped without touching existing entries.
    pub fn load(&mut self, path: &Path) -> io::Result<usize> {
        let content = fs::read_to_string(path)?;
        let mut added = 0;

        for (number, line) in content.lines().enumerate() {
            let trimmed = line.trim();
            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }
            match parse_record(trimmed) {
                Some((type_name, m, n, items)) => {
                    self.insert(&type_name, m, n, TransposeConf::new(items));
                    added += 1;
                }
                None => {
                    log::warn!(
                        "{}:{}: skipping malformed record: {trimmed}",
                        path.display(),
                        number + 1
                    );
                }
            }
        }

        log::info!("loaded {added} configuration(s) from {}", path.display());
        Ok(added)
    }

    /// Writes the table to `path`, one record per line, in a stable order.
    pub fn save(&self, path: &Path) -> io::Result<()> {
        let mut records: Vec<_> = self.entries.iter().collect();
        records.sort_by(|a, b| a.0.cmp(b.0));

        let mut file = fs::File::create(path)?;
        writeln!(file, "# M x N  items  type")?;
        for ((type_name, m, n), conf) in records {
            writeln!(file, "{m}x{n} {conf} {type_name}")?;
        }
        Ok(())
    }
}

/// Parses `MxN items type...` into its triple.
fn parse_record(line: &str) -> Option<(String, u32, u32, u32)> {
    let tokens: Vec<&str> = line.split_whitespace().collect();
    if tokens.len() < 3 {
        return None;
    }

    let (m, n) = tokens[0].split_once('x')?;
    let items = tokens[1].parse().ok()?;
    let type_name = tokens[2..].join(" ");
    Some((type_name, m.parse().ok()?, n.parse().ok()?, items))
}
