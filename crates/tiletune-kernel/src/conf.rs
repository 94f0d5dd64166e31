use core::fmt::{self, Display};

/// One point in the tuning search space.
///
/// Holds the number of work-items per block, which is at the same time the
/// side length of the square local staging buffer (`items * items` elements).
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TransposeConf {
    items_per_block: u32,
}

impl TransposeConf {
    /// A configuration with the given items-per-block count.
    pub fn new(items_per_block: u32) -> Self {
        Self { items_per_block }
    }

    /// The work-items-per-block count.
    pub fn items_per_block(&self) -> u32 {
        self.items_per_block
    }

    /// Replaces the work-items-per-block count.
    pub fn set_items_per_block(&mut self, items: u32) {
        self.items_per_block = items;
    }
}

impl Display for TransposeConf {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.items_per_block)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_as_bare_integer() {
        assert_eq!(TransposeConf::new(32).to_string(), "32");
    }

    #[test]
    fn set_replaces_value() {
        let mut conf = TransposeConf::default();
        assert_eq!(conf.items_per_block(), 0);
        conf.set_items_per_block(16);
        assert_eq!(conf.items_per_block(), 16);
    }
}
