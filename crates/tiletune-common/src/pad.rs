/// Rounds `value` up to the next multiple of `factor`.
///
/// A `factor` of zero or one leaves `value` unchanged. Every buffer offset
/// in this workspace goes through the padded extent of the dimension it
/// indexes, never the logical extent.
pub const fn pad(value: usize, factor: usize) -> usize {
    if factor <= 1 {
        value
    } else {
        value + ((factor - (value % factor)) % factor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exact_multiples_are_unchanged() {
        assert_eq!(pad(0, 32), 0);
        assert_eq!(pad(32, 32), 32);
        assert_eq!(pad(64, 32), 64);
        assert_eq!(pad(12, 4), 12);
    }

    #[test]
    fn rounds_up_to_next_multiple() {
        assert_eq!(pad(1, 32), 32);
        assert_eq!(pad(33, 32), 64);
        assert_eq!(pad(50, 32), 64);
        assert_eq!(pad(5, 3), 6);
    }

    #[test]
    fn degenerate_factors_are_identity() {
        for value in [0usize, 1, 7, 1024] {
            assert_eq!(pad(value, 0), value);
            assert_eq!(pad(value, 1), value);
        }
    }

    #[test]
    fn idempotent() {
        for factor in 1..=17usize {
            for value in 0..200usize {
                assert_eq!(pad(pad(value, factor), factor), pad(value, factor));
            }
        }
    }

    #[test]
    fn monotone_and_bounded() {
        for factor in 1..=17usize {
            for value in 0..200usize {
                let padded = pad(value, factor);
                assert!(padded >= value);
                assert!(padded < value + factor);
                assert_eq!(padded % factor, 0);
            }
        }
    }
}
