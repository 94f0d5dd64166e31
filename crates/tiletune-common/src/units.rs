/// Converts a byte count to gigabytes (10^9).
pub fn giga(bytes: u64) -> f64 {
    bytes as f64 / 1.0e9
}

#[cfg(test)]
mod tests {
    use super::giga;

    #[test]
    fn scales_by_ten_to_the_ninth() {
        assert_eq!(giga(0), 0.0);
        assert_eq!(giga(1_000_000_000), 1.0);
        assert_eq!(giga(2_500_000_000), 2.5);
    }
}
