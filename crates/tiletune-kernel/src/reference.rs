use tiletune_common::pad;

/// Sequential transpose over padded buffers.
///
/// For every `i < m`, `j < n` this sets
/// `output[j * pad(m) + i] = input[i * pad(n) + j]`. It is the correctness
/// oracle for every generated kernel and doubles as the execution path when
/// no accelerator is available.
///
/// # Panics
///
/// Panics when `input` is shorter than `m * pad(n, padding)` or `output` is
/// shorter than `n * pad(m, padding)`.
pub fn transpose<T: Copy>(m: usize, n: usize, padding: usize, input: &[T], output: &mut [T]) {
    let padded_n = pad(n, padding);
    let padded_m = pad(m, padding);
    assert!(
        input.len() >= m * padded_n,
        "transpose input too short: {} < {}",
        input.len(),
        m * padded_n
    );
    assert!(
        output.len() >= n * padded_m,
        "transpose output too short: {} < {}",
        output.len(),
        n * padded_m
    );

    for i in 0..m {
        for j in 0..n {
            output[(j * padded_m) + i] = input[(i * padded_n) + j];
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::Rng;

    fn random_matrix(m: usize, n: usize, padding: usize) -> Vec<u32> {
        let mut rng = rand::thread_rng();
        let mut data = vec![0u32; m * pad(n, padding)];
        for i in 0..m {
            for j in 0..n {
                data[(i * pad(n, padding)) + j] = rng.gen_range(0..10);
            }
        }
        data
    }

    #[test]
    fn moves_every_element_through_padded_strides() {
        let (m, n, padding) = (3usize, 2usize, 4usize);
        let mut input = vec![0u32; m * pad(n, padding)];
        for i in 0..m {
            for j in 0..n {
                input[(i * pad(n, padding)) + j] = (10 * i + j) as u32;
            }
        }

        let mut output = vec![u32::MAX; n * pad(m, padding)];
        transpose(m, n, padding, &input, &mut output);

        for i in 0..m {
            for j in 0..n {
                assert_eq!(output[(j * pad(m, padding)) + i], (10 * i + j) as u32);
            }
        }
    }

    #[test]
    fn involution_restores_the_input() {
        for (m, n, padding) in [(7usize, 5usize, 1usize), (8, 8, 4), (13, 50, 32), (1, 9, 8)] {
            let input = random_matrix(m, n, padding);
            let mut transposed = vec![0u32; n * pad(m, padding)];
            let mut back = vec![0u32; m * pad(n, padding)];

            transpose(m, n, padding, &input, &mut transposed);
            transpose(n, m, padding, &transposed, &mut back);

            for i in 0..m {
                for j in 0..n {
                    assert_eq!(
                        back[(i * pad(n, padding)) + j],
                        input[(i * pad(n, padding)) + j],
                        "mismatch at ({i}, {j}) for {m}x{n}, padding {padding}"
                    );
                }
            }
        }
    }

    #[test]
    #[should_panic(expected = "input too short")]
    fn rejects_undersized_input() {
        let input = vec![0u32; 4];
        let mut output = vec![0u32; 64];
        transpose(8, 8, 1, &input, &mut output);
    }
}
