//! AVX transpose path for `f32` matrices.
//!
//! Processes 8x8 blocks with 256-bit unpack/shuffle/permute sequences and
//! finishes remainder rows and columns with scalar stores. The result is
//! bit-identical to [`transpose`](crate::transpose); this path is an
//! alternative host backend and plays no part in candidate selection.

use tiletune_common::pad;

/// Transposes an `f32` matrix over padded buffers, using AVX when the CPU
/// supports it and the sequential path otherwise.
///
/// Layout contract and panics are those of [`transpose`](crate::transpose).
pub fn transpose_f32(m: usize, n: usize, padding: usize, input: &[f32], output: &mut [f32]) {
    #[cfg(target_arch = "x86_64")]
    {
        if is_x86_feature_detected!("avx") {
            log::debug!("transpose_f32: avx path, {m}x{n}");
            // Safety: AVX support was just verified.
            unsafe { transpose_avx(m, n, padding, input, output) };
            return;
        }
    }

    crate::transpose(m, n, padding, input, output);
}

#[cfg(target_arch = "x86_64")]
#[target_feature(enable = "avx")]
unsafe fn transpose_avx(m: usize, n: usize, padding: usize, input: &[f32], output: &mut [f32]) {
    use std::arch::x86_64::*;

    let padded_n = pad(n, padding);
    let padded_m = pad(m, padding);
    assert!(input.len() >= m * padded_n);
    assert!(output.len() >= n * padded_m);

    let m_blocked = m - (m % 8);
    let n_blocked = n - (n % 8);

    for i0 in (0..m_blocked).step_by(8) {
        for j0 in (0..n_blocked).step_by(8) {
            let base = input.as_ptr().add((i0 * padded_n) + j0);
            let r0 = _mm256_loadu_ps(base);
            let r1 = _mm256_loadu_ps(base.add(padded_n));
            let r2 = _mm256_loadu_ps(base.add(2 * padded_n));
            let r3 = _mm256_loadu_ps(base.add(3 * padded_n));
            let r4 = _mm256_loadu_ps(base.add(4 * padded_n));
            let r5 = _mm256_loadu_ps(base.add(5 * padded_n));
            let r6 = _mm256_loadu_ps(base.add(6 * padded_n));
            let r7 = _mm256_loadu_ps(base.add(7 * padded_n));

            let t0 = _mm256_unpacklo_ps(r0, r1);
            let t1 = _mm256_unpackhi_ps(r0, r1);
            let t2 = _mm256_unpacklo_ps(r2, r3);
            let t3 = _mm256_unpackhi_ps(r2, r3);
            let t4 = _mm256_unpacklo_ps(r4, r5);
            let t5 = _mm256_unpackhi_ps(r4, r5);
            let t6 = _mm256_unpacklo_ps(r6, r7);
            let t7 = _mm256_unpackhi_ps(r6, r7);

            let s0 = _mm256_shuffle_ps::<0x44>(t0, t2);
            let s1 = _mm256_shuffle_ps::<0xEE>(t0, t2);
            let s2 = _mm256_shuffle_ps::<0x44>(t1, t3);
            let s3 = _mm256_shuffle_ps::<0xEE>(t1, t3);
            let s4 = _mm256_shuffle_ps::<0x44>(t4, t6);
            let s5 = _mm256_shuffle_ps::<0xEE>(t4, t6);
            let s6 = _mm256_shuffle_ps::<0x44>(t5, t7);
            let s7 = _mm256_shuffle_ps::<0xEE>(t5, t7);

            let columns = [
                _mm256_permute2f128_ps::<0x20>(s0, s4),
                _mm256_permute2f128_ps::<0x20>(s1, s5),
                _mm256_permute2f128_ps::<0x20>(s2, s6),
                _mm256_permute2f128_ps::<0x20>(s3, s7),
                _mm256_permute2f128_ps::<0x31>(s0, s4),
                _mm256_permute2f128_ps::<0x31>(s1, s5),
                _mm256_permute2f128_ps::<0x31>(s2, s6),
                _mm256_permute2f128_ps::<0x31>(s3, s7),
            ];
            for (k, column) in columns.into_iter().enumerate() {
                _mm256_storeu_ps(output.as_mut_ptr().add(((j0 + k) * padded_m) + i0), column);
            }
        }

        // Columns past the last full block, for this band of rows.
        for i in i0..(i0 + 8) {
            for j in n_blocked..n {
                output[(j * padded_m) + i] = input[(i * padded_n) + j];
            }
        }
    }

    // Rows past the last full block.
    for i in m_blocked..m {
        for j in 0..n {
            output[(j * padded_m) + i] = input[(i * padded_n) + j];
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::Rng;

    fn check(m: usize, n: usize, padding: usize) {
        let mut rng = rand::thread_rng();
        let mut input = vec![0.0f32; m * pad(n, padding)];
        for i in 0..m {
            for j in 0..n {
                input[(i * pad(n, padding)) + j] = rng.gen_range(0.0..10.0);
            }
        }

        let mut simd_out = vec![0.0f32; n * pad(m, padding)];
        let mut reference_out = vec![0.0f32; n * pad(m, padding)];
        transpose_f32(m, n, padding, &input, &mut simd_out);
        crate::transpose(m, n, padding, &input, &mut reference_out);

        for j in 0..n {
            for i in 0..m {
                let at = (j * pad(m, padding)) + i;
                assert_eq!(
                    simd_out[at].to_bits(),
                    reference_out[at].to_bits(),
                    "mismatch at ({i}, {j}) for {m}x{n}, padding {padding}"
                );
            }
        }
    }

    #[test]
    fn matches_reference_on_block_multiples() {
        check(8, 8, 1);
        check(32, 16, 8);
        check(64, 64, 32);
    }

    #[test]
    fn matches_reference_with_remainders() {
        check(13, 10, 8);
        check(9, 23, 32);
        check(7, 7, 1);
        check(1, 50, 32);
    }
}
