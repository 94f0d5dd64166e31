//! On-device equivalence of the generated kernel against the reference
//! transpose. Skips silently when the host has no OpenCL platform or
//! device, so the suite stays green on machines without an ICD.

use rand::Rng;
use tiletune_common::pad;
use tiletune_kernel::{transpose, TransposeConf, TransposeKernel};
use tiletune_opencl::{OpenClDevice, OpenClServer};
use tiletune_runtime::{BufferAccess, ComputeServer};

fn server_or_skip() -> Option<OpenClServer> {
    let device = match OpenClDevice::from_indices(0, 0) {
        Ok(device) => device,
        Err(err) => {
            eprintln!("skipping device test: {err}");
            return None;
        }
    };
    match OpenClServer::new(device) {
        Ok(server) => Some(server),
        Err(err) => {
            eprintln!("skipping device test: {err}");
            None
        }
    }
}

fn check_on_device(server: &mut OpenClServer, tile: u32, m: u32, n: u32, padding: u32, vector: u32) {
    let (m_us, n_us, padding_us) = (m as usize, n as usize, padding as usize);
    let padded_n = pad(n_us, padding_us);
    let padded_m = pad(m_us, padding_us);

    let mut rng = rand::thread_rng();
    let mut input = vec![0u32; m_us * padded_n];
    for i in 0..m_us {
        for j in 0..n_us {
            input[(i * padded_n) + j] = rng.gen_range(0..10);
        }
    }

    let kernel = TransposeKernel::new(TransposeConf::new(tile), m, n, padding, vector, "uint");
    let compiled = server
        .compile(
            TransposeKernel::ENTRY_POINT,
            &kernel.source(),
            "-cl-mad-enable -Werror",
        )
        .expect("generated source must compile");

    let input_bytes: Vec<u8> = input.iter().flat_map(|v| v.to_ne_bytes()).collect();
    let mut input_buffer = server
        .create_buffer(input_bytes.len(), BufferAccess::ReadOnly)
        .unwrap();
    server.write_buffer(&mut input_buffer, &input_bytes).unwrap();
    let mut output_buffer = server
        .create_buffer(n_us * padded_m * 4, BufferAccess::WriteOnly)
        .unwrap();

    server
        .launch(&compiled, &kernel.work_size(), &input_buffer, &mut output_buffer)
        .unwrap();

    let mut out_bytes = vec![0u8; n_us * padded_m * 4];
    server.read_buffer(&output_buffer, &mut out_bytes).unwrap();

    let mut expected = vec![0u32; n_us * padded_m];
    transpose(m_us, n_us, padding_us, &input, &mut expected);

    let mut wrong = 0u64;
    for j in 0..n_us {
        for i in 0..m_us {
            let at = (j * padded_m) + i;
            let value = u32::from_ne_bytes(out_bytes[at * 4..(at * 4) + 4].try_into().unwrap());
            if value != expected[at] {
                wrong += 1;
            }
        }
    }
    assert_eq!(
        wrong,
        0,
        "tile {tile}: {wrong} wrong samples ({}%)",
        (wrong * 100) / (m as u64 * n as u64)
    );
}

#[test]
fn generated_kernels_match_the_reference_on_device() {
    let Some(mut server) = server_or_skip() else {
        return;
    };

    // A vector width of 1 keeps the barriers in for every tile, which is
    // correct on any device regardless of its real SIMD width.
    check_on_device(&mut server, 16, 64, 50, 32, 1);
    check_on_device(&mut server, 8, 64, 64, 32, 1);
    check_on_device(&mut server, 7, 49, 30, 16, 1);
}

#[test]
fn zero_tile_source_is_rejected_by_the_device_compiler() {
    let Some(mut server) = server_or_skip() else {
        return;
    };

    let kernel = TransposeKernel::new(TransposeConf::new(0), 64, 64, 32, 1, "uint");
    let result = server.compile(TransposeKernel::ENTRY_POINT, &kernel.source(), "-Werror");
    assert!(result.is_err(), "a zero-sized local array must not build");
}
