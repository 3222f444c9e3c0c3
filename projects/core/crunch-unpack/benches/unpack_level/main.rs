use criterion::{Criterion, criterion_group, criterion_main};
use crunch_unpack::fixtures::CrnFixture;
use crunch_unpack::{CrnFormat, unpack_begin};
use std::hint::black_box;

#[cfg(all(
    any(target_os = "linux", target_os = "macos"),
    any(target_arch = "x86", target_arch = "x86_64", target_arch = "aarch64")
))]
use pprof::criterion::{Output, PProfProfiler};

fn criterion_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("CRN Unpack Level");

    for format in [CrnFormat::Dxt1, CrnFormat::Dxt5, CrnFormat::DxnXY, CrnFormat::Etc2A] {
        // 1024x1024, a full mip chain
        let fixture = CrnFixture::simple(format, 1024, 1024, 11, 1);
        let data = fixture.build();
        let context = unpack_begin(&data).unwrap();
        let info = context.level_info(0).unwrap();
        let mut output = vec![0u8; info.output_size(info.min_row_pitch()).unwrap()];

        group.throughput(criterion::Throughput::Bytes(output.len() as u64));
        group.bench_function(format!("{format} level 0"), |b| {
            b.iter(|| {
                context
                    .unpack_level(black_box(&mut output), 0, 0)
                    .unwrap();
            })
        });

        group.bench_function(format!("{format} begin"), |b| {
            b.iter(|| unpack_begin(black_box(&data)).unwrap())
        });
    }

    group.finish();
}

#[cfg(all(
    any(target_os = "linux", target_os = "macos"),
    any(target_arch = "x86", target_arch = "x86_64", target_arch = "aarch64")
))]
criterion_group! {
    name = benches;
    config = Criterion::default().with_profiler(PProfProfiler::new(100, Output::Flamegraph(None)));
    targets = criterion_benchmark
}

#[cfg(not(all(
    any(target_os = "linux", target_os = "macos"),
    any(target_arch = "x86", target_arch = "x86_64", target_arch = "aarch64")
)))]
criterion_group! {
    name = benches;
    config = Criterion::default();
    targets = criterion_benchmark
}

criterion_main!(benches);
