// This file is part of ICU4X. For terms of use, please see the file
// called LICENSE at the top level of the ICU4X source tree
// (online at: https://github.com/unicode-org/icu4x/blob/main/LICENSE ).

use criterion::{black_box, criterion_group, criterion_main, Criterion};

use icu_codepointtrie_builder::{MutableCodePointTrie, ValueWidth};

/// Scripts-like value distribution: many short BMP ranges plus a few
/// supplementary blocks.
fn build_sample() -> MutableCodePointTrie {
    let mut builder = MutableCodePointTrie::new(0, u32::MAX);
    let mut value = 1;
    let mut start = 0x80;
    while start < 0xffff {
        let end = start + (start % 0x1ff);
        builder
            .set_range(start, end.min(0xfffe), value, true)
            .unwrap();
        start = end + 0x120;
        value += 1;
    }
    builder.set_range(0x1_0000, 0x1_04ff, 9, true).unwrap();
    builder.set_range(0x2_0000, 0x2_a6df, 10, true).unwrap();
    builder
}

fn overview_bench(c: &mut Criterion) {
    c.bench_function("cpt_builder/build", |b| {
        b.iter(|| black_box(build_sample()));
    });

    c.bench_function("cpt_builder/freeze/16", |b| {
        b.iter(|| black_box(build_sample().freeze(ValueWidth::Bits16).unwrap()));
    });

    c.bench_function("cpt_builder/freeze/32", |b| {
        b.iter(|| black_box(build_sample().freeze(ValueWidth::Bits32).unwrap()));
    });

    let builder = build_sample();
    c.bench_function("cpt_builder/get_range", |b| {
        b.iter(|| {
            let mut count = 0u32;
            let mut start = 0;
            while let Some(range) = black_box(&builder).get_range(start) {
                count += 1;
                start = range.range.end() + 1;
                if start > 0x10_ffff {
                    break;
                }
            }
            count
        });
    });

    let trie = build_sample().freeze(ValueWidth::Bits16).unwrap();
    c.bench_function("cpt_frozen/get32", |b| {
        b.iter(|| {
            (0x40u32..0x2_0040)
                .step_by(0x101)
                .map(|cp| black_box(&trie).get32(cp))
                .reduce(|a, b| a.wrapping_add(b))
        });
    });
}

criterion_group!(benches, overview_bench,);
criterion_main!(benches);
