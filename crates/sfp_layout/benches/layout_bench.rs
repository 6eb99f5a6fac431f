use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};
use sfp_ingest::{NodeStyles, StyleNode, Viewport};
use sfp_layout::{extract_layout, LayoutConfig};
use sfp_math::BBox;

fn synthetic_page(count: usize) -> Vec<StyleNode> {
    let cols = 6usize;
    (0..count)
        .map(|i| {
            let col = (i % cols) as f64;
            let row = (i / cols) as f64;
            StyleNode {
                id: format!("node-{i}"),
                tag: if i % 7 == 0 { "img" } else { "div" }.to_string(),
                bbox: BBox::new(16.0 + col * 232.0, 16.0 + row * 148.0, 216.0, 132.0),
                styles: NodeStyles {
                    background_color: Some(format!("#e{}f{}ff", i % 10, (i * 3) % 10)),
                    color: Some("#24292f".to_string()),
                    font_size: Some(format!("{}px", 12 + (i % 5) * 4)),
                    font_weight: Some(if i % 4 == 0 { "600" } else { "400" }.to_string()),
                    padding: Some("16px".to_string()),
                    border: Some("1px solid #d0d7de".to_string()),
                    border_radius: Some("6px".to_string()),
                    box_shadow: Some("0px 1px 3px rgba(27, 31, 36, 0.12)".to_string()),
                    ..NodeStyles::default()
                },
                role: None,
                class_name: None,
                text_content: Some(format!("Synthetic card {i}")),
            }
        })
        .collect()
}

fn bench_layout(c: &mut Criterion) {
    let viewport = Viewport::new(1440.0, 2400.0);
    let mut group = c.benchmark_group("layout");

    for size in [50, 200, 800].iter() {
        let nodes = synthetic_page(*size);
        let config = LayoutConfig::default();
        group.throughput(Throughput::Elements(*size as u64));
        group.bench_function(format!("extract_{size}"), |b| {
            b.iter(|| {
                extract_layout(black_box(&nodes), black_box(&viewport), black_box(&config))
                    .expect("extract")
            })
        });
    }

    let nodes = synthetic_page(800);
    let parallel = LayoutConfig::default().with_parallel(true);
    group.bench_function("extract_800_parallel", |b| {
        b.iter(|| {
            extract_layout(black_box(&nodes), black_box(&viewport), black_box(&parallel))
                .expect("extract")
        })
    });

    group.finish();
}

criterion_group!(benches, bench_layout);
criterion_main!(benches);
