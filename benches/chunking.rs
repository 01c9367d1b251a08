use criterion::{Criterion, criterion_group, criterion_main};
use llm_playground::embeddings::chunking::chunk_text;
use std::hint::black_box;

pub fn criterion_benchmark(c: &mut Criterion) {
    let paragraph = "A refund may be requested within thirty days of purchase, \
        provided the item is unused and in its original packaging. Refunds are \
        issued to the original payment method within five business days of \
        approval. Shipping costs are not refundable unless the return is due \
        to our error.\n\n";
    let text = paragraph.repeat(800);

    c.bench_function("chunking", |b| {
        b.iter(|| chunk_text(black_box(&text), black_box(1000)))
    });
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);
