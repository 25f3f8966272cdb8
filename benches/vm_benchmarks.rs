use criterion::{black_box, criterion_group, criterion_main, Criterion};
use lilscheme::vm::FunctionBuilder;
use lilscheme::{Handle, HeapConfig, Runtime};

/// `(lambda (x) (+ x 1))` applied to 41, `calls` times in a row
fn build_calls(rt: &mut Runtime, calls: usize) -> Handle {
    let heap = rt.heap_mut();
    let mut outer = FunctionBuilder::new(heap, 0, 1).unwrap();
    let mut inc = FunctionBuilder::new(heap, 1, 1).unwrap();
    let one = heap.create_integer(1).unwrap();
    inc.literal(heap, one).unwrap();
    inc.local(heap, 0).unwrap();
    inc.global(heap, "+").unwrap();
    inc.apply(heap, 2).unwrap();
    let inc = inc.finish(heap).unwrap();
    outer.literal(heap, inc).unwrap();
    outer.set_local(heap, 0).unwrap();

    let seed = heap.create_integer(41).unwrap();
    for _ in 0..calls {
        outer.literal(heap, seed).unwrap();
        outer.local(heap, 0).unwrap();
        outer.apply(heap, 1).unwrap();
        outer.drop_value(heap).unwrap();
    }
    outer.literal(heap, seed).unwrap();
    let f = outer.finish(heap).unwrap();
    heap.retain(f).unwrap();
    f
}

fn bench_calls(c: &mut Criterion) {
    let mut rt = Runtime::new(HeapConfig::default()).unwrap();
    let f = build_calls(&mut rt, 100);

    c.bench_function("apply 100", |b| {
        b.iter(|| black_box(rt.execute(f, &[]).unwrap()))
    });
}

fn bench_calls_small_heap(c: &mut Criterion) {
    // Every run fills the arena several times over
    let mut rt = Runtime::new(HeapConfig::default().with_capacity(16 * 1024)).unwrap();
    let f = build_calls(&mut rt, 100);

    c.bench_function("apply 100 small heap", |b| {
        b.iter(|| black_box(rt.execute(f, &[]).unwrap()))
    });
}

fn bench_allocate_list(c: &mut Criterion) {
    c.bench_function("cons list 1k", |b| {
        b.iter(|| {
            let mut rt = Runtime::new(HeapConfig::default()).unwrap();
            let heap = rt.heap_mut();
            let mut list = Handle::NIL;
            for i in 0..1000 {
                let n = heap.create_integer(i).unwrap();
                list = heap.cons(n, list).unwrap();
            }
            black_box(heap.list_length(list).unwrap())
        })
    });
}

fn bench_collect(c: &mut Criterion) {
    let mut rt = Runtime::new(HeapConfig::default()).unwrap();
    let heap = rt.heap_mut();
    let vector = heap.create_vector(0).unwrap();
    heap.retain(vector).unwrap();
    for i in 0..1000 {
        let n = heap.create_integer(i).unwrap();
        let pair = heap.cons(n, Handle::NIL).unwrap();
        heap.vector_push(vector, pair).unwrap();
    }

    c.bench_function("collect 2k live", |b| {
        b.iter(|| black_box(rt.collect().unwrap()))
    });
}

fn bench_bytes_push(c: &mut Criterion) {
    c.bench_function("bytes push 4k", |b| {
        b.iter(|| {
            let mut rt = Runtime::new(HeapConfig::default()).unwrap();
            let heap = rt.heap_mut();
            let bytes = heap.create_bytes(0).unwrap();
            for i in 0..4096u32 {
                heap.bytes_push(bytes, i as u8).unwrap();
            }
            black_box(heap.bytes_length(bytes).unwrap())
        })
    });
}

criterion_group!(
    benches,
    bench_calls,
    bench_calls_small_heap,
    bench_allocate_list,
    bench_collect,
    bench_bytes_push,
);
criterion_main!(benches);
