use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use opxpath::{XPathCompiler, tokenize};
use std::hint::black_box;

fn sample_queries() -> Vec<&'static str> {
    vec![
        "1 + 2 * 3",
        "string-length('Lorem ipsum dolor sit amet, consectetur adipiscing elit.')",
        "/root/section/item[@type='a'][position() < 5]/@id",
        "for $n in 1 to 100 return $n * $n",
        "if (exists(/root/section/item[@featured='true'])) then 'featured' else 'none'",
        "map { 'a': [1, 2, 3], 'b': array { 4 to 6 } }",
    ]
}

fn benchmark_lexer(c: &mut Criterion) {
    let queries = sample_queries();
    c.bench_function("lexer/tokenize", |b| {
        b.iter(|| {
            for q in &queries {
                let tokens = tokenize(black_box(q)).expect("lexer failure");
                black_box(tokens);
            }
        })
    });
}

fn benchmark_compiler(c: &mut Criterion) {
    let queries = sample_queries();
    let compiler = XPathCompiler::default();
    c.bench_function("compiler/compile", |b| {
        b.iter(|| {
            for q in &queries {
                let compiled = compiler.compile(black_box(q)).expect("compile failure");
                black_box(compiled);
            }
        })
    });
    c.bench_function("compiler/compile_deep", |b| {
        b.iter(|| {
            for q in &queries {
                let tree = compiler.compile_deep(black_box(q)).expect("compile failure");
                black_box(tree);
            }
        })
    });
}

fn benchmark_path_length(c: &mut Criterion) {
    let compiler = XPathCompiler::default();
    let mut group = c.benchmark_group("compiler/path_length");
    for steps in [4usize, 16, 64] {
        let expr = vec!["child::item[@id]"; steps].join("/");
        group.bench_with_input(BenchmarkId::from_parameter(steps), &expr, |b, expr| {
            b.iter(|| black_box(compiler.compile(black_box(expr)).expect("compile failure")));
        });
    }
    group.finish();
}

criterion_group!(benches, benchmark_lexer, benchmark_compiler, benchmark_path_length);
criterion_main!(benches);
