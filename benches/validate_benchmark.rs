use criterion::{Criterion, black_box, criterion_group, criterion_main};
use serde_json::{Value, json};
use virtuoso_convert::steps::{StepIndexPolicy, validate_report};

fn steps(count: usize) -> Value {
    let items: Vec<Value> = (0..count)
        .map(|i| {
            let action = if i % 2 == 0 { "CLICK" } else { "NAVIGATE" };
            json!({
                "checkpointId": "cp_1",
                "stepIndex": i,
                "parsedStep": {
                    "action": action,
                    "target": "target",
                    "meta": {},
                    "element": {"id": format!("el_{}", i), "target": {"selectors": [{"type": "CSS_SELECTOR", "value": "#x"}]}}
                }
            })
        })
        .collect();
    Value::Array(items)
}

fn benchmark_validate(c: &mut Criterion) {
    let payload = steps(500);

    c.bench_function("validate_500_steps", |b| {
        b.iter(|| {
            let report = validate_report(black_box(&payload), StepIndexPolicy::Warn);
            assert!(report.is_valid());
        })
    });
}

criterion_group!(benches, benchmark_validate);
criterion_main!(benches);
