//! Benchmarks for weighted group rotation.
//! Run with: cargo bench -p adrotate-selection

use adrotate_core::{AdWeights, GroupType};
use adrotate_selection::WeightedSelector;

fn weights(size: u64) -> AdWeights {
    let mut weights = AdWeights::new();
    for id in 1..=size {
        weights.insert(id, (id % 10) as u32 + 1);
    }
    weights
}

fn run(label: &str, group_type: &GroupType, weights: &AdWeights) {
    let mut selector = WeightedSelector::seeded(42);

    // Warmup
    for _ in 0..100 {
        selector.select(group_type, weights, |_| true);
    }

    let iterations = 10_000;
    let start = std::time::Instant::now();
    for _ in 0..iterations {
        let order = selector.select(group_type, weights, |_| true);
        assert_eq!(order.len(), weights.len());
    }

    let elapsed = start.elapsed();
    let per_iter = elapsed / iterations;

    println!("=== {label} ===");
    println!("Iterations:  {}", iterations);
    println!("Group size:  {}", weights.len());
    println!("Total time:  {:?}", elapsed);
    println!("Per call:    {:?}", per_iter);
    println!("Throughput:  {:.0} rotations/sec", iterations as f64 / elapsed.as_secs_f64());
}

fn main() {
    for size in [10, 100] {
        let weights = weights(size);
        run("Weighted shuffle", &GroupType::Default, &weights);
        run("Ordered shuffle", &GroupType::Ordered, &weights);
    }
}
