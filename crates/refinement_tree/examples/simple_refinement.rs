use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use refinement_tree::{RefinementOptions, RefinementTree, SimplexSolver};
use std::collections::HashMap;
use std::time::Instant;

/// Value of action `label` at `(x1, x2)`. Action 0 pays off on the left half,
/// action 1 on the right half; x2 is pure noise.
fn true_value(label: usize, x1: f64) -> f64 {
    match (label, x1 > 0.5) {
        (0, false) | (1, true) => 10.0,
        _ => 0.0,
    }
}

fn main() {
    println!("=== Simple Refinement Tree ===");

    let n_updates = 4000;
    let mut rng = StdRng::seed_from_u64(7);

    let options = RefinementOptions {
        q_learn_rate: 50, // effective sample cap of each leaf
        filter_val: 3.0,  // evidence required before splitting
        ..RefinementOptions::default()
    };
    let mut tree = RefinementTree::with_solver(SimplexSolver, Some(42));

    println!("\nFeeding {} updates...", n_updates);
    let start_time = Instant::now();
    for _ in 0..n_updates {
        let label = rng.random_range(0..2);
        let point = [rng.random::<f64>(), rng.random::<f64>()];
        let noise = rng.random_range(-1.0..1.0);
        let observed = true_value(label, point[0]) + noise;
        if let Err(err) = tree.update(label, &point, 2, observed, 1.0, &options) {
            eprintln!("update rejected: {err}");
            return;
        }
    }
    println!("Updates took: {:?}", start_time.elapsed());

    println!("\n=== Results ===");
    println!("Total nodes: {}", tree.num_nodes());
    for label in tree.labels() {
        println!("Leaves of label {}: {:?}", label, tree.leaves(label));
    }

    println!("\nSplit history (parent -> [low, high]) and boundaries:");
    for (i, rec) in tree.get_split_history().iter().enumerate() {
        println!(
            "  {:>2}. label={} parent={} dim={} bound={:.6} -> [{} , {}]",
            i,
            rec.label,
            rec.parent_index,
            rec.dim,
            rec.boundary,
            rec.low_child_index,
            rec.high_child_index
        );
    }

    println!("\nEstimates vs true value:");
    for x1 in [0.1, 0.3, 0.7, 0.9] {
        let point = [x1, 0.5];
        for label in 0..2 {
            let leaf = tree.lookup(label, &point).unwrap_or_else(|err| {
                eprintln!("lookup failed: {err}");
                refinement_tree::LeafEstimate::undefined()
            });
            let corrected = tree.estimate(label, &point).unwrap_or(f64::NAN);
            println!(
                "  x1={:.1} label={}: mean = {:>8.4} (n={:>4}) | corrected = {:>8.4} | true = {}",
                x1,
                label,
                leaf.mean,
                leaf.count,
                corrected,
                true_value(label, x1)
            );
        }
        match tree.best_q(&point, false, None) {
            Ok(best) => println!("  x1={:.1} best value = {:.4}", x1, best),
            Err(err) => eprintln!("best_q failed: {err}"),
        }
    }

    let names = HashMap::from([(0, "left"), (1, "right")]);
    let mut printed = String::new();
    if tree.print(&mut printed, 0, &names).is_ok() {
        println!("\n{printed}");
    }
}
