use approx::assert_abs_diff_eq;
use refinement_tree::RefinementOptions;
use refinement_tree::split::{FilterThresholds, Side, SplitData, SplitFilter};
use refinement_tree::stats::{Avg, QVar};

fn thresholds(indifference: f64, rate: f64) -> FilterThresholds {
    FilterThresholds {
        indifference,
        lower_t: 2.0,
        upper_t: 4.0,
        ks_limit: 0.5,
        rate,
    }
}

#[test]
fn thresholds_scale_indifference_by_delta() {
    let options = RefinementOptions {
        indifference: 0.25,
        ..RefinementOptions::default()
    };
    let t = FilterThresholds::new(-2.0, &options);
    assert_abs_diff_eq!(t.indifference, 0.5, epsilon = 1e-12);
    assert_eq!(t.rate, options.filter_rate);
    assert_eq!(t.ks_limit, options.ks_limit);
}

#[test]
fn filter_waits_for_both_sides() {
    let mut filter = SplitFilter::new();
    filter.add(&QVar::seeded(0.0), &QVar::new(), &thresholds(0.1, 0.0));
    filter.add(&QVar::new(), &QVar::seeded(10.0), &thresholds(0.1, 0.0));
    assert_eq!(filter.max(), 0.0);
}

#[test]
fn mean_signal_counts_significant_differences() {
    let mut filter = SplitFilter::new();
    let low = QVar::seeded(0.0);
    let high = QVar::seeded(10.0);
    for _ in 0..3 {
        filter.add(&low, &high, &thresholds(0.5, 0.0));
    }
    assert_abs_diff_eq!(filter.mean_signal(), 3.0, epsilon = 1e-12);
    // one sample per side is below lower_t
    assert_eq!(filter.count_signal(), 0.0);
    // zero spread gives the full distance, capped by ks_limit
    assert_abs_diff_eq!(filter.ks_signal(), 0.5, epsilon = 1e-12);
    assert_abs_diff_eq!(filter.max(), 3.0, epsilon = 1e-12);
}

#[test]
fn count_signal_is_weighted_by_the_smaller_side() {
    let mut filter = SplitFilter::new();
    let low = QVar::with_moments(0.0, 2.0, 0.0);
    let high = QVar::with_moments(10.0, 6.0, 0.0);
    filter.add(&low, &high, &thresholds(0.5, 0.0));
    assert_abs_diff_eq!(filter.count_signal(), 0.5, epsilon = 1e-12);

    let big = QVar::with_moments(0.0, 40.0, 0.0);
    filter.add(&big, &high, &thresholds(0.5, 0.0));
    assert_abs_diff_eq!(filter.count_signal(), 1.5, epsilon = 1e-12);
}

#[test]
fn small_differences_only_decay_evidence() {
    let mut filter = SplitFilter::new();
    let t = thresholds(1.0, 0.5);
    filter.add(&QVar::seeded(0.0), &QVar::seeded(5.0), &t);
    assert_abs_diff_eq!(filter.mean_signal(), 1.0, epsilon = 1e-12);

    filter.add(&QVar::seeded(0.0), &QVar::seeded(0.5), &t);
    assert_abs_diff_eq!(filter.mean_signal(), 0.5, epsilon = 1e-12);
    assert!(filter.max() >= 0.0);
}

#[test]
fn ks_signal_grows_with_separation() {
    let mut near = SplitFilter::new();
    let mut far = SplitFilter::new();
    let t = FilterThresholds {
        ks_limit: 10.0,
        ..thresholds(0.0, 0.0)
    };
    near.add(
        &QVar::with_moments(0.0, 5.0, 1.0),
        &QVar::with_moments(0.5, 5.0, 1.0),
        &t,
    );
    far.add(
        &QVar::with_moments(0.0, 5.0, 1.0),
        &QVar::with_moments(5.0, 5.0, 1.0),
        &t,
    );
    assert!(near.ks_signal() > 0.0);
    assert!(far.ks_signal() > near.ks_signal());
    assert!(far.ks_signal() <= 1.0);
}

#[test]
fn reset_clears_all_signals() {
    let mut filter = SplitFilter::new();
    filter.add(
        &QVar::with_moments(0.0, 4.0, 0.0),
        &QVar::with_moments(9.0, 4.0, 0.0),
        &thresholds(0.1, 0.0),
    );
    assert!(filter.max() > 0.0);
    filter.reset();
    assert_eq!(filter, SplitFilter::new());
    assert_eq!(filter.max(), 0.0);
}

#[test]
fn routing_without_midpoint_goes_low() {
    let data = SplitData::new();
    assert_eq!(data.boundary(), None);
    assert_eq!(data.side_of(-100.0), Side::Low);
    assert_eq!(data.side_of(100.0), Side::Low);
}

#[test]
fn routing_uses_inclusive_low_side() {
    let data = SplitData::with_midpoint(Avg::with_moments(0.5, 1.0, 0.0));
    assert_eq!(data.side_of(0.5), Side::Low);
    assert_eq!(data.side_of(0.4), Side::Low);
    assert_eq!(data.side_of(0.6), Side::High);
}

#[test]
fn observe_accumulates_the_chosen_side() {
    let t = thresholds(0.1, 0.0);
    let mut data = SplitData::with_midpoint(Avg::with_moments(0.5, 1.0, 0.0));
    data.observe(0.2, 1.0, &t);
    data.observe(0.8, 7.0, &t);
    data.observe(0.9, 9.0, &t);

    assert_eq!(data.low_value.count(), 1.0);
    assert_eq!(data.high_value.count(), 2.0);
    assert_abs_diff_eq!(data.high_value.mean().unwrap(), 8.0, epsilon = 1e-12);
    assert_abs_diff_eq!(data.high_coord.mean().unwrap(), 0.85, epsilon = 1e-12);
    assert_abs_diff_eq!(data.combined_coord().mean().unwrap(), 1.9 / 3.0, epsilon = 1e-12);
    // both observations with two populated sides differed by more than 0.1
    assert_abs_diff_eq!(data.filter.mean_signal(), 2.0, epsilon = 1e-12);
    assert!(data.qualifies(2.0));
    assert!(!data.qualifies(2.5));
}

#[test]
fn unbounded_dimension_never_qualifies() {
    let mut data = SplitData::new();
    data.filter.add(&QVar::seeded(0.0), &QVar::seeded(9.0), &thresholds(0.1, 0.0));
    assert!(data.filter.max() > 0.0);
    assert!(!data.qualifies(0.0));
}

#[test]
fn recenter_moves_boundary_to_the_data() {
    let t = thresholds(0.1, 0.0);
    let mut data = SplitData::new();
    data.observe(0.0, 0.0, &t);
    assert!(!data.recenter(), "a single sample is not enough");

    data.observe(1.0, 10.0, &t);
    assert!(data.recenter());

    assert_abs_diff_eq!(data.boundary().unwrap(), 0.5, epsilon = 1e-12);
    assert_eq!(data.midpoint.count(), 2.0);
    assert_eq!(data.low_coord, data.high_coord);
    assert_eq!(data.low_coord.count(), 1.0);
    assert_eq!(data.low_value, data.high_value);
    assert_eq!(data.low_value.count(), 1.0);
    assert_abs_diff_eq!(data.low_value.mean().unwrap(), 5.0, epsilon = 1e-12);
}

#[test]
fn recenter_skips_balanced_sides() {
    let t = thresholds(0.1, 0.0);
    let mut data = SplitData::with_midpoint(Avg::with_moments(0.5, 1.0, 0.0));
    for _ in 0..3 {
        data.observe(0.0, 0.0, &t);
        data.observe(1.0, 1.0, &t);
    }
    let before = data.clone();
    assert!(!data.recenter());
    assert_eq!(data, before);
}

#[test]
fn recenter_keeps_boundary_when_mean_is_unchanged() {
    let mut data = SplitData::with_midpoint(Avg::with_moments(0.5, 1.0, 0.0));
    data.low_coord = Avg::with_moments(0.5, 4.0, 0.0);
    data.low_value = QVar::with_moments(3.0, 4.0, 0.0);
    let before = data.clone();
    assert!(!data.recenter());
    assert_eq!(data, before);
}

#[test]
fn recenter_requires_more_samples_than_the_midpoint() {
    let mut data = SplitData::with_midpoint(Avg::with_moments(0.5, 10.0, 0.0));
    data.low_coord = Avg::with_moments(0.1, 4.0, 0.0);
    assert!(!data.recenter());
    assert_eq!(data.boundary(), Some(0.5));
}

#[test]
fn non_finite_midpoint_is_no_boundary() {
    let mut data = SplitData::with_midpoint(Avg::with_moments(f64::NAN, 2.0, 0.0));
    data.filter.add(&QVar::seeded(0.0), &QVar::seeded(9.0), &thresholds(0.1, 0.0));
    assert_eq!(data.boundary(), None);
    assert!(!data.qualifies(0.0));

    let data = SplitData::with_midpoint(Avg::with_moments(f64::INFINITY, 2.0, 0.0));
    assert_eq!(data.boundary(), None);
    assert_eq!(data.side_of(1.0e300), Side::Low);
}
