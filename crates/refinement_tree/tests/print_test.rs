use refinement_tree::print::format_general;
use refinement_tree::stats::QVar;
use refinement_tree::{RefinementOptions, RefinementTree};
use std::collections::HashMap;

#[test]
fn general_format_matches_printf() {
    assert_eq!(format_general(5.0, 16), "5");
    assert_eq!(format_general(0.5, 16), "0.5");
    assert_eq!(format_general(-1.25, 16), "-1.25");
    assert_eq!(format_general(10.0, 16), "10");
    assert_eq!(format_general(0.0001, 16), "0.0001");
    assert_eq!(format_general(0.00001, 16), "1e-05");
    assert_eq!(format_general(1.0e20, 16), "1e+20");
    assert_eq!(format_general(123456.0, 3), "1.23e+05");
    assert_eq!(format_general(1.0 / 3.0, 16), "0.3333333333333333");
    assert_eq!(format_general(0.0, 16), "0");
    assert_eq!(format_general(-0.0, 16), "-0");
    assert_eq!(format_general(f64::NAN, 16), "nan");
    assert_eq!(format_general(f64::NEG_INFINITY, 16), "-inf");
}

#[test]
fn empty_tree_prints_braces() {
    let tree = RefinementTree::new();
    assert_eq!(tree.to_string(), "{\n}");
}

#[test]
fn single_leaf_prints_its_mean() {
    let mut tree = RefinementTree::new();
    tree.update(0, &[0.0], 1, 5.0, 1.0, &RefinementOptions::default())
        .unwrap();
    assert_eq!(tree.to_string(), "{\n\t\"0\":\n\t\t5\n}");
}

#[test]
fn labels_are_printed_in_order_and_named() {
    let mut tree = RefinementTree::new();
    let options = RefinementOptions::default();
    tree.update(3, &[0.0], 1, 2.0, 1.0, &options).unwrap();
    tree.update(0, &[0.0], 1, 1.0, 1.0, &options).unwrap();
    assert_eq!(tree.to_string(), "{\n\t\"0\":\n\t\t1,\n\t\"3\":\n\t\t2\n}");

    let names = HashMap::from([(3, "jump")]);
    let mut out = String::new();
    tree.print(&mut out, 1, &names).unwrap();
    assert_eq!(out, "\t{\n\t\t\"0\":\n\t\t\t1,\n\t\t\"jump\":\n\t\t\t2\n\t}");
}

#[test]
fn split_prints_nested_object() {
    let options = RefinementOptions {
        filter_val: 3.0,
        ..RefinementOptions::default()
    };
    let mut tree = RefinementTree::new();
    for i in 0..20 {
        let (x, q) = if i % 2 == 0 { (0.0, 0.0) } else { (1.0, 10.0) };
        tree.update(0, &[x], 1, q, 1.0, &options).unwrap();
        if !tree.get_split_history().is_empty() {
            break;
        }
    }
    let printed = tree.to_string();
    assert!(
        printed.starts_with("{\n\t\"0\":\n\t\t{\"var\":0,\"bound\":0.5,\n\t\t\t\"low\":\n\t\t\t\t1.6666"),
        "{printed}"
    );
    assert!(printed.contains(",\n\t\t\t\"high\":\n\t\t\t\t8.333"), "{printed}");
    assert!(printed.ends_with("\n\t\t}\n}"), "{printed}");
}

#[test]
fn empty_leaf_prints_marker() {
    let mut tree = RefinementTree::new();
    tree.update(0, &[0.0], 1, 5.0, 1.0, &RefinementOptions::default())
        .unwrap();

    let mut json = serde_json::to_value(&tree).unwrap();
    json["nodes"][0]["Leaf"]["value"] = serde_json::to_value(QVar::new()).unwrap();
    let restored: RefinementTree = serde_json::from_value(json).unwrap();
    assert_eq!(restored.to_string(), "{\n\t\"0\":\n\t\t\"inf\"\n}");
}
