//! Nested, JSON-like rendering of a tree.
//!
//! ```text
//! {
//! 	"3":
//! 		{"var":0,"bound":0.5,
//! 			"low":
//! 				1.25,
//! 			"high":
//! 				"inf"
//! 		}
//! }
//! ```
//!
//! Labels are displayed through a caller supplied mapping. Floats are written
//! with [`PRINT_PRECISION`] significant digits in the style of C's `%g`.

use crate::conf::{NON_FINITE_MARKER, PRINT_PRECISION};
use crate::node::Node;
use crate::tree::RefinementTree;
use std::collections::HashMap;
use std::fmt::{self, Display, Write};

fn indent<W: Write>(out: &mut W, tabs: usize) -> fmt::Result {
    for _ in 0..tabs {
        out.write_char('\t')?;
    }
    Ok(())
}

/// Formats `value` like `printf("%.{precision}g", value)`.
pub fn format_general(value: f64, precision: usize) -> String {
    if value.is_nan() {
        return "nan".to_string();
    }
    if value.is_infinite() {
        return if value > 0.0 { "inf" } else { "-inf" }.to_string();
    }
    let precision = precision.max(1);
    if value == 0.0 {
        return if value.is_sign_negative() { "-0" } else { "0" }.to_string();
    }

    // Round to the requested significant digits first; the exponent of the
    // rounded value decides between fixed and scientific notation.
    let scientific = format!("{:.*e}", precision - 1, value);
    let (mantissa, exponent) = scientific
        .split_once('e')
        .unwrap_or((scientific.as_str(), "0"));
    let exponent: i32 = exponent.parse().unwrap_or(0);

    if exponent < -4 || exponent >= precision as i32 {
        let mantissa = trim_fraction(mantissa);
        let sign = if exponent < 0 { '-' } else { '+' };
        format!("{mantissa}e{sign}{:02}", exponent.abs())
    } else {
        let decimals = (precision as i32 - 1 - exponent).max(0) as usize;
        trim_fraction(&format!("{:.*}", decimals, value)).to_string()
    }
}

fn trim_fraction(digits: &str) -> &str {
    if digits.contains('.') {
        digits.trim_end_matches('0').trim_end_matches('.')
    } else {
        digits
    }
}

fn write_node<W: Write>(out: &mut W, tabs: usize, nodes: &[Node], index: usize) -> fmt::Result {
    indent(out, tabs)?;
    match &nodes[index] {
        Node::Internal(split) => {
            write!(
                out,
                "{{\"var\":{},\"bound\":{},\n",
                split.dim,
                format_general(split.boundary, PRINT_PRECISION)
            )?;
            indent(out, tabs + 1)?;
            out.write_str("\"low\":\n")?;
            write_node(out, tabs + 2, nodes, split.low)?;
            out.write_str(",\n")?;
            indent(out, tabs + 1)?;
            out.write_str("\"high\":\n")?;
            write_node(out, tabs + 2, nodes, split.high)?;
            out.write_char('\n')?;
            indent(out, tabs)?;
            out.write_char('}')
        }
        Node::Leaf(leaf) => match leaf.value.mean() {
            Some(mean) if mean.is_finite() => {
                out.write_str(&format_general(mean, PRINT_PRECISION))
            }
            _ => out.write_str(NON_FINITE_MARKER),
        },
    }
}

impl<S> RefinementTree<S> {
    /// Writes the tree indented by `tabs`, naming each label through `names`.
    /// Labels missing from `names` are printed as their number.
    pub fn print<W: Write, N: Display>(
        &self,
        out: &mut W,
        tabs: usize,
        names: &HashMap<usize, N>,
    ) -> fmt::Result {
        indent(out, tabs)?;
        out.write_char('{')?;
        for (i, entry) in self.entries().iter().enumerate() {
            if i > 0 {
                out.write_char(',')?;
            }
            out.write_char('\n')?;
            indent(out, tabs + 1)?;
            match names.get(&entry.label) {
                Some(name) => write!(out, "\"{name}\":\n")?,
                None => write!(out, "\"{}\":\n", entry.label)?,
            }
            write_node(out, tabs + 2, self.nodes(), entry.root)?;
        }
        out.write_char('\n')?;
        indent(out, tabs)?;
        out.write_char('}')
    }
}

impl<S> Display for RefinementTree<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.print(f, 0, &HashMap::<usize, usize>::new())
    }
}
