//! Node sizing for the external layout collaborator.
//!
//! The engine owns sizes (they depend on content); the collaborator owns
//! positions. Widths track the longest rendered line, heights the detail
//! count, both clamped so degenerate labels cannot explode the canvas.

use crate::types::{FlowNode, NodeDimensions};

const MIN_WIDTH: u32 = 120;
const MAX_WIDTH: u32 = 360;
const CHAR_WIDTH: u32 = 8;
const HORIZONTAL_PADDING: u32 = 24;
const BASE_HEIGHT: u32 = 40;
const DETAIL_LINE_HEIGHT: u32 = 16;

/// Stamps dimensions onto every node, recursing into CTE/subquery
/// children.
pub(crate) fn assign_dimensions(nodes: &mut [FlowNode]) {
    for node in nodes {
        node.dimensions = Some(measure(node));
        assign_dimensions(&mut node.children);
    }
}

fn measure(node: &FlowNode) -> NodeDimensions {
    let longest = node
        .details
        .iter()
        .map(|line| line.chars().count())
        .chain([node.label.chars().count()])
        .max()
        .unwrap_or(0) as u32;
    let width = (longest * CHAR_WIDTH + HORIZONTAL_PADDING).clamp(MIN_WIDTH, MAX_WIDTH);
    let height = BASE_HEIGHT + node.details.len() as u32 * DETAIL_LINE_HEIGHT;
    NodeDimensions { width, height }
}
