//! Radial placement of a ring of siblings around an anchor.

use std::f64::consts::PI;

use super::types::Position;

/// Radius added per ring level.
pub const RING_SPACING: f64 = 250.0;
/// Canvas position of the root node.
pub const CENTER: Position = Position::new(0.0, 0.0);
/// Angle seeded on the root; its first ring spreads around it.
pub const ROOT_ANGLE: f64 = 0.0;
/// Envelope used for three or more siblings.
pub const WIDE_SPREAD: f64 = 1.5 * PI;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Placement {
	pub position: Position,
	pub angle: f64,
}

/// Total angle a ring of `count` siblings is spread over.
pub fn angular_spread(count: usize) -> f64 {
	match count {
		0 | 1 => 0.0,
		2 => PI,
		_ => WIDE_SPREAD,
	}
}

/// Position of sibling `index` of `count`, `level` rings out from `anchor`,
/// centred on `anchor_angle`.
pub fn radial_position(
	anchor: Position,
	index: usize,
	count: usize,
	level: u32,
	anchor_angle: f64,
) -> Placement {
	let spread = angular_spread(count);
	let start = anchor_angle - spread / 2.0;
	let step = if count > 1 {
		spread / (count - 1) as f64
	} else {
		0.0
	};
	let angle = start + step * index as f64;
	let radius = RING_SPACING * level as f64;

	Placement {
		position: anchor.offset(radius * angle.cos(), radius * angle.sin()),
		angle,
	}
}

/// Placements for a whole ring, in sibling order.
pub fn ring(anchor: Position, count: usize, level: u32, anchor_angle: f64) -> Vec<Placement> {
	(0..count)
		.map(|i| radial_position(anchor, i, count, level, anchor_angle))
		.collect()
}
