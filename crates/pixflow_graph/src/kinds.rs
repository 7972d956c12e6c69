// SPDX-License-Identifier: MIT OR Apache-2.0
//! Parameter schemas for every node kind.
//!
//! The order of each table is the uniform packing order consumed by shaders
//! and must only ever be extended at the end.

use crate::node::NodeKind;
use crate::param::{BlendMode, Color, FillMode, ParamSpec, ParamValue};

// ============================================================================
// Generators
// ============================================================================

const COLOR: &[ParamSpec] = &[ParamSpec::new("color", ParamValue::Color(Color::WHITE))];

const CIRCLE: &[ParamSpec] = &[
    ParamSpec::new("radius", ParamValue::Scalar(0.25)),
    ParamSpec::new("position", ParamValue::Point([0.0, 0.0])),
    ParamSpec::new("edge_radius", ParamValue::Scalar(0.0)),
    ParamSpec::new("color", ParamValue::Color(Color::WHITE)),
    ParamSpec::new("edge_color", ParamValue::Color(Color::GRAY)),
    ParamSpec::new("bg_color", ParamValue::Color(Color::BLACK)),
    ParamSpec::new("premultiply", ParamValue::Bool(true)),
];

// ============================================================================
// Effects
// ============================================================================

const TRANSFORM: &[ParamSpec] = &[
    ParamSpec::new("position", ParamValue::Point([0.0, 0.0])),
    ParamSpec::new("rotation", ParamValue::Scalar(0.0)),
    ParamSpec::new("scale", ParamValue::Scalar(1.0)),
    ParamSpec::new("size", ParamValue::Point([1.0, 1.0])),
];

const HUE_SATURATION: &[ParamSpec] = &[
    ParamSpec::ranged("hue", 0.0, 0.0, 1.0),
    ParamSpec::ranged("saturation", 1.0, 0.0, 2.0),
];

const BLEND: &[ParamSpec] = &[
    ParamSpec::new("mode", ParamValue::Blend(BlendMode::Over)),
    ParamSpec::new("bypass_transform", ParamValue::Bool(true)),
    ParamSpec::new("fill_mode", ParamValue::Fill(FillMode::AspectFit)),
    ParamSpec::new("position", ParamValue::Point([0.0, 0.0])),
    ParamSpec::new("rotation", ParamValue::Scalar(0.0)),
    ParamSpec::new("scale", ParamValue::Scalar(1.0)),
    ParamSpec::new("size", ParamValue::Point([1.0, 1.0])),
];

// ============================================================================
// Resources
// ============================================================================

const CAMERA: &[ParamSpec] = &[
    ParamSpec::new("orientation", ParamValue::Scalar(0.0)),
    ParamSpec::new("mirrored", ParamValue::Bool(false)),
    ParamSpec::new("flip_flop", ParamValue::Bool(false)),
];

/// Parameter schema of `kind`
pub fn schema(kind: NodeKind) -> &'static [ParamSpec] {
    match kind {
        NodeKind::Color => COLOR,
        NodeKind::Circle => CIRCLE,
        NodeKind::Transform => TRANSFORM,
        NodeKind::HueSaturation => HUE_SATURATION,
        NodeKind::Blend => BLEND,
        NodeKind::Camera => CAMERA,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_schema_keys_are_unique() {
        for kind in NodeKind::ALL {
            let names: HashSet<_> = schema(kind).iter().map(|spec| spec.name).collect();
            assert_eq!(names.len(), schema(kind).len(), "duplicate key in {kind}");
        }
    }

    #[test]
    fn test_defaults_pass_validation() {
        for kind in NodeKind::ALL {
            for spec in schema(kind) {
                assert_eq!(spec.validate(spec.default), Ok(spec.default));
            }
        }
    }
}
