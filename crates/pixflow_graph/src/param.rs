// SPDX-License-Identifier: MIT OR Apache-2.0
//! Typed node parameters.
//!
//! Every node kind declares a fixed list of [`ParamSpec`]s. Values entering a
//! node always pass through [`ParamSpec::validate`], which rejects wrong types
//! and non-finite numbers and clamps ranged values into their range.

use crate::node::NodeId;
use serde::{Deserialize, Serialize};
use std::fmt;

/// RGBA color with `f32` channels in `[0, 1]`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Color {
    /// Red
    pub r: f32,
    /// Green
    pub g: f32,
    /// Blue
    pub b: f32,
    /// Alpha
    pub a: f32,
}

impl Color {
    /// Opaque white
    pub const WHITE: Self = Self::rgba(1.0, 1.0, 1.0, 1.0);
    /// Opaque black
    pub const BLACK: Self = Self::rgba(0.0, 0.0, 0.0, 1.0);
    /// Opaque mid gray
    pub const GRAY: Self = Self::rgba(0.5, 0.5, 0.5, 1.0);
    /// Opaque red
    pub const RED: Self = Self::rgba(1.0, 0.0, 0.0, 1.0);
    /// Fully transparent
    pub const CLEAR: Self = Self::rgba(0.0, 0.0, 0.0, 0.0);

    /// Create a color from its four channels
    pub const fn rgba(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self { r, g, b, a }
    }

    /// Channels in packing order
    pub fn channels(&self) -> [f32; 4] {
        [self.r, self.g, self.b, self.a]
    }

    fn clamped(self) -> Self {
        Self {
            r: self.r.clamp(0.0, 1.0),
            g: self.g.clamp(0.0, 1.0),
            b: self.b.clamp(0.0, 1.0),
            a: self.a.clamp(0.0, 1.0),
        }
    }
}

/// Compositing mode of a blend node.
///
/// The discriminant order is part of the uniform layout and must not change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlendMode {
    /// A over B
    Over,
    /// A under B
    Under,
    /// A + B
    Add,
    /// A * B
    Multiply,
    /// |A - B|
    Difference,
    /// A - B including alpha
    SubtractWithAlpha,
    /// A - B on color channels
    Subtract,
    /// max(A, B)
    Maximum,
    /// min(A, B)
    Minimum,
    /// A ^ (1 / B)
    Gamma,
    /// A ^ B
    Power,
}

impl BlendMode {
    /// All modes in index order
    pub const ALL: [BlendMode; 11] = [
        BlendMode::Over,
        BlendMode::Under,
        BlendMode::Add,
        BlendMode::Multiply,
        BlendMode::Difference,
        BlendMode::SubtractWithAlpha,
        BlendMode::Subtract,
        BlendMode::Maximum,
        BlendMode::Minimum,
        BlendMode::Gamma,
        BlendMode::Power,
    ];

    /// Fixed uniform index of this mode
    pub fn index(self) -> u32 {
        self as u32
    }

    /// Operator symbol, used as the default name of operator-built blends
    pub fn symbol(self) -> &'static str {
        match self {
            Self::Over => "&",
            Self::Under => "!&",
            Self::Add => "+",
            Self::Multiply => "*",
            Self::Difference => "%",
            Self::SubtractWithAlpha => "--",
            Self::Subtract => "-",
            Self::Maximum => "><",
            Self::Minimum => "<>",
            Self::Gamma => "!**",
            Self::Power => "**",
        }
    }
}

/// Placement of an input image inside the output frame.
///
/// The discriminant order is part of the uniform layout and must not change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FillMode {
    /// Stretch to the output size
    Fill,
    /// Fit inside, keeping the aspect ratio
    AspectFit,
    /// Cover the output, keeping the aspect ratio
    AspectFill,
    /// Keep the source pixel size
    Pixel,
}

impl FillMode {
    /// Fixed uniform index of this mode
    pub fn index(self) -> u32 {
        self as u32
    }
}

impl Default for FillMode {
    fn default() -> Self {
        Self::AspectFit
    }
}

/// Declared type of a parameter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ParamType {
    /// Single float
    Scalar,
    /// 2D point
    Point,
    /// RGBA color
    Color,
    /// Boolean flag
    Bool,
    /// Blend mode selector
    Blend,
    /// Fill mode selector
    Fill,
}

impl ParamType {
    /// Number of floats this type occupies in a uniform vector
    pub fn width(self) -> usize {
        match self {
            Self::Scalar | Self::Bool | Self::Blend | Self::Fill => 1,
            Self::Point => 2,
            Self::Color => 4,
        }
    }
}

impl fmt::Display for ParamType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Scalar => "scalar",
            Self::Point => "point",
            Self::Color => "color",
            Self::Bool => "bool",
            Self::Blend => "blend mode",
            Self::Fill => "fill mode",
        };
        f.write_str(name)
    }
}

/// Value stored in a parameter
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum ParamValue {
    /// Single float
    Scalar(f32),
    /// 2D point
    Point([f32; 2]),
    /// RGBA color
    Color(Color),
    /// Boolean flag
    Bool(bool),
    /// Blend mode
    Blend(BlendMode),
    /// Fill mode
    Fill(FillMode),
}

impl ParamValue {
    /// Get the declared type matching this value
    pub fn param_type(&self) -> ParamType {
        match self {
            Self::Scalar(_) => ParamType::Scalar,
            Self::Point(_) => ParamType::Point,
            Self::Color(_) => ParamType::Color,
            Self::Bool(_) => ParamType::Bool,
            Self::Blend(_) => ParamType::Blend,
            Self::Fill(_) => ParamType::Fill,
        }
    }

    fn is_finite(&self) -> bool {
        match self {
            Self::Scalar(v) => v.is_finite(),
            Self::Point(p) => p.iter().all(|v| v.is_finite()),
            Self::Color(c) => c.channels().iter().all(|v| v.is_finite()),
            Self::Bool(_) | Self::Blend(_) | Self::Fill(_) => true,
        }
    }
}

impl From<f32> for ParamValue {
    fn from(value: f32) -> Self {
        Self::Scalar(value)
    }
}

impl From<[f32; 2]> for ParamValue {
    fn from(value: [f32; 2]) -> Self {
        Self::Point(value)
    }
}

impl From<Color> for ParamValue {
    fn from(value: Color) -> Self {
        Self::Color(value)
    }
}

impl From<bool> for ParamValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<BlendMode> for ParamValue {
    fn from(value: BlendMode) -> Self {
        Self::Blend(value)
    }
}

impl From<FillMode> for ParamValue {
    fn from(value: FillMode) -> Self {
        Self::Fill(value)
    }
}

/// Declaration of one parameter in a kind's schema
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParamSpec {
    /// Parameter key
    pub name: &'static str,
    /// Value a fresh node starts with
    pub default: ParamValue,
    /// Inclusive range for scalar parameters
    pub range: Option<(f32, f32)>,
}

impl ParamSpec {
    /// Declare an unconstrained parameter
    pub const fn new(name: &'static str, default: ParamValue) -> Self {
        Self { name, default, range: None }
    }

    /// Declare a scalar parameter clamped to `[min, max]`
    pub const fn ranged(name: &'static str, default: f32, min: f32, max: f32) -> Self {
        Self {
            name,
            default: ParamValue::Scalar(default),
            range: Some((min, max)),
        }
    }

    /// Declared type
    pub fn param_type(&self) -> ParamType {
        self.default.param_type()
    }

    /// Check a value against this declaration, returning the value to store.
    ///
    /// Out-of-range scalars and color channels are clamped; wrong types and
    /// NaN/infinite components are rejected.
    pub fn validate(&self, value: ParamValue) -> Result<ParamValue, ParamError> {
        let expected = self.param_type();
        if value.param_type() != expected {
            return Err(ParamError::TypeMismatch {
                name: self.name.to_string(),
                expected,
                found: value.param_type(),
            });
        }
        if !value.is_finite() {
            return Err(ParamError::NonFinite(self.name.to_string()));
        }

        Ok(match (value, self.range) {
            (ParamValue::Scalar(v), Some((min, max))) => ParamValue::Scalar(v.clamp(min, max)),
            (ParamValue::Color(c), _) => ParamValue::Color(c.clamped()),
            (other, _) => other,
        })
    }
}

/// Error when setting a parameter
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ParamError {
    /// Node not found
    #[error("Node not found: {0:?}")]
    NodeNotFound(NodeId),

    /// The node kind has no parameter with this key
    #[error("Unknown parameter: {0}")]
    UnknownParameter(String),

    /// The value has the wrong type
    #[error("Parameter {name} expects a {expected}, got a {found}")]
    TypeMismatch {
        /// Parameter key
        name: String,
        /// Declared type
        expected: ParamType,
        /// Type of the rejected value
        found: ParamType,
    },

    /// The value contains NaN or infinity
    #[error("Parameter {0} must be finite")]
    NonFinite(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_clamps_color_channels() {
        let spec = ParamSpec::new("color", ParamValue::Color(Color::WHITE));
        let value = spec
            .validate(ParamValue::Color(Color::rgba(1.5, -0.2, 0.5, 1.0)))
            .unwrap();
        assert_eq!(value, ParamValue::Color(Color::rgba(1.0, 0.0, 0.5, 1.0)));
    }

    #[test]
    fn test_validate_clamps_ranged_scalar() {
        let spec = ParamSpec::ranged("hue", 0.0, 0.0, 1.0);
        assert_eq!(spec.validate(ParamValue::Scalar(3.0)).unwrap(), ParamValue::Scalar(1.0));
        assert_eq!(spec.validate(ParamValue::Scalar(0.4)).unwrap(), ParamValue::Scalar(0.4));
    }

    #[test]
    fn test_validate_rejects_type_mismatch() {
        let spec = ParamSpec::new("radius", ParamValue::Scalar(0.25));
        let err = spec.validate(ParamValue::Bool(true)).unwrap_err();
        assert!(matches!(
            err,
            ParamError::TypeMismatch { expected: ParamType::Scalar, found: ParamType::Bool, .. }
        ));
    }

    #[test]
    fn test_validate_rejects_nan() {
        let spec = ParamSpec::new("position", ParamValue::Point([0.0, 0.0]));
        let err = spec.validate(ParamValue::Point([f32::NAN, 0.0])).unwrap_err();
        assert_eq!(err, ParamError::NonFinite("position".to_string()));
    }

    #[test]
    fn test_blend_mode_indices_are_stable() {
        for (i, mode) in BlendMode::ALL.iter().enumerate() {
            assert_eq!(mode.index() as usize, i);
        }
        assert_eq!(BlendMode::Power.index(), 10);
        assert_eq!(FillMode::AspectFit.index(), 1);
    }
}
