// SPDX-License-Identifier: MIT OR Apache-2.0
//! CLI command implementations.

pub mod common;
pub mod convert;
pub mod inspect;
pub mod kinds;
pub mod render;
