// SPDX-License-Identifier: MIT OR Apache-2.0
//! Preview render passes.
//!
//! The preview backend does no image processing: generators produce a solid
//! image of their main color and effects pass their first input through.
//! It is meant for checking which nodes a pass touches and what uniforms
//! they receive.

use super::common::load_graph;
use anyhow::Context;
use clap::Args;
use pixflow_graph::{
    uniforms, BackendError, FrameMetadata, NodeCategory, NodeKind, PixelBuffer, RenderRequest,
    ResourceFrame,
};
use std::path::PathBuf;

/// Largest accepted image side
const MAX_SIDE: i64 = 16_384;

fn side_parser() -> clap::builder::RangedI64ValueParser<u32> {
    clap::value_parser!(u32).range(1..=MAX_SIDE)
}

/// Render a record with the preview backend.
#[derive(Args)]
pub struct RenderArgs {
    /// Record to render (`.ron` or `.json`)
    pub file: PathBuf,

    /// Graph configuration (RON)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Output width in pixels
    #[arg(long, default_value = "64", value_parser = side_parser())]
    pub width: u32,

    /// Output height in pixels
    #[arg(long, default_value = "64", value_parser = side_parser())]
    pub height: u32,

    /// Number of passes; every pass after the first pushes a new frame to
    /// each resource node
    #[arg(short, long, default_value = "1")]
    pub passes: u32,
}

/// Run the render command.
pub fn run(args: RenderArgs) -> anyhow::Result<()> {
    let blank = PixelBuffer::try_solid(args.width, args.height, [0, 0, 0, 255])
        .with_context(|| format!("{}x{} image is too large", args.width, args.height))?;
    let (mut graph, root) = load_graph(&args.file, args.config.as_ref())?;
    let resources: Vec<_> = graph
        .nodes()
        .filter(|node| node.category() == NodeCategory::Resource)
        .map(|node| node.id())
        .collect();

    for pass in 0..args.passes.max(1) {
        for &resource in &resources {
            let frame = ResourceFrame::new(
                blank.clone(),
                FrameMetadata {
                    sequence: u64::from(pass),
                    orientation: None,
                },
            );
            graph.push_frame(resource, frame)?;
        }

        let mut rendered = Vec::new();
        let mut backend = |request: &RenderRequest| -> Result<PixelBuffer, BackendError> {
            rendered.push(format!(
                "{} ({} uniforms)",
                request.kind.tag(),
                request.uniforms.len()
            ));
            preview(request, args.width, args.height)
        };
        let result = graph.render_pass(root, &mut backend)?;

        println!("Pass {}: {} nodes rendered", pass + 1, rendered.len());
        for line in &rendered {
            println!("  {line}");
        }
        println!("  result {}x{}", result.width, result.height);
    }
    Ok(())
}

fn preview(
    request: &RenderRequest,
    width: u32,
    height: u32,
) -> Result<PixelBuffer, BackendError> {
    if let Some(input) = request.inputs.first() {
        return Ok(input.clone());
    }
    let color = match request.kind {
        NodeKind::Color | NodeKind::Circle => uniforms::offset_of(request.kind, "color")
            .and_then(|offset| request.uniforms.get(offset..offset + 4)),
        _ => None,
    };
    let rgba = match color {
        Some(&[r, g, b, a]) => [to_byte(r), to_byte(g), to_byte(b), to_byte(a)],
        _ => [0, 0, 0, 0],
    };
    PixelBuffer::try_solid(width, height, rgba)
        .ok_or_else(|| BackendError::new(format!("{width}x{height} image is too large")))
}

fn to_byte(channel: f32) -> u8 {
    (channel.clamp(0.0, 1.0) * 255.0).round() as u8
}

#[cfg(test)]
mod tests {
    use super::*;
    use pixflow_graph::{Graph, NodeId};

    #[test]
    fn test_preview_uses_color_uniforms() {
        let mut graph = Graph::new();
        let color = graph.add_node(NodeKind::Color);
        let request = RenderRequest {
            node: color,
            kind: NodeKind::Color,
            uniforms: uniforms::pack(graph.node(color).unwrap()),
            inputs: Vec::new(),
        };
        assert_eq!(
            preview(&request, 2, 1),
            Ok(PixelBuffer::solid(2, 1, [255, 255, 255, 255]))
        );
    }

    #[test]
    fn test_preview_passes_input_through() {
        let input = PixelBuffer::solid(3, 3, [1, 2, 3, 4]);
        let request = RenderRequest {
            node: NodeId::new(),
            kind: NodeKind::HueSaturation,
            uniforms: vec![0.0, 1.0],
            inputs: vec![input.clone()],
        };
        assert_eq!(preview(&request, 8, 8), Ok(input));
    }

    #[test]
    fn test_preview_rejects_oversized_output() {
        let request = RenderRequest {
            node: NodeId::new(),
            kind: NodeKind::Circle,
            uniforms: Vec::new(),
            inputs: Vec::new(),
        };
        assert!(preview(&request, u32::MAX, u32::MAX).is_err());
    }

    #[test]
    fn test_image_size_is_bounded() {
        use clap::Parser;

        #[derive(Parser)]
        struct Harness {
            #[command(flatten)]
            render: RenderArgs,
        }

        assert!(Harness::try_parse_from(["pixflow", "a.ron", "--width", "100000"]).is_err());
        let parsed = Harness::try_parse_from(["pixflow", "a.ron", "--height", "16384"]).unwrap();
        assert_eq!(parsed.render.height, 16_384);
        assert_eq!(parsed.render.width, 64);
    }
}
