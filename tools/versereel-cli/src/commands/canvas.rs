//! Show canvas geometry.

use versereel_common::AppConfig;
use versereel_processing_core::LayoutMetrics;
use versereel_project_model::CanvasSpec;

use super::{parse_platform, parse_resolution};

pub fn run(config: &AppConfig, platform: &str, resolution: u32) -> anyhow::Result<()> {
    let platform = parse_platform(platform)?;
    let tier = parse_resolution(resolution)?;
    let canvas = CanvasSpec::for_request(platform, tier);
    let metrics = LayoutMetrics::new(&config.text, &canvas);

    println!("Canvas: {canvas} ({})", platform.as_str());
    println!("  Scale:            {:.3}", metrics.scale);
    println!("  Original font:    {:.1}px", metrics.original_px);
    println!("  Translation font: {:.1}px", metrics.translation_px);
    println!("  Text width:       {:.0}px", metrics.max_text_width);
    println!("  Wrap:             {} chars", metrics.wrap_chars);
    println!("  Anchor line:      y={:.0}", metrics.center_y);
    Ok(())
}
