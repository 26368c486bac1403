//! Check system capabilities.

use versereel_common::media::command_exists;
use versereel_common::AppConfig;
use versereel_processing_core::FontSet;

pub fn run(config: &AppConfig) -> anyhow::Result<()> {
    println!("VerseReel System Check");
    println!("{}", "=".repeat(50));

    let mut ready = true;
    for binary in [&config.render.ffmpeg_bin, &config.render.ffprobe_bin] {
        if command_exists(binary) {
            println!("[OK] {binary} found");
        } else {
            println!("[MISSING] {binary} not found in PATH");
            ready = false;
        }
    }

    match FontSet::load(&config.text) {
        Ok(fonts) => {
            println!("[OK] Original font: {}", fonts.original.path.display());
            if fonts.translation.path == config.text.translation_font {
                println!("[OK] Translation font: {}", fonts.translation.path.display());
            } else {
                println!(
                    "[WARN] Translation font {} missing, using {}",
                    config.text.translation_font.display(),
                    fonts.translation.path.display()
                );
            }
        }
        Err(e) => {
            println!("[MISSING] {e}");
            ready = false;
        }
    }

    let fallback = &config.paths.fallback_background;
    if fallback.is_file() {
        println!("[OK] Fallback background: {}", fallback.display());
    } else {
        println!("[WARN] No fallback background at {}", fallback.display());
    }

    println!("[OK] Renderer: {:?}", config.render.backend);
    println!("[OK] Output directory: {}", config.paths.output_dir.display());

    println!();
    if ready {
        println!("All required capabilities are available. VerseReel is ready.");
    } else {
        println!("Some required capabilities are missing. See above for fixes.");
    }
    Ok(())
}
