//! `probe questions`: lists the configured question presets.

use probe_core::config::Config;

pub fn list(config: &Config) {
    println!("Text questions (generate, stream):");
    for (name, question) in &config.questions {
        println!("  {name:<12} {question}");
    }
    println!();
    println!("Vision questions (vision, vision-stream):");
    for (name, question) in &config.vision_questions {
        println!("  {name:<12} {question}");
    }
}
