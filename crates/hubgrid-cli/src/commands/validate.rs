use std::io::{self, Write};
use std::path::Path;

use anyhow::{Context, Result};
use hubgrid_algo::candidates::candidates_from_config;
use hubgrid_cli::inputs::load_config;
use tabwriter::TabWriter;
use tracing::info;

pub fn handle(config_path: &Path) -> Result<()> {
    let config = load_config(Some(config_path))?;
    let candidates = candidates_from_config(&config).context("resolving connection candidates")?;
    info!(
        available = candidates.available().count(),
        "validated {}",
        config_path.display()
    );

    println!("Configuration {} is valid", config_path.display());
    let mut writer = TabWriter::new(io::stdout());
    writeln!(writer, "CONNECTION\tAVAILABLE\tDISTANCE\tMAX CAPACITY\tFIXED COST")?;
    for candidate in &candidates.candidates {
        let distance = candidate
            .distance
            .map_or_else(|| "-".to_string(), |d| d.to_string());
        writeln!(
            writer,
            "{}\t{}\t{}\t{}\t{}",
            candidate.kind,
            if candidate.is_available() { "yes" } else { "no" },
            distance,
            candidate.max_capacity(),
            candidate.fixed_cost,
        )?;
    }
    writer.flush()?;
    if candidates.diagnostics.has_issues() {
        println!("\n{}", candidates.diagnostics);
    }
    Ok(())
}
