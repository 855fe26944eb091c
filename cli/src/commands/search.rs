use super::SearchArgs;
use anyhow::{Context, Result};
use console::Style;
use repodex_store::StoreReader;

pub fn handle_search(args: SearchArgs) -> Result<()> {
    let reader = StoreReader::open(&args.index)
        .with_context(|| format!("failed to open index {}", args.index.display()))?;
    let snapshot = reader.snapshot()?;
    let hits = snapshot.search(&args.query, args.top)?;

    if hits.is_empty() {
        println!("No matches found.");
    } else {
        let dim = Style::new().dim();
        let bold = Style::new().bold().cyan();
        for (i, (score, record)) in hits.iter().enumerate() {
            println!(
                "{} {} {}",
                dim.apply_to(format!("{}.", i + 1)),
                bold.apply_to(&record.coordinate),
                dim.apply_to(format!("({score:.2})"))
            );
            if let Some(name) = &record.name {
                println!("   {name}");
            }
            if let Some(prefix) = &record.plugin_prefix {
                println!("   plugin prefix: {prefix}");
            }
            println!("   {}", dim.apply_to(&record.path));
        }
    }

    snapshot.release();
    Ok(())
}
