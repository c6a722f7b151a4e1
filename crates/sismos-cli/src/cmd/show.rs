//! `sismos show` - print the published collection

use anyhow::{Context, Result};
use clap::Args;
use comfy_table::{Cell, Color, Table, modifiers::UTF8_ROUND_CORNERS, presets::UTF8_FULL};
use sismos_store::{FileStore, RecordStore, read_current};

#[derive(Args, Debug)]
pub struct ShowArgs {
    /// Collection name (default: configured one)
    #[arg(short, long)]
    pub table: Option<String>,

    /// Print JSON instead of a table
    #[arg(long)]
    pub json: bool,
}

pub fn run(args: ShowArgs, config: &sismos_igp::Config) -> Result<()> {
    let name = args
        .table
        .or_else(|| config.table.clone())
        .context("No collection configured (set DDB_TABLE or pass --table)")?;
    let store = FileStore::open(&config.store_dir, &name)?;
    let items = read_current(&store)?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&items)?);
        return Ok(());
    }

    let Some(generation) = store.current_generation()? else {
        eprintln!("Nothing published in {name} yet.");
        return Ok(());
    };

    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_header(vec![
            Cell::new("#").fg(Color::Cyan),
            Cell::new("Occurred").fg(Color::Cyan),
            Cell::new("Mag").fg(Color::Cyan),
            Cell::new("Depth").fg(Color::Cyan),
            Cell::new("Lat").fg(Color::Cyan),
            Cell::new("Lon").fg(Color::Cyan),
            Cell::new("Place").fg(Color::Cyan),
        ]);

    for item in &items {
        let rec = &item.record;
        table.add_row(vec![
            Cell::new(item.rank + 1),
            Cell::new(&rec.occurred_at),
            Cell::new(&rec.magnitude).fg(Color::Yellow),
            Cell::new(rec.depth.as_deref().unwrap_or("-")),
            Cell::new(rec.latitude.as_deref().unwrap_or("-")),
            Cell::new(rec.longitude.as_deref().unwrap_or("-")),
            Cell::new(rec.report_url.as_deref().map_or(rec.place.clone(), |url| {
                format!("{} ({url})", rec.place)
            })),
        ]);
    }

    eprintln!("\n{table}");
    eprintln!(
        "{name}: generation {} with {} events, published {}",
        generation.id,
        items.len(),
        generation.published_at.format("%Y-%m-%d %H:%M:%S UTC")
    );
    Ok(())
}
