pub mod invoke;
pub mod run;
pub mod show;

use std::process::ExitCode;

use comfy_table::{Cell, Color, Table, modifiers::UTF8_ROUND_CORNERS, presets::UTF8_FULL};
use sismos_igp::Response;

use crate::config::Config;

/// Print a response envelope to stdout; non-200 exits non-zero.
pub fn print_response(response: &Response) -> anyhow::Result<ExitCode> {
    println!("{}", serde_json::to_string_pretty(response)?);
    Ok(if response.is_success() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

pub fn print_config(pipeline: &sismos_igp::Config, file: &Config) {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_header(vec![
            Cell::new("Setting").fg(Color::Cyan),
            Cell::new("Value").fg(Color::Cyan),
        ]);

    let http = file.http_config();
    table.add_row(vec!["Source URL", &pipeline.source_url]);
    table.add_row(vec!["Strategy", &format!("{:?}", pipeline.strategy)]);
    table.add_row(vec!["Table selector", &pipeline.table_selector]);
    table.add_row(vec!["Row schema", &format!("{:?}", pipeline.schema)]);
    table.add_row(vec!["Limit", &pipeline.limit.to_string()]);
    table.add_row(vec![
        "Render timeout",
        &format!("{}s", pipeline.render_timeout.as_secs()),
    ]);
    table.add_row(vec![
        "Chromium",
        &pipeline
            .chrome_path
            .as_ref()
            .map_or_else(|| "autodetect".to_string(), |p| p.display().to_string()),
    ]);
    table.add_row(vec![
        "Collection",
        pipeline.table.as_deref().unwrap_or("not set (CSV only)"),
    ]);
    table.add_row(vec!["Store directory", &pipeline.store_dir.display().to_string()]);
    table.add_row(vec!["CSV path", &pipeline.csv_path.display().to_string()]);
    table.add_row(vec![
        "HTTP timeouts",
        &format!(
            "connect {}s, request {}s",
            http.connect_timeout.as_secs(),
            http.request_timeout.as_secs()
        ),
    ]);
    table.add_row(vec!["User agent", &http.user_agent]);

    eprintln!("\n{table}");
}
