//! Events table extraction
//!
//! Finds the table by its structural anchor, skips the header row, and maps
//! the next `limit` rows onto records by cell position. Rows that do not
//! fit the column schema are reported as [`RowSkip`]s and left out; they
//! never abort the extraction.

use scraper::{ElementRef, Html, Node, Selector};
use sismos_core::{ExtractError, RowSkip, SeismicRecord, SkipReason};
use url::Url;

use crate::config::RowSchema;

/// Records in source order plus the rows that were left out.
#[derive(Debug, Default)]
pub struct Extraction {
    pub records: Vec<SeismicRecord>,
    pub skipped: Vec<RowSkip>,
}

impl Extraction {
    pub(crate) fn push(&mut self, row: usize, mapped: Result<SeismicRecord, SkipReason>) {
        match mapped {
            Ok(record) => self.records.push(record),
            Err(reason) => {
                let skip = RowSkip { row, reason };
                log::warn!("Skipping {skip}");
                self.skipped.push(skip);
            }
        }
    }
}

/// Trim cell text and fold line breaks into single spaces.
///
/// Cells sometimes carry a reference code and a `<br>` inside one `<td>`;
/// each line becomes one space-separated token.
pub fn normalize_text(raw: &str) -> String {
    raw.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Cell text with text nodes concatenated as-is; only `<br>` breaks a token.
fn cell_text(cell: &ElementRef<'_>) -> String {
    let mut raw = String::new();
    for node in cell.descendants() {
        match node.value() {
            Node::Text(text) => raw.push_str(text),
            Node::Element(el) if el.name() == "br" => raw.push('\n'),
            _ => {}
        }
    }
    normalize_text(&raw)
}

fn parse_selector(src: &str) -> Result<Selector, ExtractError> {
    Selector::parse(src).map_err(|e| ExtractError::InvalidSelector {
        selector: src.to_string(),
        message: e.to_string(),
    })
}

/// HTML table → records, by positional column mapping.
#[derive(Debug)]
pub struct TableExtractor {
    table_src: String,
    table: Selector,
    row: Selector,
    cell: Selector,
    link: Selector,
    schema: RowSchema,
    limit: usize,
}

impl TableExtractor {
    pub fn new(table_selector: &str, schema: RowSchema, limit: usize) -> Result<Self, ExtractError> {
        Ok(Self {
            table_src: table_selector.to_string(),
            table: parse_selector(table_selector)?,
            row: parse_selector("tr")?,
            cell: parse_selector("td")?,
            link: parse_selector("a[href]")?,
            schema,
            limit,
        })
    }

    /// Extract up to `limit` records from the first matching table.
    ///
    /// Only the header row and the first `limit` data rows are read.
    pub fn extract(&self, markup: &str, base_url: &Url) -> Result<Extraction, ExtractError> {
        let document = Html::parse_document(markup);
        let table = document
            .select(&self.table)
            .next()
            .ok_or_else(|| ExtractError::TableNotFound {
                selector: self.table_src.clone(),
            })?;

        let mut out = Extraction::default();
        for (idx, row) in table.select(&self.row).skip(1).take(self.limit).enumerate() {
            out.push(idx + 1, self.map_row(&row, base_url));
        }

        log::debug!(
            "extracted {} records ({} rows skipped) from `{}`",
            out.records.len(),
            out.skipped.len(),
            self.table_src
        );
        Ok(out)
    }

    /// Validate one row against the column schema and map it.
    ///
    /// Only a missing cell disqualifies a row; blank cells are kept as-is.
    fn map_row(&self, row: &ElementRef<'_>, base_url: &Url) -> Result<SeismicRecord, SkipReason> {
        let cells: Vec<String> = row.select(&self.cell).map(|c| cell_text(&c)).collect();
        let too_few = || SkipReason::TooFewCells {
            found: cells.len(),
            required: self.schema.required_cells(),
        };

        match self.schema {
            RowSchema::Tabular => {
                let [date, time, lat, lon, depth, mag, place, ..] = cells.as_slice() else {
                    return Err(too_few());
                };
                Ok(SeismicRecord {
                    occurred_at: normalize_text(&format!("{date}\n{time}")),
                    latitude: Some(lat.clone()),
                    longitude: Some(lon.clone()),
                    depth: Some(depth.clone()),
                    magnitude: mag.clone(),
                    place: place.clone(),
                    report_url: None,
                })
            }
            RowSchema::Linked => {
                let [reference, when, mag, ..] = cells.as_slice() else {
                    return Err(too_few());
                };
                let report_url = match row.select(&self.link).next() {
                    Some(a) => Some(resolve_link(a.value().attr("href").unwrap_or(""), base_url)?),
                    None => None,
                };
                Ok(SeismicRecord {
                    occurred_at: when.clone(),
                    latitude: None,
                    longitude: None,
                    depth: None,
                    magnitude: mag.clone(),
                    place: reference.clone(),
                    report_url,
                })
            }
        }
    }
}

/// Resolve a row link against the page URL.
pub(crate) fn resolve_link(href: &str, base_url: &Url) -> Result<String, SkipReason> {
    let href = href.trim();
    if href.is_empty() {
        return Err(SkipReason::BadLink {
            href: href.to_string(),
        });
    }
    base_url
        .join(href)
        .map(String::from)
        .map_err(|_| SkipReason::BadLink {
            href: href.to_string(),
        })
}
