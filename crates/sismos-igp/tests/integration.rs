//! End-to-end pipeline tests with an injected source and the in-memory store
//!
//! The live test at the bottom needs network access and chromium; it is
//! marked #[ignore].
//! Run with: cargo test -p sismos-igp --test integration -- --ignored

use std::cell::Cell;
use std::collections::HashSet;

use serde_json::json;
use sismos_core::{AcquireError, ProgressContext};
use sismos_igp::{Config, Document, PageAcquirer, Persisted, RowSchema, respond, run_with};
use sismos_store::{FailPoint, MemoryStore, RecordStore, read_current};
use tempfile::TempDir;
use url::Url;

const SOURCE: &str = "https://ultimosismo.igp.gob.pe/ultimo-sismo/sismos-reportados";

/// Serves a canned document or failure, counting acquisitions.
struct FakeSource {
    reply: Reply,
    calls: Cell<usize>,
}

enum Reply {
    Html(String),
    Json(serde_json::Value),
    Status(u16),
}

impl FakeSource {
    fn new(reply: Reply) -> Self {
        Self {
            reply,
            calls: Cell::new(0),
        }
    }
}

impl PageAcquirer for FakeSource {
    fn name(&self) -> &'static str {
        "fake"
    }

    fn acquire(&self, url: &str) -> Result<Document, AcquireError> {
        self.calls.set(self.calls.get() + 1);
        let base_url = Url::parse(url).expect("test URL");
        match &self.reply {
            Reply::Html(markup) => Ok(Document::Html {
                base_url,
                markup: markup.clone(),
            }),
            Reply::Json(payload) => Ok(Document::Json {
                base_url,
                payload: payload.clone(),
            }),
            Reply::Status(status) => Err(AcquireError::Http {
                status: Some(*status),
                message: "upstream".to_string(),
            }),
        }
    }
}

fn row(i: usize) -> String {
    format!(
        "<tr><td>19/10/2026</td><td>{:02}:00:00</td><td>-12.{i}</td><td>-76.{i}</td>\
         <td>{}</td><td>4.{i}</td><td>{i} km al SO de Lima</td></tr>",
        i % 24,
        20 + i
    )
}

fn page(rows: usize) -> String {
    let body: String = (1..=rows).map(row).collect();
    format!(
        "<html><body><h1>Sismos reportados</h1><table class=\"tabla\">\
         <thead><tr><th>Fecha</th><th>Hora</th><th>Latitud</th><th>Longitud</th>\
         <th>Profundidad</th><th>Magnitud</th><th>Referencia</th></tr></thead>\
         <tbody>{body}</tbody></table></body></html>"
    )
}

fn config(dir: &TempDir) -> Config {
    Config {
        source_url: SOURCE.to_string(),
        csv_path: dir.path().join("sismos.csv"),
        table: Some("SismosReportados".to_string()),
        ..Default::default()
    }
}

fn hidden() -> ProgressContext {
    ProgressContext::hidden()
}

#[test]
fn twelve_rows_limit_ten() {
    let dir = TempDir::new().unwrap();
    let store = MemoryStore::new();
    let source = FakeSource::new(Reply::Html(page(12)));

    let outcome = run_with(&config(&dir), &source, Some(&store), &hidden()).unwrap();

    assert_eq!(outcome.records.len(), 10);
    assert!(outcome.skipped.is_empty());
    assert_eq!(outcome.records[0].magnitude, "4.1");
    assert_eq!(outcome.records[9].magnitude, "4.10");
    assert_eq!(store.len(), 10);
}

#[test]
fn missing_table_is_404_without_persistence() {
    let dir = TempDir::new().unwrap();
    let store = MemoryStore::new();
    let source = FakeSource::new(Reply::Html(
        "<html><body><p>Cargando...</p></body></html>".to_string(),
    ));
    let config = config(&dir);

    let response = respond(run_with(&config, &source, Some(&store), &hidden()));

    assert_eq!(response.status_code, 404);
    assert!(response.body.as_str().unwrap().contains("table.tabla"));
    assert!(store.calls().is_empty());
    assert!(!config.csv_path.exists());
}

#[test]
fn upstream_503_passes_through() {
    let dir = TempDir::new().unwrap();
    let store = MemoryStore::new();
    let source = FakeSource::new(Reply::Status(503));

    let response = respond(run_with(&config(&dir), &source, Some(&store), &hidden()));

    assert_eq!(response.status_code, 503);
    assert_eq!(source.calls.get(), 1);
    assert!(store.calls().is_empty());
}

#[test]
fn sync_replaces_previous_run() {
    let dir = TempDir::new().unwrap();
    let store = MemoryStore::new();
    let config = config(&dir);

    let first = run_with(&config, &FakeSource::new(Reply::Html(page(5))), Some(&store), &hidden())
        .unwrap();
    let first_ids: HashSet<String> = match &first.persisted {
        Persisted::Store { report, .. } => report.stored.iter().map(|s| s.id.clone()).collect(),
        other => panic!("expected store, got {other:?}"),
    };

    let second = run_with(&config, &FakeSource::new(Reply::Html(page(3))), Some(&store), &hidden())
        .unwrap();
    let Persisted::Store { report, .. } = &second.persisted else {
        panic!("expected store, got {:?}", second.persisted);
    };

    assert_eq!(report.removed, 5);
    assert_eq!(store.len(), 3);
    let current = read_current(&store).unwrap();
    assert_eq!(current.len(), 3);
    assert!(current.iter().all(|item| !first_ids.contains(&item.id)));
    assert_eq!(current[0].record.magnitude, "4.1");
}

#[test]
fn identical_input_gets_fresh_ids() {
    let dir = TempDir::new().unwrap();
    let store = MemoryStore::new();
    let config = config(&dir);
    let source = FakeSource::new(Reply::Html(page(4)));

    let ids = |store: &MemoryStore| -> HashSet<String> {
        read_current(store).unwrap().into_iter().map(|s| s.id).collect()
    };

    run_with(&config, &source, Some(&store), &hidden()).unwrap();
    let before = ids(&store);
    run_with(&config, &source, Some(&store), &hidden()).unwrap();
    let after = ids(&store);

    assert_eq!(before.len(), 4);
    assert_eq!(after.len(), 4);
    assert!(before.is_disjoint(&after));
}

#[test]
fn store_failure_falls_back_to_csv() {
    let dir = TempDir::new().unwrap();
    let store = MemoryStore::new();
    store.fail_on(Some(FailPoint::Put));
    let config = config(&dir);

    let outcome = run_with(
        &config,
        &FakeSource::new(Reply::Html(page(6))),
        Some(&store),
        &hidden(),
    )
    .unwrap();

    assert!(matches!(outcome.persisted, Persisted::Csv { rows: 6, .. }));
    assert!(read_current(&store).unwrap().is_empty());

    let csv = std::fs::read_to_string(&config.csv_path).unwrap();
    let mut lines = csv.lines();
    assert_eq!(
        lines.next(),
        Some("occurred_at,latitude,longitude,depth,magnitude,place")
    );
    assert_eq!(lines.count(), 6);

    let response = respond(Ok(outcome));
    assert_eq!(response.status_code, 200);
    assert_eq!(response.body.as_array().unwrap().len(), 6);
}

#[test]
fn failed_publish_keeps_previous_generation() {
    let dir = TempDir::new().unwrap();
    let store = MemoryStore::new();
    let config = config(&dir);

    run_with(&config, &FakeSource::new(Reply::Html(page(2))), Some(&store), &hidden()).unwrap();
    let before = read_current(&store).unwrap();

    store.fail_on(Some(FailPoint::Publish));
    let outcome = run_with(&config, &FakeSource::new(Reply::Html(page(7))), Some(&store), &hidden())
        .unwrap();

    assert!(matches!(outcome.persisted, Persisted::Csv { rows: 7, .. }));
    store.fail_on(None);
    let after = read_current(&store).unwrap();
    assert_eq!(before, after);
    assert_eq!(store.len(), 2);
}

#[test]
fn no_collection_writes_csv_only() {
    let dir = TempDir::new().unwrap();
    let config = Config {
        table: None,
        ..config(&dir)
    };

    let outcome = run_with(&config, &FakeSource::new(Reply::Html(page(3))), None, &hidden())
        .unwrap();

    assert!(matches!(outcome.persisted, Persisted::Csv { rows: 3, .. }));
    assert!(config.csv_path.exists());
}

#[test]
fn success_body_lists_stored_items() {
    let dir = TempDir::new().unwrap();
    let store = MemoryStore::new();

    let response = respond(run_with(
        &config(&dir),
        &FakeSource::new(Reply::Html(page(2))),
        Some(&store),
        &hidden(),
    ));

    assert!(response.is_success());
    let body = response.body.as_array().unwrap();
    assert_eq!(body.len(), 2);
    assert!(body[0]["id"].is_string());
    assert_eq!(body[0]["magnitude"], "4.1");
    assert_eq!(body[1]["rank"], 1);

    let envelope = serde_json::to_value(&response).unwrap();
    assert_eq!(envelope["statusCode"], 200);
}

#[test]
fn linked_rows_through_pipeline() {
    let dir = TempDir::new().unwrap();
    let store = MemoryStore::new();
    let config = Config {
        table_selector: "table.table".to_string(),
        schema: RowSchema::Linked,
        ..config(&dir)
    };
    let markup = r#"<table class="table">
        <tr><th>Reporte</th><th>Fecha y hora</th><th>Magnitud</th></tr>
        <tr><td><a href="sismos-reportados/612">IGP/CENSIS/RS<br>2026-0612</a></td>
            <td>19/10/2026 08:14:02</td><td>4.2</td></tr>
        <tr><td>incompleta</td></tr>
    </table>"#;

    let outcome = run_with(
        &config,
        &FakeSource::new(Reply::Html(markup.to_string())),
        Some(&store),
        &hidden(),
    )
    .unwrap();

    assert_eq!(outcome.records.len(), 1);
    assert_eq!(outcome.skipped.len(), 1);
    assert_eq!(outcome.records[0].place, "IGP/CENSIS/RS 2026-0612");
    assert_eq!(
        outcome.records[0].report_url.as_deref(),
        Some("https://ultimosismo.igp.gob.pe/ultimo-sismo/sismos-reportados/612")
    );
    assert_eq!(store.len(), 1);
}

#[test]
fn json_payload_through_pipeline() {
    let dir = TempDir::new().unwrap();
    let store = MemoryStore::new();
    let payload = json!({
        "data": [
            { "fecha_local": "19/10/2026", "hora_local": "08:14:02", "latitud": -12.1,
              "longitud": -76.9, "profundidad": 35, "magnitud": 4.2, "referencia": "Chilca" },
            { "fecha_local": "18/10/2026", "hora_local": "23:50:10", "latitud": -15.3,
              "longitud": -75.1, "profundidad": 60, "referencia": "Nazca" }
        ]
    });

    let outcome = run_with(
        &config(&dir),
        &FakeSource::new(Reply::Json(payload)),
        Some(&store),
        &hidden(),
    )
    .unwrap();

    assert_eq!(outcome.records.len(), 1);
    assert_eq!(outcome.records[0].magnitude, "4.2");
    assert_eq!(outcome.skipped.len(), 1);
    assert_eq!(store.collection(), "memory");
}

/// Fetch and render the live page
/// Run with: cargo test -p sismos-igp --test integration -- --ignored live_rendered_page
#[test]
#[ignore]
fn live_rendered_page() {
    let dir = TempDir::new().unwrap();
    let config = Config {
        csv_path: dir.path().join("sismos.csv"),
        store_dir: dir.path().join("store"),
        table: Some("SismosReportados".to_string()),
        limit: 5,
        ..Default::default()
    };

    let outcome = sismos_igp::run(&config, &hidden()).expect("live run should succeed");

    assert!(!outcome.records.is_empty());
    assert!(outcome.records.len() <= 5);
    assert!(matches!(outcome.persisted, Persisted::Store { .. }));
}
