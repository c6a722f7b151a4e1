//! The extracted seismic event record

use serde::{Deserialize, Serialize};

/// One reported seismic event, as presented by the source.
///
/// Values are kept as source text; nothing is parsed into numbers or
/// timestamps. The identifier is not part of the record: it is minted by
/// the synchronizer right before persistence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeismicRecord {
    /// Date and time of the event ("date time" for split-column tables).
    pub occurred_at: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latitude: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub longitude: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub depth: Option<String>,
    pub magnitude: String,
    /// Place description or report reference code.
    pub place: String,
    /// Absolute link to the event's detail page.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub report_url: Option<String>,
}

impl SeismicRecord {
    /// Present fields as `(key, value)` pairs, in declaration order.
    ///
    /// Keys match the serialized field names, so a CSV header built from
    /// one record lines up with its JSON form.
    pub fn fields(&self) -> Vec<(&'static str, &str)> {
        let mut out = Vec::with_capacity(7);
        out.push(("occurred_at", self.occurred_at.as_str()));
        if let Some(v) = &self.latitude {
            out.push(("latitude", v.as_str()));
        }
        if let Some(v) = &self.longitude {
            out.push(("longitude", v.as_str()));
        }
        if let Some(v) = &self.depth {
            out.push(("depth", v.as_str()));
        }
        out.push(("magnitude", self.magnitude.as_str()));
        out.push(("place", self.place.as_str()));
        if let Some(v) = &self.report_url {
            out.push(("report_url", v.as_str()));
        }
        out
    }

    /// Look up a field value by its serialized key.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.fields()
            .into_iter()
            .find_map(|(k, v)| (k == key).then_some(v))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tabular() -> SeismicRecord {
        SeismicRecord {
            occurred_at: "19/10/2026 08:14:02".into(),
            latitude: Some("-12.05".into()),
            longitude: Some("-77.12".into()),
            depth: Some("45 km".into()),
            magnitude: "4.2".into(),
            place: "32 km al SO de Lima".into(),
            report_url: None,
        }
    }

    #[test]
    fn fields_in_declaration_order() {
        let keys: Vec<_> = tabular().fields().into_iter().map(|(k, _)| k).collect();
        assert_eq!(
            keys,
            [
                "occurred_at",
                "latitude",
                "longitude",
                "depth",
                "magnitude",
                "place"
            ]
        );
    }

    #[test]
    fn fields_skip_absent_values() {
        let rec = SeismicRecord {
            occurred_at: "2026-10-19 08:14".into(),
            latitude: None,
            longitude: None,
            depth: None,
            magnitude: "3.9".into(),
            place: "IGP/CENSIS/RS 2026-0612".into(),
            report_url: Some("https://example.com/r/612".into()),
        };
        let keys: Vec<_> = rec.fields().into_iter().map(|(k, _)| k).collect();
        assert_eq!(keys, ["occurred_at", "magnitude", "place", "report_url"]);
    }

    #[test]
    fn get_by_key() {
        let rec = tabular();
        assert_eq!(rec.get("depth"), Some("45 km"));
        assert_eq!(rec.get("report_url"), None);
    }

    #[test]
    fn json_keys_match_fields() {
        let rec = tabular();
        let value = serde_json::to_value(&rec).unwrap();
        let obj = value.as_object().unwrap();
        assert_eq!(obj.len(), rec.fields().len());
        for (key, val) in rec.fields() {
            assert_eq!(obj[key], val);
        }
        assert!(!obj.contains_key("report_url"));
    }
}
