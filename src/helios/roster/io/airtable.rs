//! Remote roster store.
//!
//! [`RosterStore`] is the narrow contract the reconciliation needs;
//! [`AirtableClient`] implements it against the Airtable REST API with a
//! blocking reqwest client (no async runtime required).

use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, instrument};

use crate::helios::roster::config::AirtableConfig;
use crate::helios::roster::error::{Result, RosterError};

/// Field name → value payload of a record.
pub type Fields = Map<String, Value>;

/// A table inside a named base.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Table {
    pub base_id: String,
    pub id: String,
    pub name: String,
}

/// A stored record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub id: String,
    #[serde(default)]
    pub fields: Fields,
}

impl Record {
    /// Returns the string stored under `field`, if any.
    pub fn text(&self, field: &str) -> Option<&str> {
        self.fields.get(field).and_then(Value::as_str)
    }
}

pub trait RosterStore {
    /// Resolves `table_name` inside the base called `base_name`.
    fn find_table(&mut self, base_name: &str, table_name: &str) -> Result<Table>;

    /// Every record currently stored in `table`.
    fn list_records(&mut self, table: &Table) -> Result<Vec<Record>>;

    /// Stores new records and returns them with their assigned ids.
    fn add_records(&mut self, table: &Table, records: Vec<Fields>) -> Result<Vec<Record>>;
}

#[derive(Debug, Deserialize)]
struct BaseSummary {
    id: String,
    name: String,
}

#[derive(Debug, Deserialize)]
struct BasesPage {
    #[serde(default)]
    bases: Vec<BaseSummary>,
    offset: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TableSummary {
    id: String,
    name: String,
}

#[derive(Debug, Deserialize)]
struct TablesPage {
    #[serde(default)]
    tables: Vec<TableSummary>,
}

#[derive(Debug, Deserialize)]
struct RecordsPage {
    #[serde(default)]
    records: Vec<Record>,
    offset: Option<String>,
}

#[derive(Debug, Serialize)]
struct NewRecord {
    fields: Fields,
}

#[derive(Debug, Serialize)]
struct CreateRecords {
    records: Vec<NewRecord>,
}

/// Airtable API client.
pub struct AirtableClient {
    http: reqwest::blocking::Client,
    api_base: String,
    token: String,
}

impl AirtableClient {
    pub fn new(config: &AirtableConfig) -> Result<Self> {
        let http = reqwest::blocking::Client::builder()
            .user_agent(format!("helios-roster/{}", env!("CARGO_PKG_VERSION")))
            .timeout(Duration::from_secs(30))
            .build()?;

        Ok(Self {
            http,
            api_base: config.api_base.clone(),
            token: config.token.clone(),
        })
    }

    fn find_base_id(&self, name: &str) -> Result<String> {
        let url = format!("{}/v0/meta/bases", self.api_base);
        let mut offset: Option<String> = None;

        loop {
            let page: BasesPage = self.get_json(&url, offset.as_deref())?;
            if let Some(base) = page.bases.into_iter().find(|base| base.name == name) {
                return Ok(base.id);
            }
            match page.offset {
                Some(next) => offset = Some(next),
                None => {
                    return Err(RosterError::NotFound {
                        kind: "base",
                        name: name.to_string(),
                    });
                }
            }
        }
    }

    fn get_json<T: DeserializeOwned>(&self, url: &str, offset: Option<&str>) -> Result<T> {
        let mut request = self.http.get(url).bearer_auth(&self.token);
        if let Some(offset) = offset {
            request = request.query(&[("offset", offset)]);
        }
        let response = check_status(request.send()?)?;
        Ok(response.json()?)
    }
}

impl RosterStore for AirtableClient {
    #[instrument(level = "debug", skip(self))]
    fn find_table(&mut self, base_name: &str, table_name: &str) -> Result<Table> {
        let base_id = self.find_base_id(base_name)?;
        let url = format!("{}/v0/meta/bases/{base_id}/tables", self.api_base);
        let page: TablesPage = self.get_json(&url, None)?;

        let table = page
            .tables
            .into_iter()
            .find(|table| table.name == table_name)
            .ok_or_else(|| RosterError::NotFound {
                kind: "table",
                name: format!("{base_name}/{table_name}"),
            })?;

        Ok(Table {
            base_id,
            id: table.id,
            name: table.name,
        })
    }

    #[instrument(level = "debug", skip_all, fields(table = %table.name))]
    fn list_records(&mut self, table: &Table) -> Result<Vec<Record>> {
        let url = format!("{}/v0/{}/{}", self.api_base, table.base_id, table.id);
        let mut records = Vec::new();
        let mut offset: Option<String> = None;

        loop {
            let page: RecordsPage = self.get_json(&url, offset.as_deref())?;
            debug!(page_len = page.records.len(), "fetched record page");
            records.extend(page.records);
            match page.offset {
                Some(next) => offset = Some(next),
                None => return Ok(records),
            }
        }
    }

    #[instrument(level = "debug", skip_all, fields(table = %table.name, count = records.len()))]
    fn add_records(&mut self, table: &Table, records: Vec<Fields>) -> Result<Vec<Record>> {
        let url = format!("{}/v0/{}/{}", self.api_base, table.base_id, table.id);
        let body = CreateRecords {
            records: records
                .into_iter()
                .map(|fields| NewRecord { fields })
                .collect(),
        };

        let response = self
            .http
            .post(&url)
            .bearer_auth(&self.token)
            .json(&body)
            .send()?;
        let page: RecordsPage = check_status(response)?.json()?;
        Ok(page.records)
    }
}

fn check_status(response: reqwest::blocking::Response) -> Result<reqwest::blocking::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().unwrap_or_default();
    Err(RosterError::Remote {
        status: status.as_u16(),
        body,
    })
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn record_page_reads_offset_and_fields() {
        let page: RecordsPage = serde_json::from_value(json!({
            "records": [
                {"id": "rec1", "createdTime": "2024-01-01T00:00:00.000Z",
                 "fields": {"Email": "maria.l@x.com", "Name": "Maria Lopez"}},
                {"id": "rec2"}
            ],
            "offset": "itr2"
        }))
        .expect("page parsed");

        assert_eq!(page.offset.as_deref(), Some("itr2"));
        assert_eq!(page.records[0].text("Email"), Some("maria.l@x.com"));
        assert!(page.records[1].fields.is_empty());
    }

    #[test]
    fn create_body_wraps_fields() {
        let mut fields = Fields::new();
        fields.insert("Email".into(), json!("maria.l@x.com"));
        let body = CreateRecords {
            records: vec![NewRecord { fields }],
        };

        assert_eq!(
            serde_json::to_value(&body).unwrap(),
            json!({"records": [{"fields": {"Email": "maria.l@x.com"}}]})
        );
    }

    #[test]
    fn bases_page_without_offset_is_last() {
        let page: BasesPage = serde_json::from_value(json!({
            "bases": [{"id": "app1", "name": "Directory", "permissionLevel": "create"}]
        }))
        .expect("page parsed");
        assert!(page.offset.is_none());
        assert_eq!(page.bases[0].id, "app1");
        assert_eq!(page.bases[0].name, "Directory");
    }
}
