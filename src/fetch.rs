use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::Value as JsonValue;
use time::format_description::BorrowedFormatItem;
use time::macros::format_description;
use url::Url;

use crate::client::{FetchWindow, PanelClient, PanelConfig};
use crate::error::FetchError;
use crate::session::Session;
use crate::types::Record;

/// Date format the panel expects in `fdate1`/`fdate2`.
pub const PANEL_DATE_FORMAT: &[BorrowedFormatItem<'static>] =
    format_description!("[year]-[month]-[day] [hour]:[minute]:[second]");

/// Body of the panel's data endpoint (a DataTables server-side response).
#[derive(Debug, Deserialize)]
struct DataResponse {
    #[serde(alias = "aaData")]
    rows: Vec<JsonValue>,
}

/// Build the data query for `window`, always starting at offset 0.
///
/// # Errors
///
/// Returns [`FetchError::Malformed`] if the window cannot be formatted.
pub fn build_data_url(
    data_url: &Url,
    window: &FetchWindow,
    page_size: u32,
) -> Result<Url, FetchError> {
    let format = |dt: time::PrimitiveDateTime| {
        dt.format(PANEL_DATE_FORMAT)
            .map_err(|e| FetchError::Malformed(format!("fetch window: {e}")))
    };
    let from = format(window.from)?;
    let to = format(window.to)?;

    let mut url = data_url.clone();
    url.query_pairs_mut()
        .append_pair("fdate1", &from)
        .append_pair("fdate2", &to)
        .append_pair("iDisplayStart", "0")
        .append_pair("iDisplayLength", &page_size.to_string())
        .append_pair("sEcho", "1");
    Ok(url)
}

/// Turn a data endpoint response into records or a classified failure.
///
/// `landed_on_login` is set when redirects ended on the panel login page.
///
/// # Errors
///
/// Returns [`FetchError::SessionExpired`] for `403` or a login-page
/// response, [`FetchError::Unexpected`] for any other non-200 status, and
/// [`FetchError::Malformed`] for a 200 body without a `rows` array.
pub fn classify_response(
    status: StatusCode,
    landed_on_login: bool,
    body: &str,
) -> Result<Vec<Record>, FetchError> {
    if status == StatusCode::OK && !landed_on_login {
        if let Ok(data) = serde_json::from_str::<DataResponse>(body) {
            return Ok(parse_rows(data.rows));
        }
    }

    if Session::is_auth_failure(status, landed_on_login, body) {
        return Err(FetchError::SessionExpired);
    }

    if status != StatusCode::OK {
        return Err(FetchError::Unexpected(status.as_u16()));
    }

    Err(FetchError::Malformed(
        "expected a JSON object with a `rows` array".into(),
    ))
}

fn parse_rows(rows: Vec<JsonValue>) -> Vec<Record> {
    rows.into_iter()
        .filter_map(|row| {
            let JsonValue::Array(row) = row else {
                tracing::warn!(row = %row, "Skipping non-array data row");
                return None;
            };
            if row.len() < 5 {
                tracing::warn!(cells = row.len(), "Skipping short data row");
                return None;
            }
            Some(Record {
                timestamp: cell_text(&row[0]),
                source_number: cell_text(&row[2]),
                service: cell_text(&row[3]),
                message_body: cell_text(&row[4]),
            })
        })
        .collect()
}

fn cell_text(value: &JsonValue) -> String {
    match value {
        JsonValue::String(s) => s.trim().to_owned(),
        JsonValue::Null => String::new(),
        other => other.to_string().trim().to_owned(),
    }
}

impl PanelClient {
    /// Fetch the newest SMS records inside the configured window.
    ///
    /// Does not retry; [`FetchError::SessionExpired`] tells the caller to
    /// log in again.
    ///
    /// # Errors
    ///
    /// See [`classify_response`]; transport failures map to
    /// [`FetchError::Transport`].
    pub async fn fetch_records(&mut self) -> Result<Vec<Record>, FetchError> {
        let url = build_data_url(
            &self.config.data_url(),
            &self.config.window,
            self.config.page_size,
        )?;

        let response = self
            .session
            .http()
            .get(url)
            .header("X-Requested-With", "XMLHttpRequest")
            .send()
            .await?;

        let status = response.status();
        let landed_on_login = response.url().path() == PanelConfig::LOGIN_PAGE_PATH;
        let body = response.text().await?;

        let records = classify_response(status, landed_on_login, &body)?;
        tracing::debug!(count = records.len(), "Fetched records");
        Ok(records)
    }
}
