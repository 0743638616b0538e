//! Credential export rendering.

use std::cmp::Ordering;
use std::fmt::Write as _;

use serde::{Deserialize, Serialize};

use super::import::FIELD_SEPARATOR;
use super::model::{Credential, CredentialId};

/// Output format of an export.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    /// One `----` separated record per line, readable by the importer.
    #[default]
    Txt,
    /// Comma-separated values with a header row.
    Csv,
}

/// Which credentials to export.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportRange {
    /// Every credential of the account.
    #[default]
    All,
    /// Only the requested ids.
    Selected,
}

/// Field to sort exported records by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortField {
    /// Mailbox address.
    EmailAddress,
    /// Password.
    Password,
    /// Refresh token.
    RefreshToken,
    /// Client id.
    ClientId,
    /// Creation time.
    #[default]
    CreatedAt,
}

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    /// Ascending.
    #[default]
    Asc,
    /// Descending.
    Desc,
}

/// An export request.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ExportRequest {
    /// Which credentials.
    #[serde(default)]
    pub range: ExportRange,
    /// Ids for [`ExportRange::Selected`].
    #[serde(default)]
    pub ids: Vec<CredentialId>,
    /// Output format.
    #[serde(default)]
    pub format: ExportFormat,
    /// Sort field.
    #[serde(default)]
    pub sort_field: SortField,
    /// Sort direction.
    #[serde(default)]
    pub sort_direction: SortDirection,
}

/// A rendered export.
#[derive(Debug, Clone, Serialize)]
pub struct ExportOutput {
    /// File content.
    pub content: String,
    /// Number of records.
    pub count: usize,
    /// Format of `content`.
    pub format: ExportFormat,
}

/// Sort credentials in place.
pub fn sort_credentials(credentials: &mut [Credential], field: SortField, direction: SortDirection) {
    credentials.sort_by(|a, b| {
        let ordering = compare(a, b, field).then_with(|| a.id.cmp(&b.id));
        match direction {
            SortDirection::Asc => ordering,
            SortDirection::Desc => ordering.reverse(),
        }
    });
}

fn compare(a: &Credential, b: &Credential, field: SortField) -> Ordering {
    match field {
        SortField::EmailAddress => a.email_address.cmp(&b.email_address),
        SortField::Password => a.password.cmp(&b.password),
        SortField::RefreshToken => a.refresh_token.cmp(&b.refresh_token),
        SortField::ClientId => a.client_id.cmp(&b.client_id),
        SortField::CreatedAt => a.created_at.cmp(&b.created_at),
    }
}

/// Render credentials in `format`. Secrets are included.
#[must_use]
pub fn render(credentials: &[Credential], format: ExportFormat) -> String {
    let mut out = String::new();
    if credentials.is_empty() {
        return out;
    }

    match format {
        ExportFormat::Txt => {
            for c in credentials {
                let fields: [&str; 4] = [
                    c.email_address.as_str(),
                    &c.password,
                    &c.client_id,
                    &c.refresh_token,
                ];
                out.push_str(&fields.join(FIELD_SEPARATOR));
                if !c.remark.is_empty() {
                    out.push_str(FIELD_SEPARATOR);
                    out.push_str(&c.remark);
                }
                out.push('\n');
            }
        }
        ExportFormat::Csv => {
            out.push_str("email_address,password,client_id,refresh_token,remark,created_at\n");
            for c in credentials {
                let _ = writeln!(
                    out,
                    "{},{},{},{},{},{}",
                    csv_field(&c.email_address),
                    csv_field(&c.password),
                    csv_field(&c.client_id),
                    csv_field(&c.refresh_token),
                    csv_field(&c.remark),
                    csv_field(&c.created_at.format("%Y-%m-%d %H:%M:%S").to_string()),
                );
            }
        }
    }

    out
}

fn csv_field(value: &str) -> String {
    format!("\"{}\"", value.replace('"', "\"\""))
}
