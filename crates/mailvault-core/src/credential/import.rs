//! Plain-text credential import.
//!
//! One credential per line. Fields are separated by `----`, or by `,` when the
//! line contains no `----`:
//!
//! ```text
//! address----password----client_id----refresh_token[----remark]
//! address,password,client_id,refresh_token[,remark]
//! ```

use super::model::NewCredential;

/// Field separator preferred by exports.
pub const FIELD_SEPARATOR: &str = "----";

/// Credentials parsed from an import file.
#[derive(Debug, Default)]
pub struct ParsedImport {
    /// Lines that parsed, in file order.
    pub credentials: Vec<NewCredential>,
    /// One message per rejected line, in file order.
    pub errors: Vec<String>,
}

/// Parse an import file. Blank lines are skipped.
#[must_use]
pub fn parse_import(content: &str) -> ParsedImport {
    let mut parsed = ParsedImport::default();

    for (index, line) in content.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        match parse_line(line) {
            Ok(credential) => parsed.credentials.push(credential),
            Err(reason) => parsed.errors.push(format!("line {}: {reason}: {line}", index + 1)),
        }
    }

    parsed
}

fn parse_line(line: &str) -> Result<NewCredential, &'static str> {
    let fields: Vec<&str> = if line.contains(FIELD_SEPARATOR) {
        line.split(FIELD_SEPARATOR).collect()
    } else if line.contains(',') {
        line.split(',').collect()
    } else {
        return Err("unrecognized format");
    };

    let [address, password, client_id, refresh_token, rest @ ..] = fields.as_slice() else {
        return Err("incomplete record");
    };

    let mut credential = NewCredential::new(*address, *password, *client_id, *refresh_token);
    if let Some(remark) = rest.first() {
        credential.remark = (*remark).to_string();
    }
    let credential = credential.trimmed();

    if credential.email_address.is_empty()
        || credential.password.is_empty()
        || credential.client_id.is_empty()
        || credential.refresh_token.is_empty()
    {
        return Err("required field is empty");
    }

    Ok(credential)
}
