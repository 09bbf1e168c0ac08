//! Seed list import
//!
//! Registers target sites from a text list, one `address,tenant` pair per
//! line. Blank lines and `#` comments are ignored. The tenant may be left
//! out; such sites are registered but skipped as malformed when claimed.

use crate::storage::Storage;
use crate::CorpusError;
use std::io::BufRead;

/// Counts from one seed import
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SeedReport {
    pub inserted: usize,
    pub already_present: usize,
}

/// One parsed seed line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeedEntry {
    pub address: String,
    pub tenant_id: Option<String>,
}

/// Parses a seed line; `Ok(None)` for blank lines and comments
pub fn parse_seed_line(line: &str, line_number: usize) -> Result<Option<SeedEntry>, CorpusError> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return Ok(None);
    }

    let mut fields = line.splitn(2, ',');
    let address = fields.next().unwrap_or_default().trim();
    let tenant = fields.next().map(str::trim).filter(|t| !t.is_empty());

    if address.is_empty() {
        return Err(CorpusError::Seed {
            line: line_number,
            message: "missing site address".to_string(),
        });
    }

    if address.contains(char::is_whitespace) {
        return Err(CorpusError::Seed {
            line: line_number,
            message: format!("address contains whitespace: {}", address),
        });
    }

    Ok(Some(SeedEntry {
        address: address.to_string(),
        tenant_id: tenant.map(str::to_string),
    }))
}

/// Registers every site in the list as `Pending`
///
/// Sites already registered are left untouched. Stops at the first invalid
/// line; sites from earlier lines stay registered.
pub fn import_seeds<R: BufRead>(
    storage: &mut dyn Storage,
    reader: R,
) -> Result<SeedReport, CorpusError> {
    let mut report = SeedReport::default();

    for (index, line) in reader.lines().enumerate() {
        let line = line?;
        let Some(entry) = parse_seed_line(&line, index + 1)? else {
            continue;
        };

        if entry.tenant_id.is_none() {
            tracing::warn!("Seed line {} has no tenant id: {}", index + 1, entry.address);
        }

        if storage.insert_site(&entry.address, entry.tenant_id.as_deref())? {
            report.inserted += 1;
        } else {
            report.already_present += 1;
        }
    }

    Ok(report)
}
