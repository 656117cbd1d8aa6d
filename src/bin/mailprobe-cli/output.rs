use std::io::Write;

use anyhow::{Context, Result};
#[cfg(not(feature = "with-csv"))]
use anyhow::bail;
use mailprobe_lib::ValidationRecord;

use crate::args::{Cli, Format};

pub fn write_reports(records: &[ValidationRecord], cli: &Cli) -> Result<()> {
    let bytes = match cli.format {
        Format::Json => render_json(records, cli.is_bulk())?,
        Format::Ndjson => render_ndjson(records)?,
        Format::Human => render_human(records).into_bytes(),
        Format::Csv => render_csv(records)?,
    };
    match &cli.out {
        Some(path) => write_all_atomically(path, &bytes),
        None => {
            let mut stdout = std::io::stdout().lock();
            stdout.write_all(&bytes).context("write report to stdout")?;
            stdout.flush()?;
            Ok(())
        }
    }
}

/// A single address prints one object; bulk mode always prints an array.
fn render_json(records: &[ValidationRecord], bulk: bool) -> Result<Vec<u8>> {
    let mut s = match records {
        [record] if !bulk => serde_json::to_string_pretty(record)?,
        _ => serde_json::to_string_pretty(records)?,
    };
    s.push('\n');
    Ok(s.into_bytes())
}

fn render_ndjson(records: &[ValidationRecord]) -> Result<Vec<u8>> {
    let mut buf = Vec::new();
    for record in records {
        serde_json::to_writer(&mut buf, record)?;
        buf.push(b'\n');
    }
    Ok(buf)
}

fn render_human(records: &[ValidationRecord]) -> String {
    let mut out = String::new();
    for record in records {
        if record.overall_valid {
            out.push_str(&format!("[OK]    {}\n", record.address));
        } else {
            out.push_str(&format!(
                "[INVALID] {} :: {}\n",
                record.address,
                record.error_message().unwrap_or("not deliverable")
            ));
        }
        if !record.mx_records.is_empty() {
            let hosts: Vec<String> = record
                .mx_records
                .iter()
                .map(|mx| format!("{} {}", mx.priority, mx.exchange))
                .collect();
            out.push_str(&format!("        mx: {}\n", hosts.join(", ")));
        }
        if let Some(detail) = &record.smtp_detail {
            let mut line = String::from("        smtp:");
            if let Some(code) = detail.code {
                line.push_str(&format!(" {code}"));
            }
            if let Some(message) = &detail.message {
                line.push_str(&format!(" {message}"));
            }
            if let Some(server) = &detail.server {
                line.push_str(&format!(" (via {server})"));
            }
            if let Some(reason) = &detail.reason {
                line.push_str(&format!(" [{reason}]"));
            }
            out.push_str(&line);
            out.push('\n');
        }
    }
    out
}

#[cfg(feature = "with-csv")]
fn render_csv(records: &[ValidationRecord]) -> Result<Vec<u8>> {
    let mut wtr = csv::Writer::from_writer(Vec::new());
    wtr.write_record([
        "email", "valid", "syntax", "dns", "smtp", "mx_server", "smtp_code", "reason", "error",
    ])?;
    for record in records {
        wtr.write_record(csv_record(record))?;
    }
    wtr.into_inner().context("flush csv writer")
}

#[cfg(not(feature = "with-csv"))]
fn render_csv(_: &[ValidationRecord]) -> Result<Vec<u8>> {
    bail!("format=csv requires the 'with-csv' feature")
}

#[cfg(feature = "with-csv")]
fn csv_record(record: &ValidationRecord) -> Vec<String> {
    let detail = record.smtp_detail.as_ref();
    vec![
        record.address.clone(),
        record.overall_valid.to_string(),
        record.syntax_ok.to_string(),
        record.dns_ok.to_string(),
        record.smtp_ok.to_string(),
        detail
            .and_then(|d| d.server.clone())
            .unwrap_or_default(),
        detail
            .and_then(|d| d.code)
            .map(|c| c.to_string())
            .unwrap_or_default(),
        record.reason.map(|r| r.to_string()).unwrap_or_default(),
        record.error_message().unwrap_or_default().to_string(),
    ]
}

fn write_all_atomically(path: &str, bytes: &[u8]) -> Result<()> {
    let tmp = format!("{path}.tmp");
    {
        let mut f = std::fs::File::create(&tmp).with_context(|| format!("create {tmp}"))?;
        f.write_all(bytes)?;
        f.sync_all()?;
    }
    std::fs::rename(&tmp, path).with_context(|| format!("rename {tmp} -> {path}"))?;
    Ok(())
}
