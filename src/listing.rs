//! Decoder for the remote `/api/ls` response body.
//!
//! The endpoint does not return a JSON array. The body is a sequence of
//! records, each a complete JSON object introduced by the literal marker
//! `{"path` and optionally followed by binary transport padding that starts
//! with a NUL byte:
//!
//! ```text
//! body    := prefix record*
//! record  := MARKER json-tail [ NUL padding ]
//! MARKER  := '{"path'
//! ```
//!
//! The prefix (anything before the first marker) is discarded. Each record
//! is cut at its first NUL and parsed as
//! `{"path": string, "attrs": {"isDirectory": bool, "size": integer}}`.
//! A record that fails to parse fails the whole body; entries are never
//! dropped silently.

use serde::Deserialize;

use crate::error::{Error, Result};
use crate::types::DirectoryEntry;

/// Literal that opens every record
pub const RECORD_MARKER: &[u8] = b"{\"path";

/// Terminates the JSON part of a record
const PADDING_SENTINEL: u8 = 0;

#[derive(Deserialize)]
struct RawRecord {
    path: String,
    attrs: RawAttrs,
}

#[derive(Deserialize)]
struct RawAttrs {
    #[serde(rename = "isDirectory")]
    is_directory: bool,
    #[serde(default)]
    size: u64,
}

/// Decode one listing body into its entries, in body order.
///
/// A body without any marker is an empty directory and decodes to an empty
/// vector.
pub fn decode(body: &[u8]) -> Result<Vec<DirectoryEntry>> {
    records(body)
        .enumerate()
        .map(|(index, record)| decode_record(index, record))
        .collect()
}

/// Split a body into its JSON records: marker-to-marker slices cut at the first NUL.
pub fn records(body: &[u8]) -> impl Iterator<Item = &[u8]> {
    let starts = marker_positions(body);
    let ends = starts
        .iter()
        .skip(1)
        .copied()
        .chain(std::iter::once(body.len()))
        .collect::<Vec<_>>();

    starts.into_iter().zip(ends).map(move |(start, end)| {
        let record = &body[start..end];
        match record.iter().position(|&b| b == PADDING_SENTINEL) {
            Some(nul) => &record[..nul],
            None => record,
        }
    })
}

fn decode_record(index: usize, record: &[u8]) -> Result<DirectoryEntry> {
    let raw: RawRecord =
        serde_json::from_slice(record).map_err(|e| Error::MalformedListing {
            index,
            reason: e.to_string(),
        })?;

    Ok(DirectoryEntry {
        path: raw.path,
        is_directory: raw.attrs.is_directory,
        size: raw.attrs.size,
    })
}

fn marker_positions(body: &[u8]) -> Vec<usize> {
    let mut positions = Vec::new();
    let mut from = 0;
    while let Some(offset) = find(&body[from..], RECORD_MARKER) {
        positions.push(from + offset);
        from += offset + RECORD_MARKER.len();
    }
    positions
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    if needle.is_empty() || haystack.len() < needle.len() {
        return None;
    }
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    fn record(path: &str, is_directory: bool, size: u64) -> Vec<u8> {
        format!(r#"{{"path":"{path}","attrs":{{"isDirectory":{is_directory},"size":{size}}}}}"#)
            .into_bytes()
    }

    /// Build a body the way the service frames it: each record followed by NUL + junk.
    fn framed(records: &[Vec<u8>]) -> Vec<u8> {
        let mut body = b"\x00\x01\x02".to_vec();
        for r in records {
            body.extend_from_slice(r);
            body.extend_from_slice(&[0x00, 0xff, 0xfe, 0x13, 0x37]);
        }
        body
    }

    #[test]
    fn decodes_records_in_body_order() {
        let body = framed(&[
            record("docs", true, 0),
            record("readme.txt", false, 42),
            record("archive", true, 4096),
        ]);

        let entries = decode(&body).unwrap();

        assert_eq!(entries.len(), 3);
        assert_eq!(entries[0].path, "docs");
        assert!(entries[0].is_directory);
        assert_eq!(entries[1].path, "readme.txt");
        assert!(!entries[1].is_directory);
        assert_eq!(entries[1].size, 42);
        assert_eq!(entries[2].path, "archive");
    }

    #[test]
    fn body_without_marker_is_empty_directory() {
        assert!(decode(b"").unwrap().is_empty());
        assert!(decode(b"\x00\x00garbage-but-no-marker").unwrap().is_empty());
    }

    #[test]
    fn last_record_without_padding_still_parses() {
        let mut body = framed(&[record("a.bin", false, 1)]);
        body.extend_from_slice(&record("b.bin", false, 2));

        let entries = decode(&body).unwrap();

        assert_eq!(
            entries.iter().map(|e| e.path.as_str()).collect::<Vec<_>>(),
            vec!["a.bin", "b.bin"]
        );
    }

    #[test]
    fn invalid_record_fails_whole_decode() {
        let body = framed(&[
            record("ok-1", false, 1),
            b"{\"path\":\"broken\",\"attrs\":{\"isDirectory\":".to_vec(),
            record("ok-2", false, 1),
        ]);

        match decode(&body) {
            Err(Error::MalformedListing { index, .. }) => assert_eq!(index, 1),
            other => panic!("expected MalformedListing, got {other:?}"),
        }
    }

    #[test]
    fn missing_attrs_is_malformed() {
        let body = framed(&[br#"{"path":"x"}"#.to_vec()]);
        assert!(matches!(
            decode(&body),
            Err(Error::MalformedListing { index: 0, .. })
        ));
    }

    #[test]
    fn missing_size_defaults_to_zero() {
        let body = framed(&[br#"{"path":"dir","attrs":{"isDirectory":true}}"#.to_vec()]);
        let entries = decode(&body).unwrap();
        assert_eq!(entries[0].size, 0);
    }

    #[test]
    fn unknown_fields_are_ignored() {
        let body = framed(&[
            br#"{"path":"f.txt","name":"f.txt","attrs":{"isDirectory":false,"size":9,"mtime":1}}"#
                .to_vec(),
        ]);
        let entries = decode(&body).unwrap();
        assert_eq!(entries[0].size, 9);
    }

    #[test]
    fn non_utf8_padding_is_tolerated() {
        let mut body = record("x", false, 3);
        body.extend_from_slice(&[0x00, 0xc3, 0x28, 0xa0, 0xa1]);
        let entries = decode(&body).unwrap();
        assert_eq!(entries.len(), 1);
    }

    #[test]
    fn records_are_cut_at_first_nul() {
        let body = framed(&[record("p", false, 1)]);
        let parts: Vec<&[u8]> = records(&body).collect();
        assert_eq!(parts.len(), 1);
        assert!(!parts[0].contains(&0));
        assert!(parts[0].starts_with(RECORD_MARKER));
    }
}
