// Copyright 2022-2025 The Vaultdav Authors.

// This program is free software; you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation; either version 2 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU General Public License for more details.

//! Parsing PROPFIND multistatus responses into raw stat records.
//!
//! Servers disagree on namespace prefixes (`D:`, `d:`, `lp1:`, none at
//! all), on whether hrefs are absolute paths or full URLs, and on date
//! formats; the extraction here is deliberately namespace-agnostic.

use lazy_static::lazy_static;
use regex::Regex;
use time::format_description::well_known::{Rfc2822, Rfc3339};
use time::macros::format_description;
use time::{OffsetDateTime, PrimitiveDateTime};

use crate::error::{Error, ErrorKind, Result};
use crate::kind::Kind;

/// One resource as reported by the server, before entity mapping.
#[derive(Clone, Debug, Eq, PartialEq)]
pub(crate) struct DavStat {
    /// Server-absolute decoded path, without a trailing slash.
    pub filename: String,
    pub kind: Kind,
    /// Raw `getlastmodified` value as sent by the server.
    pub last_modified: Option<String>,
    /// Byte length; 0 for collections.
    pub size: u64,
}

lazy_static! {
    static ref RESPONSE: Regex =
        Regex::new(r"(?is)<(?:[a-z0-9_-]+:)?response[^>]*>(.*?)</(?:[a-z0-9_-]+:)?response\s*>")
            .unwrap();
    static ref HREF: Regex =
        Regex::new(r"(?is)<(?:[a-z0-9_-]+:)?href[^>]*>([^<]*)<").unwrap();
    static ref COLLECTION: Regex =
        Regex::new(r"(?i)<(?:[a-z0-9_-]+:)?collection[\s/>]").unwrap();
    static ref CONTENT_LENGTH: Regex =
        Regex::new(r"(?is)<(?:[a-z0-9_-]+:)?getcontentlength[^>]*>([^<]*)<").unwrap();
    static ref LAST_MODIFIED: Regex =
        Regex::new(r"(?is)<(?:[a-z0-9_-]+:)?getlastmodified[^>]*>([^<]*)<").unwrap();
}

/// Parse a 207 multistatus body into stat records.
///
/// `query_path` is the endpoint-relative path that was listed and
/// `endpoint_path` the path component of the server address, which some
/// servers echo back in every href. When `exclude_self`, the record for the
/// queried collection itself is dropped: depth-1 and depth-infinity
/// listings report it alongside its children.
pub(crate) fn parse_multistatus(
    body: &str,
    endpoint_path: &str,
    query_path: &str,
    exclude_self: bool,
) -> Result<Vec<DavStat>> {
    let query_norm = trim_trailing_slash(query_path).to_owned();
    let mut stats = Vec::new();
    for cap in RESPONSE.captures_iter(body) {
        let block = &cap[1];
        let href = match HREF.captures(block) {
            Some(c) => c[1].trim().to_owned(),
            None => continue,
        };
        let decoded = decode_href(&href);
        let mut filename = trim_trailing_slash(strip_origin(&decoded)).to_owned();
        if !endpoint_path.is_empty() {
            if let Some(rest) = filename.strip_prefix(endpoint_path) {
                filename = rest.to_owned();
            }
        }
        if exclude_self && filename == query_norm {
            continue;
        }
        let kind = if COLLECTION.is_match(block) {
            Kind::Dir
        } else {
            Kind::File
        };
        let size = if kind.is_dir() {
            0
        } else {
            CONTENT_LENGTH
                .captures(block)
                .and_then(|c| c[1].trim().parse().ok())
                .unwrap_or(0)
        };
        let last_modified = LAST_MODIFIED
            .captures(block)
            .map(|c| xml_unescape(c[1].trim()));
        stats.push(DavStat {
            filename,
            kind,
            last_modified,
            size,
        });
    }
    Ok(stats)
}

fn trim_trailing_slash(path: &str) -> &str {
    if path.len() > 1 {
        path.trim_end_matches('/')
    } else {
        path
    }
}

/// Hrefs are XML-escaped and URL-encoded; undo both.
fn decode_href(href: &str) -> String {
    let unescaped = xml_unescape(href);
    match urlencoding::decode(&unescaped) {
        Ok(decoded) => decoded.into_owned(),
        Err(_) => unescaped,
    }
}

/// Reduce a full-URL href to its path component; path hrefs pass through.
fn strip_origin(href: &str) -> &str {
    if let Some(scheme_end) = href.find("://") {
        let after_scheme = &href[scheme_end + 3..];
        match after_scheme.find('/') {
            Some(path_start) => &after_scheme[path_start..],
            None => "/",
        }
    } else {
        href
    }
}

/// Undo the five named XML entity escapes.
fn xml_unescape(text: &str) -> String {
    if !text.contains('&') {
        return text.to_owned();
    }
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(pos) = rest.find('&') {
        out.push_str(&rest[..pos]);
        rest = &rest[pos..];
        let mut replaced = false;
        for (entity, ch) in [
            ("&amp;", '&'),
            ("&lt;", '<'),
            ("&gt;", '>'),
            ("&quot;", '"'),
            ("&apos;", '\''),
        ] {
            if let Some(after) = rest.strip_prefix(entity) {
                out.push(ch);
                rest = after;
                replaced = true;
                break;
            }
        }
        if !replaced {
            out.push('&');
            rest = &rest[1..];
        }
    }
    out.push_str(rest);
    out
}

/// Parse a `getlastmodified` date into epoch milliseconds.
///
/// RFC 1123 ("Tue, 05 Aug 2025 10:30:00 GMT") is what well-behaved servers
/// send, but RFC 2822 offsets, RFC 3339, and even asctime have been seen in
/// the wild.
pub(crate) fn parse_http_date(raw: &str) -> Result<i64> {
    let s = raw.trim();
    let rfc1123 = format_description!(
        "[weekday repr:short], [day] [month repr:short] [year] [hour]:[minute]:[second] GMT"
    );
    if let Ok(t) = PrimitiveDateTime::parse(s, &rfc1123) {
        return Ok(epoch_ms(t.assume_utc()));
    }
    let with_offset = s.replace(" GMT", " +0000").replace(" UTC", " +0000");
    if let Ok(t) = OffsetDateTime::parse(&with_offset, &Rfc2822) {
        return Ok(epoch_ms(t));
    }
    if let Ok(t) = OffsetDateTime::parse(s, &Rfc3339) {
        return Ok(epoch_ms(t));
    }
    let asctime = format_description!(
        "[weekday repr:short] [month repr:short] [day padding:space] [hour]:[minute]:[second] [year]"
    );
    if let Ok(t) = PrimitiveDateTime::parse(s, &asctime) {
        return Ok(epoch_ms(t.assume_utc()));
    }
    Err(Error {
        kind: ErrorKind::TimeParse,
        path: None,
        message: Some(format!("unparseable modification time {raw:?}")),
        source: None,
    })
}

fn epoch_ms(t: OffsetDateTime) -> i64 {
    (t.unix_timestamp_nanos() / 1_000_000) as i64
}

#[cfg(test)]
mod test {
    use pretty_assertions::assert_eq;

    use super::*;

    const SAMPLE: &str = r#"<?xml version="1.0"?>
<D:multistatus xmlns:D="DAV:">
  <D:response>
    <D:href>/dav/vault/</D:href>
    <D:propstat>
      <D:prop>
        <D:resourcetype><D:collection/></D:resourcetype>
        <D:getlastmodified>Tue, 05 Aug 2025 10:00:00 GMT</D:getlastmodified>
      </D:prop>
      <D:status>HTTP/1.1 200 OK</D:status>
    </D:propstat>
  </D:response>
  <D:response>
    <D:href>/dav/vault/sub%20dir/</D:href>
    <D:propstat>
      <D:prop>
        <D:resourcetype><D:collection/></D:resourcetype>
        <D:getlastmodified>Tue, 05 Aug 2025 10:05:00 GMT</D:getlastmodified>
      </D:prop>
      <D:status>HTTP/1.1 200 OK</D:status>
    </D:propstat>
  </D:response>
  <d:response xmlns:d="DAV:">
    <d:href>https://dav.example.com/dav/vault/a&amp;b.md</d:href>
    <d:propstat>
      <d:prop>
        <d:resourcetype/>
        <d:getcontentlength>17</d:getcontentlength>
        <d:getlastmodified>Tue, 05 Aug 2025 10:10:00 GMT</d:getlastmodified>
      </d:prop>
      <d:status>HTTP/1.1 200 OK</d:status>
    </d:propstat>
  </d:response>
</D:multistatus>"#;

    #[test]
    fn parses_mixed_prefixes_and_href_forms() {
        let stats = parse_multistatus(SAMPLE, "/dav", "/vault", true).unwrap();
        assert_eq!(stats.len(), 2);
        assert_eq!(stats[0].filename, "/vault/sub dir");
        assert!(stats[0].kind.is_dir());
        assert_eq!(stats[0].size, 0);
        assert_eq!(stats[1].filename, "/vault/a&b.md");
        assert!(stats[1].kind.is_file());
        assert_eq!(stats[1].size, 17);
        assert_eq!(
            stats[1].last_modified.as_deref(),
            Some("Tue, 05 Aug 2025 10:10:00 GMT")
        );
    }

    #[test]
    fn keeps_the_queried_collection_when_asked() {
        let stats = parse_multistatus(SAMPLE, "/dav", "/vault", false).unwrap();
        assert_eq!(stats.len(), 3);
        assert_eq!(stats[0].filename, "/vault");
        assert!(stats[0].kind.is_dir());
    }

    #[test]
    fn empty_endpoint_path_leaves_hrefs_alone() {
        let body = r#"<D:multistatus xmlns:D="DAV:"><D:response>
            <D:href>/vault/x.md</D:href>
            <D:propstat><D:prop><D:resourcetype/></D:prop></D:propstat>
        </D:response></D:multistatus>"#;
        let stats = parse_multistatus(body, "", "/vault", true).unwrap();
        assert_eq!(stats.len(), 1);
        assert_eq!(stats[0].filename, "/vault/x.md");
    }

    #[test]
    fn unescape_handles_all_named_entities() {
        assert_eq!(xml_unescape("a&amp;b &lt;c&gt; &quot;d&quot; &apos;e&apos;"),
                   "a&b <c> \"d\" 'e'");
        assert_eq!(xml_unescape("no entities"), "no entities");
        assert_eq!(xml_unescape("dangling & stays"), "dangling & stays");
    }

    #[test]
    fn http_dates() {
        // All four formats name the same instant.
        let expected = 1_754_388_000_000; // 2025-08-05 10:00:00 UTC
        assert_eq!(
            parse_http_date("Tue, 05 Aug 2025 10:00:00 GMT").unwrap(),
            expected
        );
        assert_eq!(
            parse_http_date("Tue, 05 Aug 2025 10:00:00 +0000").unwrap(),
            expected
        );
        assert_eq!(parse_http_date("2025-08-05T10:00:00Z").unwrap(), expected);
        assert_eq!(
            parse_http_date("Tue Aug  5 10:00:00 2025").unwrap(),
            expected
        );
    }

    #[test]
    fn unparseable_date_is_a_time_parse_error() {
        let err = parse_http_date("next Tuesday, probably").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::TimeParse);
    }
}
