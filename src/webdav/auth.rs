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

//! Request authentication: preemptive Basic and RFC 2617 Digest.

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use lazy_static::lazy_static;
use md5::{Digest as _, Md5};
use regex::Regex;

/// The value for a preemptive `authorization` header.
pub(crate) fn basic_header(username: &str, password: &str) -> String {
    format!(
        "Basic {}",
        STANDARD.encode(format!("{username}:{password}"))
    )
}

lazy_static! {
    // k="quoted value" or k=token, comma separated.
    static ref CHALLENGE_PARAM: Regex =
        Regex::new(r#"([a-zA-Z]+)=(?:"([^"]*)"|([^",\s]+))"#).unwrap();
}

/// A parsed `www-authenticate: Digest` challenge.
///
/// Only MD5 with `qop=auth` (or no qop at all) is supported; that covers
/// every WebDAV server this adapter has been pointed at.
#[derive(Clone, Debug, Eq, PartialEq)]
pub(crate) struct DigestChallenge {
    pub realm: String,
    pub nonce: String,
    pub qop: Option<String>,
    pub opaque: Option<String>,
}

impl DigestChallenge {
    /// Parse a `www-authenticate` header value; `None` unless it is a
    /// Digest challenge this module can answer.
    pub fn parse(header: &str) -> Option<DigestChallenge> {
        let header = header.trim();
        if header.len() < 7 || !header[..7].eq_ignore_ascii_case("digest ") {
            return None;
        }
        let mut realm = None;
        let mut nonce = None;
        let mut qop = None;
        let mut opaque = None;
        let mut algorithm = None;
        for cap in CHALLENGE_PARAM.captures_iter(&header[7..]) {
            let value = cap
                .get(2)
                .or_else(|| cap.get(3))
                .map(|m| m.as_str().to_owned())
                .unwrap_or_default();
            match cap[1].to_ascii_lowercase().as_str() {
                "realm" => realm = Some(value),
                "nonce" => nonce = Some(value),
                "qop" => qop = Some(value),
                "opaque" => opaque = Some(value),
                "algorithm" => algorithm = Some(value),
                _ => (),
            }
        }
        if let Some(algorithm) = algorithm {
            if !algorithm.eq_ignore_ascii_case("md5") {
                return None;
            }
        }
        // The server may offer several qop values; we only ever use "auth".
        let qop = match qop {
            None => None,
            Some(offered) if offered.split(',').any(|q| q.trim() == "auth") => {
                Some("auth".to_owned())
            }
            Some(_) => return None,
        };
        Some(DigestChallenge {
            realm: realm?,
            nonce: nonce?,
            qop,
            opaque,
        })
    }

    /// Compute the `authorization` header for one request.
    ///
    /// `uri` is the request path as it appears on the wire; `nc` counts how
    /// many requests have used this nonce.
    pub fn authorization(
        &self,
        username: &str,
        password: &str,
        method: &str,
        uri: &str,
        cnonce: &str,
        nc: u32,
    ) -> String {
        let ha1 = md5_hex(&format!("{username}:{}:{password}", self.realm));
        let ha2 = md5_hex(&format!("{method}:{uri}"));
        let nc = format!("{nc:08x}");
        let mut header;
        match self.qop.as_deref() {
            Some(qop) => {
                let response = md5_hex(&format!(
                    "{ha1}:{}:{nc}:{cnonce}:{qop}:{ha2}",
                    self.nonce
                ));
                header = format!(
                    "Digest username=\"{username}\", realm=\"{}\", nonce=\"{}\", \
                     uri=\"{uri}\", qop={qop}, nc={nc}, cnonce=\"{cnonce}\", \
                     response=\"{response}\"",
                    self.realm, self.nonce
                );
            }
            None => {
                let response = md5_hex(&format!("{ha1}:{}:{ha2}", self.nonce));
                header = format!(
                    "Digest username=\"{username}\", realm=\"{}\", nonce=\"{}\", \
                     uri=\"{uri}\", response=\"{response}\"",
                    self.realm, self.nonce
                );
            }
        }
        if let Some(opaque) = &self.opaque {
            header.push_str(&format!(", opaque=\"{opaque}\""));
        }
        header
    }
}

fn md5_hex(input: &str) -> String {
    hex::encode(Md5::digest(input.as_bytes()))
}

#[cfg(test)]
mod test {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn basic_header_value() {
        // "user:pass" in base64.
        assert_eq!(basic_header("user", "pass"), "Basic dXNlcjpwYXNz");
    }

    #[test]
    fn parse_quoted_challenge() {
        let header = concat!(
            "Digest realm=\"testrealm@host.com\", qop=\"auth,auth-int\", ",
            "nonce=\"dcd98b7102dd2f0e8b11d0f600bfb0c093\", ",
            "opaque=\"5ccc069c403ebaf9f0171e9517f40e41\""
        );
        let challenge = DigestChallenge::parse(header).unwrap();
        assert_eq!(challenge.realm, "testrealm@host.com");
        assert_eq!(challenge.nonce, "dcd98b7102dd2f0e8b11d0f600bfb0c093");
        assert_eq!(challenge.qop.as_deref(), Some("auth"));
        assert_eq!(
            challenge.opaque.as_deref(),
            Some("5ccc069c403ebaf9f0171e9517f40e41")
        );
    }

    #[test]
    fn non_digest_challenges_are_ignored() {
        assert_eq!(DigestChallenge::parse("Basic realm=\"x\""), None);
        assert_eq!(DigestChallenge::parse(""), None);
        // Unsupported algorithm.
        assert_eq!(
            DigestChallenge::parse(
                "Digest realm=\"r\", nonce=\"n\", algorithm=SHA-256"
            ),
            None
        );
    }

    #[test]
    fn rfc2617_worked_example() {
        // The example from RFC 2617 section 3.5.
        let challenge = DigestChallenge {
            realm: "testrealm@host.com".to_owned(),
            nonce: "dcd98b7102dd2f0e8b11d0f600bfb0c093".to_owned(),
            qop: Some("auth".to_owned()),
            opaque: Some("5ccc069c403ebaf9f0171e9517f40e41".to_owned()),
        };
        let header = challenge.authorization(
            "Mufasa",
            "Circle Of Life",
            "GET",
            "/dir/index.html",
            "0a4f113b",
            1,
        );
        assert!(
            header.contains("response=\"6629fae49393a05397450978507c4ef1\""),
            "{header}"
        );
        assert!(header.contains("nc=00000001"));
        assert!(header.contains("opaque=\"5ccc069c403ebaf9f0171e9517f40e41\""));
    }
}
