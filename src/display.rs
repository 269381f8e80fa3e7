// SPDX-License-Identifier: MIT

//! Inspection rendering for manifests of unknown framing.
//!
//! The construction and signing paths are strict; this one is deliberately
//! not. A top-level decode failure (neither signed nor unsigned form
//! parses) is fatal, but once a manifest view exists, tag expansion keeps
//! going past malformed entries: each problem produces a per-entry warning
//! in the output and processing continues with the next tag.

use std::fmt::Write;

use crate::comid::Comid;
use crate::corim::Corim;
use crate::coswid::Coswid;
use crate::cots::Cots;
use crate::error::Error;
use crate::tags::{ArtifactKind, Tag};

/// Render a CoRIM of unknown framing into `out`, as a `Meta:` section (for
/// signed input), a `Corim:` section, and, when `show_tags` is set, a
/// `Tags:` section expanding each embedded artifact.
pub fn display(buf: &[u8], show_tags: bool, out: &mut dyn Write) -> crate::Result<()> {
    match Corim::from_bytes(buf).map_err(Error::from)? {
        Corim::Signed(signed) => {
            writeln!(out, "Meta:").map_err(fmt_error)?;
            writeln!(out, "{}", to_pretty_json(&signed.meta)?).map_err(fmt_error)?;
            writeln!(out, "Corim:").map_err(fmt_error)?;
            writeln!(out, "{}", to_pretty_json(&signed.unsigned_corim)?).map_err(fmt_error)?;
            if show_tags {
                writeln!(out, "Tags:").map_err(fmt_error)?;
                expand_tags(&signed.unsigned_corim.tags, out)?;
            }
        }
        Corim::Unsigned(unsigned) => {
            writeln!(out, "Corim:").map_err(fmt_error)?;
            writeln!(out, "{}", to_pretty_json(&unsigned)?).map_err(fmt_error)?;
            if show_tags {
                writeln!(out, "Tags:").map_err(fmt_error)?;
                expand_tags(&unsigned.tags, out)?;
            }
        }
    }
    Ok(())
}

/// Convenience wrapper over [`display`] returning the rendered text.
pub fn display_to_string(buf: &[u8], show_tags: bool) -> crate::Result<String> {
    let mut out = String::new();
    display(buf, show_tags, &mut out)?;
    Ok(out)
}

/// Expand embedded tags, continuing past malformed entries.
fn expand_tags(tags: &[Tag], out: &mut dyn Write) -> crate::Result<()> {
    for (index, tag) in tags.iter().enumerate() {
        let Some((identifier, payload)) = tag.split() else {
            log::warn!("tag at index {index} is shorter than the minimum entry");
            writeln!(out, ">> skipping malformed tag at index {index}").map_err(fmt_error)?;
            continue;
        };

        let header = format!(">> [ {index} ]");
        let kind = ArtifactKind::classify(identifier);
        let rendered = match kind {
            ArtifactKind::Comid => Comid::from_cbor(payload)
                .map(|comid| comid.to_json())
                .map_err(|e| e.to_string()),
            ArtifactKind::Coswid => Coswid::from_cbor(payload)
                .map(|coswid| coswid.to_json())
                .map_err(|e| e.to_string()),
            ArtifactKind::Cots => Cots::from_cbor(payload)
                .map(|cots| cots.to_json())
                .map_err(|e| e.to_string()),
            ArtifactKind::Unknown => {
                log::warn!("tag at index {index} has unregistered identifier {identifier}");
                writeln!(out, ">> unmatched CBOR tag: {identifier}").map_err(fmt_error)?;
                continue;
            }
        };

        match rendered {
            Ok(json) => {
                writeln!(out, "{header}").map_err(fmt_error)?;
                writeln!(out, "{}", pretty(&json)?).map_err(fmt_error)?;
            }
            Err(cause) => {
                log::warn!("skipping malformed {kind} tag at index {index}: {cause}");
                writeln!(
                    out,
                    ">> skipping malformed {kind} tag at index {index}: {cause}"
                )
                .map_err(fmt_error)?;
            }
        }
    }
    Ok(())
}

fn to_pretty_json<T: serde::Serialize>(value: &T) -> crate::Result<String> {
    serde_json::to_string_pretty(value).map_err(|e| Error::Custom(e.to_string()))
}

fn pretty(value: &serde_json::Value) -> crate::Result<String> {
    serde_json::to_string_pretty(value).map_err(|e| Error::Custom(e.to_string()))
}

fn fmt_error(_: std::fmt::Error) -> Error {
    Error::Custom("error writing rendered output".to_owned())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::corim::UnsignedCorim;
    use crate::cose::SignedCorim;
    use crate::keys::{EcCurve, SigningKey};
    use crate::tags::TagIdentifier;
    use crate::test::{comid_fixture, corim_fixture, generated_jwk, meta_fixture};

    #[test]
    fn unsigned_view_renders_without_meta() {
        let corim = corim_fixture();
        let buf = corim.to_cbor().unwrap();

        let out = display_to_string(&buf, false).unwrap();
        assert!(out.starts_with("Corim:"));
        assert!(!out.contains("Meta:"));
        assert!(out.contains("corim-id"));
    }

    #[test]
    fn signed_view_renders_meta_and_manifest() {
        let (private_jwk, _) = generated_jwk(EcCurve::P256);
        let key = SigningKey::from_jwk(private_jwk.as_bytes()).unwrap();
        let mut signed = SignedCorim::new(meta_fixture(), corim_fixture());
        let buf = signed.sign(&key).unwrap();

        let out = display_to_string(&buf, true).unwrap();
        assert!(out.starts_with("Meta:"));
        assert!(out.contains("Corim:"));
        assert!(out.contains("Tags:"));
        assert!(out.contains(">> [ 0 ]"));
    }

    #[test]
    fn truncated_tag_is_skipped_and_the_call_succeeds() {
        let mut corim = corim_fixture();
        corim.tags.push(Tag::from_bytes(vec![0xd9, 0x01]));
        let buf = corim.to_cbor().unwrap();

        let out = display_to_string(&buf, true).unwrap();
        assert!(out.contains(">> [ 0 ]"));
        assert!(out.contains(">> skipping malformed tag at index 1"));
    }

    #[test]
    fn unmatched_identifier_does_not_stop_expansion() {
        let mut corim = corim_fixture();
        let unknown = TagIdentifier([0xd9, 0x01, 0xfe]);
        corim.tags.insert(0, Tag::new(unknown, &[0xa0]));
        let buf = corim.to_cbor().unwrap();

        let out = display_to_string(&buf, true).unwrap();
        assert!(out.contains(">> unmatched CBOR tag: d901fe"));
        // the well-formed CoMID after it still renders
        assert!(out.contains(">> [ 1 ]"));
    }

    #[test]
    fn undecodable_payload_warns_with_index_and_kind() {
        let mut corim = corim_fixture();
        // identifier claims CoMID, payload is a bare int
        corim
            .tags
            .push(Tag::new(crate::tags::COMID_TAG, &[0x01]));
        let buf = corim.to_cbor().unwrap();

        let out = display_to_string(&buf, true).unwrap();
        assert!(out.contains(">> skipping malformed CoMID tag at index 1:"));
    }

    #[test]
    fn trust_anchor_stores_expand_like_any_other_kind() {
        let mut corim = corim_fixture();
        corim
            .add_cots(&crate::cots::Cots::from_cbor(&crate::test::cbor(&crate::test::cots_map())).unwrap())
            .unwrap();
        let buf = corim.to_cbor().unwrap();

        let out = display_to_string(&buf, true).unwrap();
        assert!(out.contains(">> [ 0 ]"));
        assert!(out.contains(">> [ 1 ]"));
        assert!(!out.contains("skipping"));
    }

    #[test]
    fn top_level_failure_is_fatal() {
        let err = display_to_string(b"hello!", false).unwrap_err();
        assert_eq!(
            err.to_string(),
            "neither a signed nor an unsigned CoRIM: \
             expected map (CBOR Major Type 5), found Major Type 3"
        );
    }

    #[test]
    fn tags_are_omitted_unless_requested() {
        let mut corim = UnsignedCorim::from_template(crate::test::TEMPLATE_JSON.as_bytes()).unwrap();
        corim.add_comid(&comid_fixture()).unwrap();
        let buf = corim.to_cbor().unwrap();

        let out = display_to_string(&buf, false).unwrap();
        assert!(!out.contains("Tags:"));
    }
}
