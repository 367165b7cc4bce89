//! Inline image payloads: recognising `data:image/...;base64,` sources.
//!
//! Extraction is a read-only scan. The base64 text is only decoded when a
//! task asks for the bytes, which happens on a worker thread.

use std::borrow::Cow;

use base64::alphabet;
use base64::engine::general_purpose::STANDARD;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};
use base64::Engine;
use nom::bytes::complete::{tag_no_case, take_while1};
use nom::character::complete::char;
use nom::combinator::rest;
use nom::IResult;

use crate::document::{Document, NodeId};
use crate::encode::JPEG_SUBTYPE;

/// Accepts unpadded input, which some exporters emit.
const LENIENT_BASE64: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new()
        .with_decode_padding_mode(DecodePaddingMode::Indifferent)
        .with_decode_allow_trailing_bits(true),
);

/// An image embedded directly in a `src` attribute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InlinePayload {
    subtype: String,
    data: String,
}

fn is_subtype_char(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '+'
}

/// `data:image/<subtype>;base64,<data>` with the data segment non-empty.
fn data_url(input: &str) -> IResult<&str, (&str, &str)> {
    let (input, _) = tag_no_case("data:image/")(input)?;
    let (input, subtype) = take_while1(is_subtype_char)(input)?;
    let (input, _) = char(';')(input)?;
    let (input, _) = tag_no_case("base64")(input)?;
    let (input, _) = char(',')(input)?;
    let (input, data) = rest(input)?;
    if data.is_empty() {
        return Err(nom::Err::Error(nom::error::Error::new(
            input,
            nom::error::ErrorKind::NonEmpty,
        )));
    }
    Ok((input, (subtype, data)))
}

impl InlinePayload {
    /// Parse a `src` value. Returns `None` for external references and for
    /// inline sources that do not have the expected shape.
    pub fn parse(src: &str) -> Option<Self> {
        let (_, (subtype, data)) = data_url(src).ok()?;
        Some(Self {
            subtype: subtype.to_string(),
            data: data.to_string(),
        })
    }

    /// Wrap freshly encoded JPEG bytes.
    pub fn from_jpeg(bytes: &[u8]) -> Self {
        Self {
            subtype: JPEG_SUBTYPE.to_string(),
            data: STANDARD.encode(bytes),
        }
    }

    /// Render as a `src` attribute value.
    pub fn to_source(&self) -> String {
        format!("data:image/{};base64,{}", self.subtype, self.data)
    }

    /// Declared media subtype, e.g. `png` or `svg+xml`.
    pub fn subtype(&self) -> &str {
        &self.subtype
    }

    /// The base64 text after the comma.
    pub fn data(&self) -> &str {
        &self.data
    }

    /// Size of the payload as it sits in the document: the length of the
    /// base64 text, not of the decoded bytes.
    pub fn encoded_len(&self) -> u64 {
        self.data.len() as u64
    }

    /// True when the declared subtype is already the re-encode target.
    pub fn is_jpeg(&self) -> bool {
        self.subtype.eq_ignore_ascii_case(JPEG_SUBTYPE) || self.subtype.eq_ignore_ascii_case("jpg")
    }

    /// Decode the base64 text. ASCII whitespace (line-wrapped payloads) is
    /// ignored and padding is optional.
    pub fn decode(&self) -> Result<Vec<u8>, base64::DecodeError> {
        let data: Cow<'_, str> = if self.data.bytes().any(|b| b.is_ascii_whitespace()) {
            Cow::Owned(
                self.data
                    .chars()
                    .filter(|c| !c.is_ascii_whitespace())
                    .collect(),
            )
        } else {
            Cow::Borrowed(self.data.as_str())
        };
        LENIENT_BASE64.decode(data.as_bytes())
    }
}

/// Collect every image node whose `src` is an inline payload, in document
/// order. Image nodes with external or missing sources are left out.
pub fn extract(document: &Document) -> Vec<(NodeId, InlinePayload)> {
    document
        .image_nodes()
        .filter_map(|(id, img)| {
            let payload = InlinePayload::parse(img.src()?)?;
            Some((id, payload))
        })
        .collect()
}
