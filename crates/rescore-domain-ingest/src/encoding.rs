use crate::document::{NotationDocument, Raw};
use crate::error::IngestError;
use rescore_ports::types::EncodingPolicy;

const UTF8_BOM: &[u8] = &[0xEF, 0xBB, 0xBF];

/// Decodes payload bytes into a raw notation document.
///
/// `Latin1` and `Utf8Lossy` never fail. A leading UTF-8 byte-order mark is
/// dropped under every policy.
pub fn decode(
    bytes: &[u8],
    policy: EncodingPolicy,
) -> Result<NotationDocument<Raw>, IngestError> {
    let bytes = bytes.strip_prefix(UTF8_BOM).unwrap_or(bytes);
    let text = match policy {
        EncodingPolicy::Latin1 => bytes.iter().copied().map(char::from).collect(),
        EncodingPolicy::Utf8Lossy => String::from_utf8_lossy(bytes).into_owned(),
        EncodingPolicy::Utf8Strict => std::str::from_utf8(bytes)
            .map_err(|e| IngestError::Decode(format!("invalid utf-8: {e}")))?
            .to_string(),
    };
    Ok(NotationDocument::new(text))
}

/// Turns text back into bytes under the policy it was decoded with.
///
/// Latin-1 text decoded by [`decode`] maps back onto the original bytes;
/// any character above U+00FF is written as UTF-8.
pub fn encode(text: &str, policy: EncodingPolicy) -> Vec<u8> {
    match policy {
        EncodingPolicy::Latin1 => {
            let mut bytes = Vec::with_capacity(text.len());
            for ch in text.chars() {
                match u8::try_from(ch) {
                    Ok(byte) => bytes.push(byte),
                    Err(_) => bytes.extend_from_slice(ch.encode_utf8(&mut [0; 4]).as_bytes()),
                }
            }
            bytes
        }
        EncodingPolicy::Utf8Lossy | EncodingPolicy::Utf8Strict => text.as_bytes().to_vec(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn latin1_maps_every_byte() {
        let bytes: Vec<u8> = (0u8..=255).collect();
        let doc = decode(&bytes, EncodingPolicy::Latin1).expect("total");
        assert_eq!(doc.as_str().chars().count(), 256);
        assert_eq!(doc.as_str().chars().last(), Some('\u{ff}'));
    }

    #[test]
    fn latin1_encode_restores_utf8_source_bytes() {
        let source = "<work-title>Café – Étude</work-title>".as_bytes();
        let doc = decode(source, EncodingPolicy::Latin1).expect("total");
        assert_eq!(encode(doc.as_str(), EncodingPolicy::Latin1), source);
    }

    #[test]
    fn latin1_encode_keeps_wide_chars_as_utf8() {
        assert_eq!(encode("a\u{266f}", EncodingPolicy::Latin1), "a\u{266f}".as_bytes());
        assert_eq!(encode("\u{e9}", EncodingPolicy::Utf8Lossy), vec![0xC3, 0xA9]);
    }

    #[test]
    fn bom_is_dropped() {
        let doc = decode(b"\xEF\xBB\xBF<a/>", EncodingPolicy::Latin1).expect("decode");
        assert_eq!(doc.as_str(), "<a/>");
    }
}
