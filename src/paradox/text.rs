//! Legacy text recovery.
//!
//! Paradox text is Windows-1252 in practice; the code-page identifier in
//! the table header almost always says so. Recovery tries Windows-1252
//! first, then ISO-8859-1, then ASCII, with a printable-byte fallback for
//! bytes nothing can claim.

use encoding_rs::WINDOWS_1252;

/// The encodings this decoder will attempt, in recovery order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TextEncoding {
    #[default]
    Windows1252,
    Latin1,
    Ascii,
}

impl TextEncoding {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Windows1252 => "Windows-1252",
            Self::Latin1 => "ISO-8859-1",
            Self::Ascii => "ASCII",
        }
    }
}

/// Decode a byte slice, reporting which encoding succeeded.
///
/// The preferred encoding is tried first, then the remaining ones in
/// Windows-1252 → ISO-8859-1 → ASCII order. The final fallback maps
/// printable ASCII bytes directly and everything else to U+FFFD.
pub fn recover(bytes: &[u8], preferred: TextEncoding) -> (String, TextEncoding) {
    const ORDER: [TextEncoding; 3] = [
        TextEncoding::Windows1252,
        TextEncoding::Latin1,
        TextEncoding::Ascii,
    ];
    let chain = std::iter::once(preferred).chain(ORDER.into_iter().filter(move |e| *e != preferred));
    for encoding in chain {
        if let Some(text) = try_decode(bytes, encoding) {
            return (text, encoding);
        }
    }
    let lossy = bytes
        .iter()
        .map(|&b| {
            if (0x20..0x7F).contains(&b) {
                char::from(b)
            } else {
                char::REPLACEMENT_CHARACTER
            }
        })
        .collect();
    (lossy, TextEncoding::Ascii)
}

/// Decode a byte slice with the default recovery chain.
pub fn decode_bytes(bytes: &[u8], preferred: TextEncoding) -> String {
    recover(bytes, preferred).0
}

/// Decode an Alpha field: strip leading/trailing NULs and trailing spaces,
/// replace interior NULs with spaces, then run the recovery chain.
pub fn decode_alpha(bytes: &[u8], preferred: TextEncoding) -> String {
    let start = bytes.iter().position(|&b| b != 0).unwrap_or(bytes.len());
    let end = bytes.iter().rposition(|&b| b != 0).map_or(start, |i| i + 1);
    let mut trimmed: Vec<u8> = bytes[start..end].to_vec();
    while trimmed.last() == Some(&b' ') {
        trimmed.pop();
    }
    for b in &mut trimmed {
        if *b == 0 {
            *b = b' ';
        }
    }
    decode_bytes(&trimmed, preferred)
}

/// Take the bytes of a NUL-terminated string starting at `*pos`, advancing
/// past the terminator. Scanning stops at the first 0x00 or the end of the
/// buffer.
pub fn take_c_string<'a>(data: &'a [u8], pos: &mut usize) -> &'a [u8] {
    let start = (*pos).min(data.len());
    let end = data[start..]
        .iter()
        .position(|&b| b == 0)
        .map_or(data.len(), |i| start + i);
    *pos = (end + 1).min(data.len());
    &data[start..end]
}

fn try_decode(bytes: &[u8], encoding: TextEncoding) -> Option<String> {
    match encoding {
        TextEncoding::Windows1252 => {
            let (text, _, had_errors) = WINDOWS_1252.decode(bytes);
            (!had_errors).then(|| text.into_owned())
        }
        // ISO-8859-1 maps bytes to the first 256 code points; refuse the
        // C0/C1 control ranges so genuinely binary data falls through.
        TextEncoding::Latin1 => bytes
            .iter()
            .all(|&b| b >= 0x20 && !(0x7F..0xA0).contains(&b))
            .then(|| bytes.iter().map(|&b| char::from(b)).collect()),
        TextEncoding::Ascii => bytes
            .is_ascii()
            .then(|| String::from_utf8_lossy(bytes).into_owned()),
    }
}
