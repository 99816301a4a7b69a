//! Generic binary fallback for formats without a dedicated decoder.

/// Bytes kept in the eager preview.
const PREVIEW_LEN: usize = 64;

/// An undecoded file: size, a leading preview, and on-demand views.
#[derive(Debug, Clone)]
pub struct GenericBinary {
    data: Vec<u8>,
}

impl GenericBinary {
    pub fn new(data: Vec<u8>) -> Self {
        Self { data }
    }

    pub fn size(&self) -> usize {
        self.data.len()
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// The first 64 bytes (or fewer).
    pub fn preview(&self) -> &[u8] {
        &self.data[..self.data.len().min(PREVIEW_LEN)]
    }

    /// A classic 16-byte-per-row hex dump of up to `limit` bytes:
    /// offset, hex column, ASCII gutter.
    pub fn hex_dump(&self, limit: usize) -> String {
        let mut out = String::new();
        for (row, chunk) in self.data[..self.data.len().min(limit)].chunks(16).enumerate() {
            out.push_str(&format!("{:08X}  ", row * 16));
            for i in 0..16 {
                match chunk.get(i) {
                    Some(b) => out.push_str(&format!("{:02X} ", b)),
                    None => out.push_str("   "),
                }
            }
            out.push(' ');
            for &b in chunk {
                out.push(if (0x20..0x7F).contains(&b) {
                    char::from(b)
                } else {
                    '.'
                });
            }
            out.push('\n');
        }
        out
    }

    /// Runs of printable ASCII at least `min_len` long.
    pub fn ascii_segments(&self, min_len: usize) -> Vec<String> {
        let mut segments = Vec::new();
        let mut current = String::new();
        for &b in &self.data {
            if (0x20..0x7F).contains(&b) {
                current.push(char::from(b));
            } else {
                if current.len() >= min_len.max(1) {
                    segments.push(std::mem::take(&mut current));
                }
                current.clear();
            }
        }
        if current.len() >= min_len.max(1) {
            segments.push(current);
        }
        segments
    }
}
