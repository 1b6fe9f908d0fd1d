use crate::error::{Error, Result};

/// Cursor over the big-endian class-file stream.
///
/// Reads consume the front of the remaining slice; the cursor also tracks how
/// far into the original payload it has advanced, since attribute payload
/// offsets are reported back to callers.
pub(crate) struct ClassBytes<'a> {
    rest: &'a [u8],
    consumed: usize,
}

impl<'a> ClassBytes<'a> {
    pub(crate) fn of(bytes: &'a [u8]) -> Self {
        Self {
            rest: bytes,
            consumed: 0,
        }
    }

    /// Offset of the next unread byte within the original payload.
    pub(crate) fn offset(&self) -> usize {
        self.consumed
    }

    pub(crate) fn take(&mut self, len: usize) -> Result<&'a [u8]> {
        if len > self.rest.len() {
            return Err(Error::Truncated);
        }
        let (head, tail) = self.rest.split_at(len);
        self.rest = tail;
        self.consumed += len;
        Ok(head)
    }

    pub(crate) fn skip(&mut self, len: usize) -> Result<()> {
        self.take(len).map(drop)
    }

    pub(crate) fn u1(&mut self) -> Result<u8> {
        Ok(self.take(1)?[0])
    }

    pub(crate) fn u2(&mut self) -> Result<u16> {
        let b = self.take(2)?;
        Ok(u16::from(b[0]) << 8 | u16::from(b[1]))
    }

    pub(crate) fn u4(&mut self) -> Result<u32> {
        let b = self.take(4)?;
        Ok(u32::from(b[0]) << 24
            | u32::from(b[1]) << 16
            | u32::from(b[2]) << 8
            | u32::from(b[3]))
    }

    /// A `*_count` prefix, widened for use as a loop bound.
    pub(crate) fn count(&mut self) -> Result<usize> {
        self.u2().map(usize::from)
    }
}

/// A constant-pool entry. Only the entries the scanner consults are
/// materialized; everything else is skipped over.
#[derive(Debug, Clone)]
enum Entry {
    Utf8(String),
    Class { name_index: u16 },
    Skipped,
}

/// A minimal constant pool: UTF-8 and class entries only.
#[derive(Debug, Clone)]
pub(crate) struct ConstantPool {
    entries: Vec<Entry>,
}

impl ConstantPool {
    pub(crate) fn parse(scan: &mut ClassBytes<'_>) -> Result<Self> {
        let count = scan.count()?;
        if count == 0 {
            return Err(Error::Other("constant_pool_count must be >= 1"));
        }

        let mut entries = vec![Entry::Skipped; count];
        let mut i = 1usize;
        while i < count {
            let tag = scan.u1()?;
            let mut slots = 1;
            entries[i] = match tag {
                // Utf8
                1 => {
                    let len = scan.count()?;
                    Entry::Utf8(utf8_constant(scan.take(len)?)?)
                }
                // Class
                7 => Entry::Class {
                    name_index: scan.u2()?,
                },
                // Integer, Float
                3 | 4 => {
                    scan.skip(4)?;
                    Entry::Skipped
                }
                // Long, Double: take up two slots.
                5 | 6 => {
                    scan.skip(8)?;
                    slots = 2;
                    Entry::Skipped
                }
                // String, MethodType, Module, Package
                8 | 16 | 19 | 20 => {
                    scan.skip(2)?;
                    Entry::Skipped
                }
                // Fieldref, Methodref, InterfaceMethodref, NameAndType,
                // Dynamic, InvokeDynamic
                9 | 10 | 11 | 12 | 17 | 18 => {
                    scan.skip(4)?;
                    Entry::Skipped
                }
                // MethodHandle
                15 => {
                    scan.skip(3)?;
                    Entry::Skipped
                }
                other => return Err(Error::InvalidConstantPoolTag(other)),
            };
            if slots == 2 && i + 1 >= count {
                return Err(Error::Other("malformed constant pool"));
            }
            i += slots;
        }

        Ok(Self { entries })
    }

    fn get(&self, index: u16) -> Result<&Entry> {
        let idx = index as usize;
        if idx == 0 || idx >= self.entries.len() {
            return Err(Error::InvalidConstantPoolIndex(index));
        }
        Ok(&self.entries[idx])
    }

    pub(crate) fn utf8(&self, index: u16) -> Result<&str> {
        match self.get(index)? {
            Entry::Utf8(text) => Ok(text.as_str()),
            _ => Err(Error::InvalidConstantPoolIndex(index)),
        }
    }

    pub(crate) fn class_name(&self, index: u16) -> Result<&str> {
        match self.get(index)? {
            Entry::Class { name_index } => self.utf8(*name_index),
            _ => Err(Error::InvalidConstantPoolIndex(index)),
        }
    }
}

/// Decodes one UTF-8 constant.
///
/// Class files store strings in the JVM's modified UTF-8 dialect: NUL gets a
/// two-byte encoding so a raw 0x00 never appears, and supplementary
/// characters arrive as CESU-8-style surrogate pairs rather than 4-byte
/// sequences. Decoding therefore goes through UTF-16 code units, lossily:
/// identifiers may legally contain unpaired surrogates.
fn utf8_constant(bytes: &[u8]) -> Result<String> {
    fn trailing(byte: u8) -> Result<u16> {
        if byte & 0xC0 == 0x80 {
            Ok(u16::from(byte & 0x3F))
        } else {
            Err(Error::InvalidUtf8)
        }
    }

    let mut units: Vec<u16> = Vec::with_capacity(bytes.len());
    let mut rest = bytes;
    while !rest.is_empty() {
        rest = match rest {
            [0xC0, 0x80, tail @ ..] => {
                units.push(0);
                tail
            }
            [b, tail @ ..] if *b < 0x80 => {
                units.push(u16::from(*b));
                tail
            }
            [b, b2, tail @ ..] if b >> 5 == 0b110 => {
                units.push(u16::from(b & 0x1F) << 6 | trailing(*b2)?);
                tail
            }
            [b, b2, b3, tail @ ..] if b >> 4 == 0b1110 => {
                units.push(
                    u16::from(b & 0x0F) << 12 | trailing(*b2)? << 6 | trailing(*b3)?,
                );
                tail
            }
            _ => return Err(Error::InvalidUtf8),
        };
    }
    Ok(String::from_utf16_lossy(&units))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_plain_and_two_byte_forms() {
        assert_eq!(utf8_constant(b"plus").unwrap(), "plus");
        // NUL's dedicated two-byte form.
        assert_eq!(utf8_constant(&[b'a', 0xC0, 0x80, b'b']).unwrap(), "a\0b");
        // U+00E9, e with acute.
        assert_eq!(utf8_constant(&[0xC3, 0xA9]).unwrap(), "é");
        // U+2192, rightwards arrow, in the three-byte form.
        assert_eq!(utf8_constant(&[0xE2, 0x86, 0x92]).unwrap(), "→");
    }

    #[test]
    fn rejects_malformed_sequences() {
        // A bare continuation byte.
        assert!(utf8_constant(&[0x80]).is_err());
        // A two-byte lead with nothing after it.
        assert!(utf8_constant(&[0xC3]).is_err());
        // A 4-byte sequence, which the modified dialect never uses.
        assert!(utf8_constant(&[0xF0, 0x9F, 0x92, 0xA9]).is_err());
    }

    #[test]
    fn cursor_reports_offsets_and_truncation() {
        let mut scan = ClassBytes::of(&[0, 2, 0xAB, 0xCD]);
        assert_eq!(scan.count().unwrap(), 2);
        assert_eq!(scan.offset(), 2);
        assert_eq!(scan.u2().unwrap(), 0xABCD);
        assert!(matches!(scan.u1().unwrap_err(), Error::Truncated));
    }
}
