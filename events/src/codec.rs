//! Word codec — 32-byte word packing for log payloads.
//!
//! Log data is a sequence of 32-byte words: value types are right-aligned
//! in one word, dynamic strings are an offset word pointing at a
//! length-prefixed, zero-padded tail.

use crate::DecodeError;
use tally_types::{Address, ContentHash, Timestamp, TokenAmount};

pub const WORD: usize = 32;

/// Sequential reader over word-packed payload bytes.
pub struct WordReader<'a> {
    data: &'a [u8],
    cursor: usize,
}

impl<'a> WordReader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, cursor: 0 }
    }

    fn word_at(&self, offset: usize) -> Result<&'a [u8], DecodeError> {
        self.data
            .get(offset..offset + WORD)
            .ok_or(DecodeError::Truncated {
                wanted: offset + WORD,
                have: self.data.len(),
            })
    }

    fn next_word(&mut self) -> Result<&'a [u8], DecodeError> {
        let word = self.word_at(self.cursor)?;
        self.cursor += WORD;
        Ok(word)
    }

    /// Read an address from the low 20 bytes of the next word.
    pub fn address(&mut self) -> Result<Address, DecodeError> {
        let word = self.next_word()?;
        if word[..12].iter().any(|&b| b != 0) {
            return Err(DecodeError::Malformed("address word has high bytes set"));
        }
        let mut bytes = [0u8; 20];
        bytes.copy_from_slice(&word[12..]);
        Ok(Address::from_bytes(&bytes))
    }

    /// Read a u64 from the low 8 bytes of the next word.
    pub fn u64(&mut self) -> Result<u64, DecodeError> {
        let word = self.next_word()?;
        if word[..24].iter().any(|&b| b != 0) {
            return Err(DecodeError::Malformed("u64 word overflows"));
        }
        let mut bytes = [0u8; 8];
        bytes.copy_from_slice(&word[24..]);
        Ok(u64::from_be_bytes(bytes))
    }

    /// Read a u8 from the next word.
    pub fn u8(&mut self) -> Result<u8, DecodeError> {
        let value = self.u64()?;
        u8::try_from(value).map_err(|_| DecodeError::Malformed("u8 word overflows"))
    }

    /// Read an amount from the low 16 bytes of the next word.
    /// Words with higher bytes set are rejected rather than truncated.
    pub fn amount(&mut self) -> Result<TokenAmount, DecodeError> {
        let word = self.next_word()?;
        if word[..16].iter().any(|&b| b != 0) {
            return Err(DecodeError::Malformed("amount word overflows u128"));
        }
        let mut bytes = [0u8; 16];
        bytes.copy_from_slice(&word[16..]);
        Ok(TokenAmount::new(u128::from_be_bytes(bytes)))
    }

    /// Read a raw timestamp word and normalize it to seconds.
    pub fn timestamp(&mut self) -> Result<Timestamp, DecodeError> {
        Ok(Timestamp::normalize(self.u64()?))
    }

    /// Read a full 32-byte hash word.
    pub fn hash(&mut self) -> Result<ContentHash, DecodeError> {
        let word = self.next_word()?;
        let mut bytes = [0u8; 32];
        bytes.copy_from_slice(word);
        Ok(ContentHash::new(bytes))
    }

    /// Read a dynamic UTF-8 string: an offset word here, length + bytes
    /// at the offset.
    pub fn string(&mut self) -> Result<String, DecodeError> {
        let offset = {
            let word = self.next_word()?;
            if word[..24].iter().any(|&b| b != 0) {
                return Err(DecodeError::Malformed("string offset overflows"));
            }
            let mut bytes = [0u8; 8];
            bytes.copy_from_slice(&word[24..]);
            u64::from_be_bytes(bytes) as usize
        };
        let len_word = self.word_at(offset)?;
        if len_word[..24].iter().any(|&b| b != 0) {
            return Err(DecodeError::Malformed("string length overflows"));
        }
        let mut len_bytes = [0u8; 8];
        len_bytes.copy_from_slice(&len_word[24..]);
        let len = u64::from_be_bytes(len_bytes) as usize;

        let start = offset + WORD;
        let bytes = self
            .data
            .get(start..start + len)
            .ok_or(DecodeError::Truncated {
                wanted: start + len,
                have: self.data.len(),
            })?;
        String::from_utf8(bytes.to_vec())
            .map_err(|_| DecodeError::Malformed("string is not valid UTF-8"))
    }
}

// ── Encoding helpers (used by log producers and tests) ─────────────────

pub fn word_from_address(address: &Address) -> [u8; 32] {
    let mut word = [0u8; 32];
    let hex_part = &address.as_str()[2..];
    for i in 0..20 {
        word[12 + i] = u8::from_str_radix(&hex_part[2 * i..2 * i + 2], 16)
            .expect("canonical address is valid hex");
    }
    word
}

pub fn word_from_u64(value: u64) -> [u8; 32] {
    let mut word = [0u8; 32];
    word[24..].copy_from_slice(&value.to_be_bytes());
    word
}

pub fn word_from_u128(value: u128) -> [u8; 32] {
    let mut word = [0u8; 32];
    word[16..].copy_from_slice(&value.to_be_bytes());
    word
}

/// Pack fixed words followed by an optional dynamic string tail.
pub fn pack_words(words: &[[u8; 32]]) -> Vec<u8> {
    let mut out = Vec::with_capacity(words.len() * WORD);
    for word in words {
        out.extend_from_slice(word);
    }
    out
}

/// Pack fixed words plus one trailing dynamic string (offset word last).
pub fn pack_words_with_string(words: &[[u8; 32]], text: &str) -> Vec<u8> {
    let mut out = pack_words(words);
    let offset = (words.len() + 1) * WORD;
    out.extend_from_slice(&word_from_u64(offset as u64));
    out.extend_from_slice(&word_from_u64(text.len() as u64));
    out.extend_from_slice(text.as_bytes());
    let pad = (WORD - text.len() % WORD) % WORD;
    out.extend(std::iter::repeat(0u8).take(pad));
    out
}
