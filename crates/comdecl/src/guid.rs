//! GUID codec.
//!
//! Interface ids (IID) and class ids (CLSID) are written in the registry form
//! `{XXXXXXXX-XXXX-XXXX-XXXX-XXXXXXXXXXXX}`: exactly 38 characters, braces and
//! hyphens included, hex digits in either case.

use std::fmt;
use std::str::FromStr;

use crate::error::FormatError;

/// Length of the braced textual form.
pub const GUID_TEXT_LEN: usize = 38;

/// 128-bit globally unique identifier (GUID/IID/CLSID).
#[repr(C)]
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct GUID {
    pub data1: u32,
    pub data2: u16,
    pub data3: u16,
    pub data4: [u8; 8],
}

impl GUID {
    /// Create a new GUID from components
    #[must_use]
    pub const fn new(data1: u32, data2: u16, data3: u16, data4: [u8; 8]) -> Self {
        Self {
            data1,
            data2,
            data3,
            data4,
        }
    }

    /// Build a GUID from its big-endian 128-bit value, e.g.
    /// `GUID::from_u128(0x000214F9_0000_0000_C000_000000000046)`.
    #[must_use]
    pub const fn from_u128(value: u128) -> Self {
        Self {
            data1: (value >> 96) as u32,
            data2: (value >> 80) as u16,
            data3: (value >> 64) as u16,
            data4: (value as u64).to_be_bytes(),
        }
    }

    /// The big-endian 128-bit value of this GUID.
    #[must_use]
    pub const fn to_u128(&self) -> u128 {
        ((self.data1 as u128) << 96)
            | ((self.data2 as u128) << 80)
            | ((self.data3 as u128) << 64)
            | u64::from_be_bytes(self.data4) as u128
    }

    /// The nil/zero GUID
    pub const ZERO: GUID = GUID::new(0, 0, 0, [0; 8]);

    /// Parse the braced registry form.
    pub fn parse(text: &str) -> Result<Self, FormatError> {
        parse_braced(text.as_bytes()).map_err(|reason| FormatError {
            input: text.to_owned(),
            reason,
        })
    }

    /// Parse the braced registry form in a const context.
    ///
    /// Malformed input fails constant evaluation, so a bad literal in a
    /// `const` item is a compile error.
    #[must_use]
    pub const fn from_braced(text: &str) -> Self {
        match parse_braced(text.as_bytes()) {
            Ok(guid) => guid,
            Err(reason) => panic!("{}", reason),
        }
    }
}

const fn hex_value(byte: u8) -> Option<u8> {
    match byte {
        b'0'..=b'9' => Some(byte - b'0'),
        b'a'..=b'f' => Some(byte - b'a' + 10),
        b'A'..=b'F' => Some(byte - b'A' + 10),
        _ => None,
    }
}

/// Reads `count` hex digits starting at `start`.
const fn read_hex(bytes: &[u8], start: usize, count: usize) -> Result<u64, &'static str> {
    let mut value = 0u64;
    let mut i = 0;
    while i < count {
        match hex_value(bytes[start + i]) {
            Some(digit) => value = (value << 4) | digit as u64,
            None => return Err("non-hex digit"),
        }
        i += 1;
    }
    Ok(value)
}

const fn parse_braced(bytes: &[u8]) -> Result<GUID, &'static str> {
    if bytes.len() != GUID_TEXT_LEN {
        return Err("expected 38 characters");
    }
    if bytes[0] != b'{' || bytes[GUID_TEXT_LEN - 1] != b'}' {
        return Err("expected surrounding braces");
    }
    if bytes[9] != b'-' || bytes[14] != b'-' || bytes[19] != b'-' || bytes[24] != b'-' {
        return Err("hyphens out of place");
    }

    let data1 = match read_hex(bytes, 1, 8) {
        Ok(v) => v as u32,
        Err(e) => return Err(e),
    };
    let data2 = match read_hex(bytes, 10, 4) {
        Ok(v) => v as u16,
        Err(e) => return Err(e),
    };
    let data3 = match read_hex(bytes, 15, 4) {
        Ok(v) => v as u16,
        Err(e) => return Err(e),
    };

    // data4: two bytes before the last hyphen, six after it
    let mut data4 = [0u8; 8];
    let mut i = 0;
    while i < 8 {
        let start = if i < 2 { 20 + i * 2 } else { 25 + (i - 2) * 2 };
        match read_hex(bytes, start, 2) {
            Ok(v) => data4[i] = v as u8,
            Err(e) => return Err(e),
        }
        i += 1;
    }

    Ok(GUID::new(data1, data2, data3, data4))
}

impl FromStr for GUID {
    type Err = FormatError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for GUID {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{{{:08X}-{:04X}-{:04X}-{:02X}{:02X}-{:02X}{:02X}{:02X}{:02X}{:02X}{:02X}}}",
            self.data1,
            self.data2,
            self.data3,
            self.data4[0],
            self.data4[1],
            self.data4[2],
            self.data4[3],
            self.data4[4],
            self.data4[5],
            self.data4[6],
            self.data4[7]
        )
    }
}

impl fmt::Debug for GUID {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

#[cfg(feature = "windows-compat")]
impl From<GUID> for windows_core::GUID {
    fn from(guid: GUID) -> Self {
        windows_core::GUID::from_values(guid.data1, guid.data2, guid.data3, guid.data4)
    }
}

#[cfg(feature = "windows-compat")]
impl From<windows_core::GUID> for GUID {
    fn from(guid: windows_core::GUID) -> Self {
        GUID::new(guid.data1, guid.data2, guid.data3, guid.data4)
    }
}
