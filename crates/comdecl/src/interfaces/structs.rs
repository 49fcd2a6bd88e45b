//! Records passed by pointer to the shell interfaces.
#![allow(non_camel_case_types)]

use crate::native_struct;

use super::MAX_PATH;

native_struct! {
    /// 100-nanosecond intervals since January 1, 1601 (UTC).
    pub struct FILETIME {
        pub dwLowDateTime: u32,
        pub dwHighDateTime: u32,
    }
}

native_struct! {
    /// File information filled in by `IShellLinkW::GetPath`.
    ///
    /// The Windows layout: the `_MAC`-only trailing fields are not part of it.
    pub struct WIN32_FIND_DATAW {
        pub dwFileAttributes: u32,
        pub ftCreationTime: FILETIME,
        pub ftLastAccessTime: FILETIME,
        pub ftLastWriteTime: FILETIME,
        pub nFileSizeHigh: u32,
        pub nFileSizeLow: u32,
        pub dwReserved0: u32,
        pub dwReserved1: u32,
        pub cFileName: [u16; MAX_PATH],
        pub cAlternateFileName: [u16; 14],
    }
}

native_struct! {
    /// One item identifier; `abID` is really `cb - 2` bytes long.
    pub struct SHITEMID {
        pub cb: u16,
        pub abID: [u8; 1],
    }
}

native_struct! {
    /// A list of item identifiers, terminated by a zero `cb`.
    pub struct ITEMIDLIST {
        pub mkid: SHITEMID,
    }
}

impl WIN32_FIND_DATAW {
    /// All fields zero.
    #[must_use]
    pub fn zeroed() -> Self {
        // SAFETY: every field is an integer or an array of integers.
        unsafe { std::mem::zeroed() }
    }

    /// `cFileName` up to its terminator.
    #[must_use]
    pub fn file_name(&self) -> String {
        super::from_wide(&self.cFileName)
    }

    /// File size in bytes.
    #[must_use]
    pub fn file_size(&self) -> u64 {
        (u64::from(self.nFileSizeHigh) << 32) | u64::from(self.nFileSizeLow)
    }
}

impl FILETIME {
    #[must_use]
    pub fn as_u64(&self) -> u64 {
        (u64::from(self.dwHighDateTime) << 32) | u64::from(self.dwLowDateTime)
    }
}
