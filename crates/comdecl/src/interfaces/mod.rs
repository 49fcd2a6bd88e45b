//! Shell and taskbar interfaces.
//!
//! Slot numbers follow the Windows SDK headers (`ObjIdl.h`, `ShObjIdl_core.h`).

mod persist_file;
mod shell_link;
mod structs;
mod taskbar_list;

pub use persist_file::{IID_IPERSIST, IID_IPERSISTFILE, IPersist, IPersistFile, STGM_READ};
pub use shell_link::{IID_ISHELLLINKW, IShellLinkW, SLGP, ShortcutSpec};
pub use structs::{FILETIME, ITEMIDLIST, SHITEMID, WIN32_FIND_DATAW};
pub use taskbar_list::{
    IID_ITASKBARLIST, IID_ITASKBARLIST2, IID_ITASKBARLIST3, ITaskbarList, ITaskbarList2,
    ITaskbarList3, TBPF, TaskbarState,
};

use std::ffi::c_void;

use crate::error::{ComError, Result};
use crate::guid::GUID;
use crate::layout::{NativeType, TypeRegistry};

pub type HWND = *mut c_void;
pub type HICON = *mut c_void;
pub type BOOL = i32;
pub type TBPFLAG = i32;

pub const MAX_PATH: usize = 260;

/// Shell link objects (`.lnk` files).
pub const CLSID_SHELL_LINK: GUID = GUID::from_braced("{00021401-0000-0000-C000-000000000046}");
/// The taskbar.
pub const CLSID_TASKBAR_LIST: GUID = GUID::from_braced("{56FDF344-FD6D-11D0-958A-006097C9A090}");

/// Add the shell structs and handle types to `registry`.
pub fn register_shell_types(registry: &mut TypeRegistry) {
    registry
        .register_struct(FILETIME::layout())
        .register_struct(WIN32_FIND_DATAW::layout())
        .register_struct(SHITEMID::layout())
        .register_struct(ITEMIDLIST::layout())
        .register("HICON", NativeType::Pointer)
        .register("PIDLIST_ABSOLUTE", NativeType::Pointer)
        .register("PCIDLIST_ABSOLUTE", NativeType::Pointer);
}

/// NUL-terminated UTF-16 copy of `text`.
pub(crate) fn to_wide(text: &str) -> Result<Vec<u16>> {
    if text.contains('\0') {
        return Err(ComError::InvalidPath);
    }
    Ok(text.encode_utf16().chain(Some(0)).collect())
}

/// Text up to the first NUL of a UTF-16 buffer.
pub(crate) fn from_wide(buffer: &[u16]) -> String {
    let len = buffer.iter().position(|&c| c == 0).unwrap_or(buffer.len());
    String::from_utf16_lossy(&buffer[..len])
}
