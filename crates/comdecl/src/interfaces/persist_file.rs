use crate::com::{IUnknown, S_FALSE, S_OK};
use crate::error::{ComError, Result};
use crate::guid::GUID;

use super::{CLSID_SHELL_LINK, to_wide};

/// Read-only access mode for [`IPersistFile::load`].
pub const STGM_READ: u32 = 0x0000_0000;

/// Provides the CLSID of an object that can be stored persistently.
#[crate::com_interface(
    iid = "{0000010C-0000-0000-C000-000000000046}",
    extends(IUnknown),
    internal
)]
pub trait IPersist {
    #[slot(3)]
    fn GetClassID(&self, p_class_id: crate::alt!(*mut GUID, &mut GUID));
}

/// Enables an object to be loaded from or saved to a disk file.
#[crate::com_interface(
    iid = "{0000010B-0000-0000-C000-000000000046}",
    clsid = CLSID_SHELL_LINK,
    extends(IPersist),
    internal
)]
pub trait IPersistFile {
    /// S_OK if the object changed since it was last saved, S_FALSE otherwise.
    #[slot(4)]
    fn IsDirty(&self);

    /// Opens the specified file and initializes the object from its contents.
    fn Load(&self, psz_file_name: crate::alt!(*const u16, &str), dw_mode: u32);

    /// Saves the object to the specified file; null saves to the current file.
    fn Save(&self, psz_file_name: crate::alt!(*const u16, &str), f_remember: i32);

    fn SaveCompleted(&self, psz_file_name: *const u16);

    /// Returns the current file name, allocated with `CoTaskMemAlloc`.
    fn GetCurFile(&self, ppsz_file_name: *mut *mut u16);
}

impl IPersist {
    /// The class id of the object.
    pub fn class_id(&self) -> Result<GUID> {
        let mut class_id = GUID::ZERO;
        unsafe { self.GetClassID(&mut class_id) }?;
        Ok(class_id)
    }
}

impl IPersistFile {
    /// Load the object from `path`.
    pub fn load(&self, path: &str, mode: u32) -> Result<()> {
        let path = to_wide(path)?;
        unsafe { self.Load(path.as_ptr(), mode) }
    }

    /// Save the object to `path`. With `remember` the object adopts `path` as
    /// its current file.
    pub fn save(&self, path: &str, remember: bool) -> Result<()> {
        let path = to_wide(path)?;
        unsafe { self.Save(path.as_ptr(), i32::from(remember)) }
    }

    pub fn is_dirty(&self) -> Result<bool> {
        let method = self.method("IsDirty")?;
        match unsafe { method.call_raw(()) }? {
            S_OK => Ok(true),
            S_FALSE => Ok(false),
            hresult => Err(ComError::NativeCallFailed {
                method: method.name().to_owned(),
                hresult,
            }),
        }
    }
}
