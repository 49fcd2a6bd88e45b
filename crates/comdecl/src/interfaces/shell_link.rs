use std::ptr;

use tracing::debug;

use crate::com::{IUnknown, S_FALSE, S_OK};
use crate::error::{ComError, Result};

use super::{
    CLSID_SHELL_LINK, HWND, IPersistFile, ITEMIDLIST, MAX_PATH, STGM_READ, WIN32_FIND_DATAW,
    from_wide, to_wide,
};

/// `SLGP_FLAGS` for [`IShellLinkW::GetPath`].
#[derive(Debug, Clone, Copy)]
pub struct SLGP;

impl SLGP {
    /// The 8.3 short name.
    pub const SHORTPATH: u32 = 0x1;
    /// The UNC path, when there is one.
    pub const UNCPRIORITY: u32 = 0x2;
    /// The raw path, environment variables unexpanded.
    pub const RAWPATH: u32 = 0x4;
    pub const RELATIVEPRIORITY: u32 = 0x8;
}

/// Creates, modifies and resolves Shell links.
#[crate::com_interface(
    iid = "{000214F9-0000-0000-C000-000000000046}",
    clsid = CLSID_SHELL_LINK,
    extends(IUnknown),
    internal
)]
pub trait IShellLinkW {
    /// Gets the path and file name of the link target.
    #[slot(3)]
    fn GetPath(
        &self,
        psz_file: *mut u16,
        cch: i32,
        pfd: crate::alt!(*mut WIN32_FIND_DATAW, &mut WIN32_FIND_DATAW),
        f_flags: u32,
    );

    /// Gets the item identifier list of the link target.
    fn GetIDList(&self, ppidl: *mut *mut ITEMIDLIST);
    fn SetIDList(&self, pidl: *const ITEMIDLIST);
    fn GetDescription(&self, psz_name: *mut u16, cch: i32);
    fn SetDescription(&self, psz_name: crate::alt!(*const u16, &str));
    fn GetWorkingDirectory(&self, psz_dir: *mut u16, cch: i32);
    fn SetWorkingDirectory(&self, psz_dir: crate::alt!(*const u16, &str));
    fn GetArguments(&self, psz_args: *mut u16, cch: i32);
    fn SetArguments(&self, psz_args: crate::alt!(*const u16, &str));
    fn GetHotkey(&self, pw_hotkey: *mut u16);
    fn SetHotkey(&self, w_hotkey: u16);
    fn GetShowCmd(&self, pi_show_cmd: *mut i32);
    fn SetShowCmd(&self, i_show_cmd: i32);
    fn GetIconLocation(&self, psz_icon_path: *mut u16, cch: i32, pi_icon: *mut i32);
    fn SetIconLocation(&self, psz_icon_path: crate::alt!(*const u16, &str), i_icon: i32);
    fn SetRelativePath(&self, psz_path_rel: *const u16, dw_reserved: u32);

    /// Finds the target of a link even if it has been moved or renamed.
    fn Resolve(&self, hwnd: HWND, f_flags: u32);

    /// Sets the path and file name of the link target.
    fn SetPath(&self, psz_file: crate::alt!(*const u16, &str));
}

/// What a new shortcut points at.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ShortcutSpec {
    pub target: String,
    pub arguments: Option<String>,
    pub working_directory: Option<String>,
    pub description: Option<String>,
    pub icon: Option<(String, i32)>,
}

impl ShortcutSpec {
    pub fn new(target: impl Into<String>) -> Self {
        Self {
            target: target.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn arguments(mut self, arguments: impl Into<String>) -> Self {
        self.arguments = Some(arguments.into());
        self
    }

    #[must_use]
    pub fn working_directory(mut self, dir: impl Into<String>) -> Self {
        self.working_directory = Some(dir.into());
        self
    }

    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    #[must_use]
    pub fn icon(mut self, path: impl Into<String>, index: i32) -> Self {
        self.icon = Some((path.into(), index));
        self
    }
}

impl IShellLinkW {
    /// The link target, after loading the link file at `link` if given.
    ///
    /// `None` when the link has no file-system target.
    pub fn get_path(&self, link: Option<&str>) -> Result<Option<String>> {
        if let Some(link) = link {
            let file: IPersistFile = self.query_interface()?;
            file.load(link, STGM_READ)?;
        }

        let mut buffer = [0u16; MAX_PATH];
        let mut data = WIN32_FIND_DATAW::zeroed();
        let method = self.method("GetPath")?;
        let status = unsafe {
            method.call_raw((
                buffer.as_mut_ptr(),
                MAX_PATH as i32,
                ptr::from_mut(&mut data),
                SLGP::UNCPRIORITY,
            ))
        }?;
        match status {
            S_OK => Ok(Some(from_wide(&buffer))),
            S_FALSE => Ok(None),
            hresult => Err(ComError::NativeCallFailed {
                method: method.name().to_owned(),
                hresult,
            }),
        }
    }

    /// The item identifier list of the target.
    ///
    /// The list is allocated by the shell; free it with `CoTaskMemFree`.
    pub fn get_id_list(&self) -> Result<*mut ITEMIDLIST> {
        let mut list: *mut ITEMIDLIST = ptr::null_mut();
        unsafe { self.GetIDList(&mut list) }?;
        Ok(list)
    }

    pub fn description(&self) -> Result<String> {
        self.read_string("GetDescription")
    }

    pub fn working_directory(&self) -> Result<String> {
        self.read_string("GetWorkingDirectory")
    }

    pub fn arguments(&self) -> Result<String> {
        self.read_string("GetArguments")
    }

    fn read_string(&self, name: &str) -> Result<String> {
        let mut buffer = [0u16; MAX_PATH];
        unsafe { self.invoke(name, (buffer.as_mut_ptr(), MAX_PATH as i32)) }?;
        Ok(from_wide(&buffer))
    }

    /// Fill the link from `spec` and save it to `destination`.
    pub fn create_link(&self, spec: &ShortcutSpec, destination: &str) -> Result<()> {
        let target = to_wide(&spec.target)?;
        unsafe { self.SetPath(target.as_ptr()) }?;

        if let Some(dir) = &spec.working_directory {
            let dir = to_wide(dir)?;
            unsafe { self.SetWorkingDirectory(dir.as_ptr()) }?;
        }
        if let Some(description) = &spec.description {
            let description = to_wide(description)?;
            unsafe { self.SetDescription(description.as_ptr()) }?;
        }
        if let Some(arguments) = &spec.arguments {
            let arguments = to_wide(arguments)?;
            unsafe { self.SetArguments(arguments.as_ptr()) }?;
        }
        if let Some((icon, index)) = &spec.icon {
            let icon = to_wide(icon)?;
            unsafe { self.SetIconLocation(icon.as_ptr(), *index) }?;
        }

        let file: IPersistFile = self.query_interface()?;
        file.save(destination, true)?;
        debug!("saved shortcut {} -> {}", destination, spec.target);
        Ok(())
    }
}
