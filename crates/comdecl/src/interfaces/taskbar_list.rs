use tracing::debug;

use crate::com::IUnknown;
use crate::error::Result;

use super::{CLSID_TASKBAR_LIST, HICON, HWND, TBPFLAG};

crate::define_interface! {
    /// Controls the taskbar: tab management.
    pub interface ITaskbarList : IUnknown {
        iid = "{56FDF342-FD6D-11D0-958A-006097C9A090}";
        clsid = CLSID_TASKBAR_LIST;
        methods {
            HrInit = 3 (),
            AddTab = 4 (HWND),
            DeleteTab = 5 (HWND),
            ActivateTab = 6 (HWND),
            SetActiveAlt = 7 (HWND),
        }
    }

    /// Adds full-screen window marking.
    pub interface ITaskbarList2 : ITaskbarList {
        iid = "{602D4995-B13A-429B-A66E-1935E44F4317}";
        clsid = CLSID_TASKBAR_LIST;
        methods {
            MarkFullscreenWindow = 8 { hwnd: HWND, f_fullscreen: BOOL },
        }
    }
}

/// `TBPFLAG` values for [`ITaskbarList3::SetProgressState`].
#[derive(Debug, Clone, Copy)]
pub struct TBPF;

impl TBPF {
    pub const NOPROGRESS: TBPFLAG = 0x0;
    pub const INDETERMINATE: TBPFLAG = 0x1;
    /// Green.
    pub const NORMAL: TBPFLAG = 0x2;
    /// Red.
    pub const ERROR: TBPFLAG = 0x4;
    /// Yellow.
    pub const PAUSED: TBPFLAG = 0x8;
}

/// Progress indicator state of a taskbar button.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TaskbarState {
    #[default]
    NoProgress,
    Indeterminate,
    Normal,
    Error,
    Paused,
}

impl TaskbarState {
    #[must_use]
    pub const fn flags(self) -> TBPFLAG {
        match self {
            TaskbarState::NoProgress => TBPF::NOPROGRESS,
            TaskbarState::Indeterminate => TBPF::INDETERMINATE,
            TaskbarState::Normal => TBPF::NORMAL,
            TaskbarState::Error => TBPF::ERROR,
            TaskbarState::Paused => TBPF::PAUSED,
        }
    }
}

/// Taskbar progress bars, overlays and thumbnails.
#[crate::com_interface(
    iid = "{EA1AFB91-9E28-4B86-90E9-9E9F8A5EEFAF}",
    clsid = CLSID_TASKBAR_LIST,
    extends(ITaskbarList2),
    internal
)]
pub trait ITaskbarList3 {
    /// Shows `ull_completed` out of `ull_total` on the window's taskbar button.
    #[slot(9)]
    fn SetProgressValue(&self, hwnd: HWND, ull_completed: u64, ull_total: u64);

    /// Sets the type and state of the progress indicator.
    fn SetProgressState(&self, hwnd: HWND, tbp_flags: TBPFLAG);

    fn RegisterTab(&self, hwnd_tab: HWND, hwnd_mdi: HWND);
    fn UnregisterTab(&self, hwnd_tab: HWND);
    fn SetTabOrder(&self, hwnd_tab: HWND, hwnd_insert_before: HWND);
    fn SetTabActive(&self, hwnd_tab: HWND, hwnd_mdi: HWND, dw_reserved: u32);

    #[slot(18)]
    fn SetOverlayIcon(&self, hwnd: HWND, h_icon: HICON, psz_description: crate::alt!(*const u16, &str));
    fn SetThumbnailTooltip(&self, hwnd: HWND, psz_tip: crate::alt!(*const u16, &str));
}

impl ITaskbarList {
    /// Initializes the taskbar list object; call before anything else.
    pub fn hr_init(&self) -> Result<()> {
        unsafe { self.method("HrInit")?.call(()) }
    }
}

impl ITaskbarList3 {
    /// Show `completed` out of `total` on `hwnd`'s taskbar button.
    pub fn set_progress(&self, hwnd: HWND, completed: u64, total: u64) -> Result<()> {
        debug!("progress {}/{} on {:p}", completed, total, hwnd);
        unsafe { self.SetProgressValue(hwnd, completed, total) }
    }

    pub fn set_state(&self, hwnd: HWND, state: TaskbarState) -> Result<()> {
        debug!("progress state {:?} on {:p}", state, hwnd);
        unsafe { self.SetProgressState(hwnd, state.flags()) }
    }
}
