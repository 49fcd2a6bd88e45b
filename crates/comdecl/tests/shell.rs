//! Tests for the shell and taskbar interfaces against mock objects

mod common;

use std::ffi::c_void;
use std::ptr;

use common::{MockActivator, MockBuilder, MockObject, wide_arg, write_wide};
use comdecl::com::{E_FAIL, E_NOINTERFACE, HRESULT, S_FALSE, S_OK};
use comdecl::interfaces::{
    CLSID_SHELL_LINK, CLSID_TASKBAR_LIST, IID_IPERSISTFILE, IID_ISHELLLINKW, IID_ITASKBARLIST3,
    IPersistFile, IShellLinkW, ITEMIDLIST, ITaskbarList3, SHITEMID, SLGP, ShortcutSpec, TBPF,
    TaskbarState, WIN32_FIND_DATAW,
};
use comdecl::{ComError, ComInterface, GUID};

fn mock<'a>(object: *mut MockObject) -> &'a MockObject {
    unsafe { MockObject::get(object.cast()) }
}

fn slots<T: ComInterface>() -> Vec<(String, usize)> {
    T::descriptor()
        .unwrap()
        .iter()
        .map(|e| (e.name.clone(), e.slot))
        .collect()
}

fn has_slot<T: ComInterface>(name: &str, slot: usize) -> bool {
    slots::<T>().contains(&(name.to_owned(), slot))
}

// =============================================================================
// Mock shell link
// =============================================================================

macro_rules! text_setter {
    ($name:ident, $label:literal) => {
        unsafe extern "system" fn $name(this: *mut c_void, text: *const u16) -> HRESULT {
            let text = unsafe { wide_arg(text) };
            mock(this.cast()).record(format!("{}({})", $label, text));
            S_OK
        }
    };
}

text_setter!(set_path, "SetPath");
text_setter!(set_working_directory, "SetWorkingDirectory");
text_setter!(set_description, "SetDescription");
text_setter!(set_arguments, "SetArguments");

unsafe extern "system" fn set_icon_location(this: *mut c_void, path: *const u16, index: i32) -> HRESULT {
    let path = unsafe { wide_arg(path) };
    mock(this.cast()).record(format!("SetIconLocation({path}, {index})"));
    S_OK
}

unsafe extern "system" fn get_path(
    this: *mut c_void,
    buffer: *mut u16,
    cch: i32,
    data: *mut WIN32_FIND_DATAW,
    flags: u32,
) -> HRESULT {
    let object = mock(this.cast());
    object.record(format!("GetPath({cch}, {flags})"));
    let status = object.status();
    if status == S_OK {
        unsafe {
            write_wide(buffer, cch, r"C:\Tools\target.exe");
            (*data).nFileSizeLow = 1234;
        }
    }
    status
}

unsafe extern "system" fn get_description(this: *mut c_void, buffer: *mut u16, cch: i32) -> HRESULT {
    mock(this.cast()).record("GetDescription");
    unsafe { write_wide(buffer, cch, "A shortcut") };
    S_OK
}

static ID_LIST: ITEMIDLIST = ITEMIDLIST {
    mkid: SHITEMID { cb: 0, abID: [0] },
};

unsafe extern "system" fn get_id_list(_this: *mut c_void, out: *mut *mut ITEMIDLIST) -> HRESULT {
    unsafe { *out = ptr::from_ref(&ID_LIST).cast_mut() };
    S_OK
}

unsafe extern "system" fn load(this: *mut c_void, path: *const u16, mode: u32) -> HRESULT {
    let path = unsafe { wide_arg(path) };
    mock(this.cast()).record(format!("Load({path}, {mode})"));
    S_OK
}

unsafe extern "system" fn save(this: *mut c_void, path: *const u16, remember: i32) -> HRESULT {
    let path = unsafe { wide_arg(path) };
    mock(this.cast()).record(format!("Save({path}, {remember})"));
    S_OK
}

unsafe extern "system" fn is_dirty(this: *mut c_void) -> HRESULT {
    mock(this.cast()).status()
}

/// A shell link whose IPersistFile is a separate object.
fn shell_link() -> (IShellLinkW, *mut MockObject, *mut MockObject) {
    let file = MockBuilder::new(9)
        .slot(4, is_dirty as *const c_void)
        .slot(5, load as *const c_void)
        .slot(6, save as *const c_void)
        .build();
    let link = MockBuilder::new(21)
        .slot(3, get_path as *const c_void)
        .slot(4, get_id_list as *const c_void)
        .slot(6, get_description as *const c_void)
        .slot(7, set_description as *const c_void)
        .slot(9, set_working_directory as *const c_void)
        .slot(11, set_arguments as *const c_void)
        .slot(17, set_icon_location as *const c_void)
        .slot(20, set_path as *const c_void)
        .build();
    mock(link).answer(IID_IPERSISTFILE, file);

    let activator = MockActivator::returning(link);
    let handle = IShellLinkW::create_with(&activator).unwrap();
    assert_eq!(
        *activator.requests.lock().unwrap(),
        [(CLSID_SHELL_LINK, IID_ISHELLLINKW)]
    );
    (handle, link, file)
}

// =============================================================================
// Declarations
// =============================================================================

#[test]
fn test_shell_link_slots() {
    for (name, slot) in [
        ("GetPath", 3),
        ("GetIDList", 4),
        ("SetIDList", 5),
        ("GetDescription", 6),
        ("SetDescription", 7),
        ("GetWorkingDirectory", 8),
        ("SetWorkingDirectory", 9),
        ("GetArguments", 10),
        ("SetArguments", 11),
        ("GetIconLocation", 16),
        ("SetIconLocation", 17),
        ("Resolve", 19),
        ("SetPath", 20),
    ] {
        assert!(has_slot::<IShellLinkW>(name, slot), "{name} at {slot}");
    }
    assert_eq!(
        IShellLinkW::IID,
        GUID::parse("{000214F9-0000-0000-C000-000000000046}").unwrap()
    );
    assert_eq!(IShellLinkW::CLSID, Some(CLSID_SHELL_LINK));
}

#[test]
fn test_persist_file_slots() {
    for (name, slot) in [
        ("GetClassID", 3),
        ("IsDirty", 4),
        ("Load", 5),
        ("Save", 6),
        ("SaveCompleted", 7),
        ("GetCurFile", 8),
    ] {
        assert!(has_slot::<IPersistFile>(name, slot), "{name} at {slot}");
    }
    assert_eq!(
        IPersistFile::IID,
        GUID::parse("{0000010B-0000-0000-C000-000000000046}").unwrap()
    );
    assert_eq!(IPersistFile::CLSID, Some(CLSID_SHELL_LINK));
}

#[test]
fn test_taskbar_slots() {
    for (name, slot) in [
        ("HrInit", 3),
        ("AddTab", 4),
        ("MarkFullscreenWindow", 8),
        ("SetProgressValue", 9),
        ("SetProgressState", 10),
    ] {
        assert!(has_slot::<ITaskbarList3>(name, slot), "{name} at {slot}");
    }
    assert_eq!(
        IID_ITASKBARLIST3,
        GUID::parse("{EA1AFB91-9E28-4B86-90E9-9E9F8A5EEFAF}").unwrap()
    );
    assert_eq!(
        CLSID_TASKBAR_LIST,
        GUID::parse("{56FDF344-FD6D-11D0-958A-006097C9A090}").unwrap()
    );
    let progress = ITaskbarList3::descriptor().unwrap().get("SetProgressValue").unwrap();
    assert_eq!(progress.signature.to_string(), "HRESULT (*)(void*, void*, u64, u64)");
}

// =============================================================================
// IShellLinkW helpers
// =============================================================================

#[test]
fn test_create_link() {
    let (link, link_mock, file_mock) = shell_link();
    let spec = ShortcutSpec::new(r"C:\Tools\app.exe")
        .working_directory(r"C:\Tools")
        .description("App")
        .arguments("--fast")
        .icon(r"C:\Tools\app.ico", 2);

    link.create_link(&spec, r"C:\Users\me\Desktop\App.lnk").unwrap();

    assert_eq!(
        mock(link_mock).calls(),
        [
            r"SetPath(C:\Tools\app.exe)",
            r"SetWorkingDirectory(C:\Tools)",
            "SetDescription(App)",
            "SetArguments(--fast)",
            r"SetIconLocation(C:\Tools\app.ico, 2)",
        ]
    );
    assert_eq!(mock(file_mock).calls(), [r"Save(C:\Users\me\Desktop\App.lnk, 1)"]);
    // The IPersistFile reference was handed back.
    assert_eq!(mock(file_mock).refs(), 1);
}

#[test]
fn test_create_link_minimal() {
    let (link, link_mock, file_mock) = shell_link();
    link.create_link(&ShortcutSpec::new("target"), "out.lnk").unwrap();
    assert_eq!(mock(link_mock).calls(), ["SetPath(target)"]);
    assert_eq!(mock(file_mock).calls(), ["Save(out.lnk, 1)"]);
}

#[test]
fn test_create_link_rejects_interior_nul() {
    let (link, link_mock, _) = shell_link();
    let err = link.create_link(&ShortcutSpec::new("bad\0path"), "out.lnk").unwrap_err();
    assert_eq!(err, ComError::InvalidPath);
    assert!(mock(link_mock).calls().is_empty());
}

#[test]
fn test_get_path() {
    let (link, link_mock, file_mock) = shell_link();
    assert_eq!(
        link.get_path(None).unwrap().as_deref(),
        Some(r"C:\Tools\target.exe")
    );
    assert_eq!(
        mock(link_mock).calls(),
        [format!("GetPath(260, {})", SLGP::UNCPRIORITY)]
    );
    assert!(mock(file_mock).calls().is_empty());
}

#[test]
fn test_get_path_loads_link_first() {
    let (link, _, file_mock) = shell_link();
    link.get_path(Some(r"C:\link.lnk")).unwrap();
    assert_eq!(mock(file_mock).calls(), [r"Load(C:\link.lnk, 0)"]);
}

#[test]
fn test_get_path_without_target() {
    let (link, link_mock, _) = shell_link();
    mock(link_mock).set_status(S_FALSE);
    assert_eq!(link.get_path(None).unwrap(), None);

    mock(link_mock).set_status(E_FAIL);
    assert_eq!(
        link.get_path(None).unwrap_err(),
        ComError::NativeCallFailed {
            method: "GetPath".into(),
            hresult: E_FAIL,
        }
    );
}

#[test]
fn test_get_path_without_persist_file() {
    let link_mock = MockBuilder::new(21).slot(3, get_path as *const c_void).build();
    let link = unsafe { IShellLinkW::from_raw(link_mock.cast()) }.unwrap();
    assert_eq!(
        link.get_path(Some("x.lnk")).unwrap_err(),
        ComError::InterfaceNotSupported {
            interface: "IPersistFile",
            hresult: E_NOINTERFACE,
        }
    );
}

#[test]
fn test_get_id_list_and_description() {
    let (link, _, _) = shell_link();
    assert_eq!(link.get_id_list().unwrap(), ptr::from_ref(&ID_LIST).cast_mut());
    assert_eq!(link.description().unwrap(), "A shortcut");
}

#[test]
fn test_is_dirty() {
    let (link, _, file_mock) = shell_link();
    let file: IPersistFile = link.query_interface().unwrap();
    assert!(file.is_dirty().unwrap());
    mock(file_mock).set_status(S_FALSE);
    assert!(!file.is_dirty().unwrap());
    mock(file_mock).set_status(E_FAIL);
    assert!(file.is_dirty().is_err());
}

// =============================================================================
// ITaskbarList3 helpers
// =============================================================================

unsafe extern "system" fn hr_init(this: *mut c_void) -> HRESULT {
    mock(this.cast()).record("HrInit");
    S_OK
}

unsafe extern "system" fn set_progress_value(
    this: *mut c_void,
    hwnd: *mut c_void,
    completed: u64,
    total: u64,
) -> HRESULT {
    mock(this.cast()).record(format!("SetProgressValue({}, {completed}, {total})", hwnd as usize));
    S_OK
}

unsafe extern "system" fn set_progress_state(this: *mut c_void, hwnd: *mut c_void, flags: i32) -> HRESULT {
    mock(this.cast()).record(format!("SetProgressState({}, {flags})", hwnd as usize));
    S_OK
}

#[test]
fn test_taskbar_progress() {
    let object = MockBuilder::new(11)
        .slot(3, hr_init as *const c_void)
        .slot(9, set_progress_value as *const c_void)
        .slot(10, set_progress_state as *const c_void)
        .build();
    let activator = MockActivator::returning(object);
    let taskbar = ITaskbarList3::create_with(&activator).unwrap();
    assert_eq!(
        *activator.requests.lock().unwrap(),
        [(CLSID_TASKBAR_LIST, IID_ITASKBARLIST3)]
    );

    let hwnd = 0x1234 as *mut c_void;
    taskbar.hr_init().unwrap();
    taskbar.set_progress(hwnd, 50, 100).unwrap();
    taskbar.set_state(hwnd, TaskbarState::Paused).unwrap();

    assert_eq!(
        mock(object).calls(),
        [
            "HrInit".to_owned(),
            format!("SetProgressValue({}, 50, 100)", 0x1234),
            format!("SetProgressState({}, {})", 0x1234, TBPF::PAUSED),
        ]
    );
}

#[test]
fn test_taskbar_state_flags() {
    assert_eq!(TaskbarState::NoProgress.flags(), 0);
    assert_eq!(TaskbarState::Indeterminate.flags(), 1);
    assert_eq!(TaskbarState::Normal.flags(), 2);
    assert_eq!(TaskbarState::Error.flags(), 4);
    assert_eq!(TaskbarState::Paused.flags(), 8);
}
