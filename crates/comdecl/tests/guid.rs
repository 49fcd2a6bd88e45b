//! Tests for the GUID text codec

use comdecl::interfaces::{
    CLSID_SHELL_LINK, CLSID_TASKBAR_LIST, IID_IPERSISTFILE, IID_ISHELLLINKW, IID_ITASKBARLIST3,
};
use comdecl::{FormatError, GUID, IID_IUNKNOWN};

const SHELL_LINK: &str = "{00021401-0000-0000-C000-000000000046}";

#[test]
fn test_parse_fields() {
    let guid = GUID::parse(SHELL_LINK).unwrap();
    assert_eq!(guid.data1, 0x00021401);
    assert_eq!(guid.data2, 0);
    assert_eq!(guid.data3, 0);
    assert_eq!(guid.data4, [0xC0, 0, 0, 0, 0, 0, 0, 0x46]);
}

#[test]
fn test_display_round_trips_up_to_case() {
    for text in [
        "{ea1afb91-9e28-4b86-90e9-9e9f8a5eefaf}",
        "{EA1AFB91-9e28-4B86-90e9-9E9F8A5eefaf}",
        "{00000000-0000-0000-0000-000000000000}",
        "{FFFFFFFF-FFFF-FFFF-FFFF-FFFFFFFFFFFF}",
        "{ffffffff-ffff-ffff-ffff-ffffffffffff}",
        "{0a1B2c3D-4e5F-6a7B-8c9D-0e1F2a3B4c5D}",
        SHELL_LINK,
    ] {
        let guid = GUID::parse(text).unwrap();
        assert_eq!(guid.to_string(), text.to_uppercase());
        assert_eq!(GUID::parse(&guid.to_string()), Ok(guid));
        assert_eq!(format!("{guid:?}"), guid.to_string());
    }
}

#[test]
fn test_shipped_guids_round_trip() {
    for guid in [
        IID_IUNKNOWN,
        IID_IPERSISTFILE,
        IID_ISHELLLINKW,
        IID_ITASKBARLIST3,
        CLSID_SHELL_LINK,
        CLSID_TASKBAR_LIST,
        GUID::ZERO,
        GUID::from_u128(u128::MAX),
    ] {
        let text = guid.to_string();
        assert_eq!(GUID::parse(&text), Ok(guid));
        assert_eq!(GUID::parse(&text.to_lowercase()), Ok(guid));
    }
}

#[test]
fn test_from_str() {
    let guid: GUID = SHELL_LINK.parse().unwrap();
    assert_eq!(guid, GUID::from_u128(0x00021401_0000_0000_C000_000000000046));
}

#[test]
fn test_equality_is_fieldwise() {
    let a = GUID::parse("{56FDF344-FD6D-11D0-958A-006097C9A090}").unwrap();
    let mut b = a;
    assert_eq!(a, b);
    b.data4[7] ^= 1;
    assert_ne!(a, b);
}

#[test]
fn test_rejects_malformed_text() {
    let bad = [
        // no braces
        "00021401-0000-0000-C000-000000000046",
        // one brace missing
        "{00021401-0000-0000-C000-000000000046",
        // one digit short
        "{00021401-0000-0000-C000-00000000004}",
        // hyphen moved
        "{0002140-10000-0000-C000-000000000046}",
        // non-hex digit
        "{0002140G-0000-0000-C000-000000000046}",
        "",
    ];
    for text in bad {
        let err = GUID::parse(text).unwrap_err();
        assert_eq!(err.input, text, "{text}");
    }
}

#[test]
fn test_error_message_names_input() {
    let err: FormatError = GUID::parse("{nope}").unwrap_err();
    assert!(err.to_string().contains("{nope}"));
}

#[test]
fn test_zero() {
    assert_eq!(GUID::ZERO, GUID::default());
    assert_eq!(
        GUID::ZERO.to_string(),
        "{00000000-0000-0000-0000-000000000000}"
    );
}

#[cfg(feature = "windows-compat")]
#[test]
fn test_windows_core_conversion() {
    let guid = GUID::parse(SHELL_LINK).unwrap();
    let converted: windows_core::GUID = guid.into();
    assert_eq!(GUID::from(converted), guid);
}
