//! Interposed `<wchar.h>` symbols.

use std::ffi::c_int;

use memtag_rs_core::checked;
use memtag_rs_core::string::wide::WideChar;

#[unsafe(no_mangle)]
pub unsafe extern "C" fn wcslen(s: *const WideChar) -> usize {
    // SAFETY: forwarded C contract.
    unsafe { checked::wide::wcslen(s) }
}

#[unsafe(no_mangle)]
pub unsafe extern "C" fn wcscpy(dest: *mut WideChar, src: *const WideChar) -> *mut WideChar {
    // SAFETY: forwarded C contract.
    unsafe { checked::wide::wcscpy(dest, src) }
}

#[unsafe(no_mangle)]
pub unsafe extern "C" fn wcscmp(a: *const WideChar, b: *const WideChar) -> c_int {
    // SAFETY: forwarded C contract.
    unsafe { checked::wide::wcscmp(a, b) }
}
