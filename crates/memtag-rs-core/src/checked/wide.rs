//! Checked wide-character operations. Extents are element counts scaled
//! to bytes, terminator included.

use std::ffi::c_int;

use memtag_rs_oracle::guard::with_checking_disabled;
use memtag_rs_oracle::transport as oracle;

use crate::string::wide::{self, WideChar};

const WIDE: usize = size_of::<WideChar>();

/// Checked `wcslen`.
///
/// # Safety
///
/// C `wcslen` contract.
pub unsafe fn wcslen(s: *const WideChar) -> usize {
    with_checking_disabled(|| {
        // SAFETY: caller provides a terminated wide string.
        let len = unsafe { wide::wcslen(s) };
        oracle::check_load(s.cast(), (len + 1) * WIDE);
        len
    })
}

/// Checked `wcscpy`.
///
/// # Safety
///
/// C `wcscpy` contract.
pub unsafe fn wcscpy(dest: *mut WideChar, src: *const WideChar) -> *mut WideChar {
    with_checking_disabled(|| {
        // SAFETY: caller provides a terminated wide source.
        let len = unsafe { wide::wcslen(src) };
        let src_ok = oracle::check_load(src.cast(), (len + 1) * WIDE);
        let dest_ok = oracle::check_store(dest.cast(), (len + 1) * WIDE);
        // SAFETY: extents just validated.
        unsafe { wide::wcscpy(dest_ok.cast(), src_ok.cast()) };
        dest
    })
}

/// Checked `wcscmp`.
///
/// # Safety
///
/// C `wcscmp` contract.
pub unsafe fn wcscmp(a: *const WideChar, b: *const WideChar) -> c_int {
    with_checking_disabled(|| {
        // SAFETY: caller provides terminated wide strings.
        let (len_a, len_b) = unsafe { (wide::wcslen(a), wide::wcslen(b)) };
        let a_ok = oracle::check_load(a.cast(), (len_a + 1) * WIDE);
        let b_ok = oracle::check_load(b.cast(), (len_b + 1) * WIDE);
        // SAFETY: extents just validated.
        unsafe { wide::wcscmp(a_ok.cast(), b_ok.cast()) }
    })
}
