//! Wide-character primitives. `wchar_t` is 32-bit on Linux.

use std::ffi::c_int;

pub type WideChar = libc::wchar_t;

/// Element length up to (not including) the wide terminator.
///
/// # Safety
///
/// `s` must point to a null-terminated wide string.
pub unsafe fn wcslen(s: *const WideChar) -> usize {
    let mut len = 0usize;
    // SAFETY: per the function contract.
    unsafe {
        while *s.add(len) != 0 {
            len += 1;
        }
    }
    len
}

/// Copy a wide string including its terminator.
///
/// # Safety
///
/// `dest` must have room for `wcslen(src) + 1` elements; no overlap.
pub unsafe fn wcscpy(dest: *mut WideChar, src: *const WideChar) {
    let mut i = 0usize;
    // SAFETY: per the function contract.
    unsafe {
        loop {
            let ch = *src.add(i);
            *dest.add(i) = ch;
            if ch == 0 {
                return;
            }
            i += 1;
        }
    }
}

/// Lexicographic comparison of two wide strings.
///
/// # Safety
///
/// Both operands must be null-terminated wide strings.
pub unsafe fn wcscmp(a: *const WideChar, b: *const WideChar) -> c_int {
    let mut i = 0usize;
    // SAFETY: per the function contract.
    unsafe {
        loop {
            let ca = *a.add(i);
            let cb = *b.add(i);
            if cb == 0 {
                return ca.wrapping_sub(cb);
            }
            if ca != cb {
                return if ca < cb { -1 } else { 1 };
            }
            i += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn w(s: &str) -> Vec<WideChar> {
        s.chars()
            .map(|c| c as WideChar)
            .chain(std::iter::once(0))
            .collect()
    }

    #[test]
    fn wcslen_counts_elements() {
        let s = w("wide");
        unsafe {
            assert_eq!(wcslen(s.as_ptr()), 4);
            assert_eq!(wcslen(w("").as_ptr()), 0);
        }
    }

    #[test]
    fn wcscpy_copies_terminator_too() {
        let src = w("copy");
        let mut dst = vec![0x55 as WideChar; 6];
        unsafe { wcscpy(dst.as_mut_ptr(), src.as_ptr()) };
        assert_eq!(&dst[..5], &src[..]);
        assert_eq!(dst[5], 0x55);
    }

    #[test]
    fn wcscmp_orders() {
        unsafe {
            assert_eq!(wcscmp(w("equal").as_ptr(), w("equal").as_ptr()), 0);
            assert!(wcscmp(w("abc").as_ptr(), w("abd").as_ptr()) < 0);
            assert!(wcscmp(w("abd").as_ptr(), w("abc").as_ptr()) > 0);
            assert!(wcscmp(w("abc").as_ptr(), w("ab").as_ptr()) > 0);
        }
    }
}
