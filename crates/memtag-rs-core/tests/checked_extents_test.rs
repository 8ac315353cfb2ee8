//! Exact backend-visible behavior of the checked layer and the tagger,
//! observed through an injected recording backend.
//!
//! The recorder keeps identity translation (so the host allocator still
//! works underneath) while logging every request and tracking live tags,
//! which lets a second deallocation of the same tag come back null the way
//! a real backend would refuse it.

use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, OnceLock};

use memtag_rs_core::alloc::tagger;
use memtag_rs_core::checked;
use memtag_rs_core::string::wide::WideChar;
use memtag_rs_oracle::action::{Action, CheckState};
use memtag_rs_oracle::transport::{self, Backend};

struct RecordingBackend {
    events: Mutex<Vec<(Action, usize, usize)>>,
    live: Mutex<HashSet<usize>>,
    state: AtomicUsize,
}

impl RecordingBackend {
    fn new() -> Self {
        Self {
            events: Mutex::new(Vec::new()),
            live: Mutex::new(HashSet::new()),
            state: AtomicUsize::new(CheckState::Enabled as usize),
        }
    }

    fn clear(&self) {
        self.events.lock().unwrap().clear();
    }

    fn events(&self) -> Vec<(Action, usize, usize)> {
        self.events.lock().unwrap().clone()
    }

    fn loads(&self) -> Vec<(usize, usize)> {
        self.events()
            .into_iter()
            .filter(|(a, _, _)| *a == Action::CheckLoad)
            .map(|(_, p, l)| (p, l))
            .collect()
    }

    fn stores(&self) -> Vec<(usize, usize)> {
        self.events()
            .into_iter()
            .filter(|(a, _, _)| *a == Action::CheckStore)
            .map(|(_, p, l)| (p, l))
            .collect()
    }
}

impl Backend for RecordingBackend {
    fn call(&self, action: Action, operand0: usize, operand1: usize) -> usize {
        self.events.lock().unwrap().push((action, operand0, operand1));
        match action {
            Action::Alloc => {
                self.live.lock().unwrap().insert(operand0);
                operand0
            }
            Action::Dealloc => {
                if self.live.lock().unwrap().remove(&operand0) {
                    operand0
                } else {
                    0
                }
            }
            Action::Untag | Action::CheckLoad | Action::CheckStore => operand0,
            Action::SwapState => self.state.swap(operand0, Ordering::AcqRel),
            Action::Debug => 0,
        }
    }
}

static TEST_LOCK: Mutex<()> = Mutex::new(());

fn recorder() -> &'static RecordingBackend {
    static RECORDER: OnceLock<&'static RecordingBackend> = OnceLock::new();
    RECORDER.get_or_init(|| {
        // Resolve the host allocator before any requests are recorded.
        unsafe {
            let warmup = tagger::malloc(1);
            tagger::free(warmup);
        }
        let backend: &'static RecordingBackend = Box::leak(Box::new(RecordingBackend::new()));
        transport::set_backend_for_tests(backend);
        backend
    })
}

#[test]
fn strcmp_checks_each_operand_once_with_terminator() {
    let _serial = TEST_LOCK.lock().unwrap();
    let rec = recorder();
    rec.clear();

    let a = b"hello\0";
    let b = b"worlds!\0";
    let ret = unsafe { checked::str::strcmp(a.as_ptr().cast(), b.as_ptr().cast()) };
    assert!(ret < 0);

    let loads = rec.loads();
    assert_eq!(
        loads,
        vec![(a.as_ptr() as usize, 6), (b.as_ptr() as usize, 8)]
    );
    assert!(rec.stores().is_empty());

    // The whole window runs with checking swapped off and restored.
    let events = rec.events();
    assert_eq!(
        events.first(),
        Some(&(Action::SwapState, CheckState::Disabled as usize, 0))
    );
    assert_eq!(
        events.last(),
        Some(&(Action::SwapState, CheckState::Enabled as usize, 0))
    );
}

#[test]
fn memchr_extent_is_narrow_on_hit_and_full_on_miss() {
    let _serial = TEST_LOCK.lock().unwrap();
    let rec = recorder();

    let buf = b"abcdef";

    rec.clear();
    let hit = unsafe { checked::mem::memchr(buf.as_ptr().cast(), i32::from(b'c'), buf.len()) };
    assert_eq!(hit as usize, buf.as_ptr() as usize + 2);
    assert_eq!(rec.loads(), vec![(buf.as_ptr() as usize, 3)]);

    rec.clear();
    let miss = unsafe { checked::mem::memchr(buf.as_ptr().cast(), i32::from(b'z'), buf.len()) };
    assert!(miss.is_null());
    assert_eq!(rec.loads(), vec![(buf.as_ptr() as usize, 6)]);
}

#[test]
fn memcpy_validates_the_read_before_the_write() {
    let _serial = TEST_LOCK.lock().unwrap();
    let rec = recorder();
    rec.clear();

    let src = [0xAAu8; 32];
    let mut dst = [0u8; 32];
    unsafe { checked::mem::memcpy(dst.as_mut_ptr().cast(), src.as_ptr().cast(), 32) };
    assert_eq!(dst, src);

    let events: Vec<Action> = rec.events().into_iter().map(|(a, _, _)| a).collect();
    let load_at = events.iter().position(|a| *a == Action::CheckLoad).unwrap();
    let store_at = events.iter().position(|a| *a == Action::CheckStore).unwrap();
    assert!(load_at < store_at);
    assert_eq!(rec.loads(), vec![(src.as_ptr() as usize, 32)]);
    assert_eq!(rec.stores(), vec![(dst.as_ptr() as usize, 32)]);
}

#[test]
fn strncpy_validates_only_what_it_reads() {
    let _serial = TEST_LOCK.lock().unwrap();
    let rec = recorder();

    // Short source: the terminator is part of the read, the store is the
    // full padded width.
    rec.clear();
    let src = b"abc\0";
    let mut dst = [0x7Fu8; 8];
    unsafe { checked::str::strncpy(dst.as_mut_ptr().cast(), src.as_ptr().cast(), 8) };
    assert_eq!(&dst, b"abc\0\0\0\0\0");
    assert_eq!(rec.loads(), vec![(src.as_ptr() as usize, 4)]);
    assert_eq!(rec.stores(), vec![(dst.as_mut_ptr() as usize, 8)]);

    // Long source: everything is capped at n.
    rec.clear();
    let long_src = b"abcdefgh\0";
    let mut small = [0u8; 4];
    unsafe { checked::str::strncpy(small.as_mut_ptr().cast(), long_src.as_ptr().cast(), 4) };
    assert_eq!(&small, b"abcd");
    assert_eq!(rec.loads(), vec![(long_src.as_ptr() as usize, 4)]);
    assert_eq!(rec.stores(), vec![(small.as_mut_ptr() as usize, 4)]);
}

#[test]
fn strcat_validates_both_strings_and_the_appended_tail() {
    let _serial = TEST_LOCK.lock().unwrap();
    let rec = recorder();
    rec.clear();

    let mut dst = [0u8; 16];
    dst[..5].copy_from_slice(b"front");
    let src = b"tail\0";
    unsafe { checked::str::strcat(dst.as_mut_ptr().cast(), src.as_ptr().cast()) };
    assert_eq!(&dst[..10], b"fronttail\0");

    assert_eq!(
        rec.loads(),
        vec![(src.as_ptr() as usize, 5), (dst.as_ptr() as usize, 6)]
    );
    assert_eq!(rec.stores(), vec![(dst.as_ptr() as usize + 5, 5)]);
}

#[test]
fn wcslen_extent_counts_bytes_not_elements() {
    let _serial = TEST_LOCK.lock().unwrap();
    let rec = recorder();
    rec.clear();

    let wide: Vec<WideChar> = "wide".chars().map(|c| c as WideChar).chain([0]).collect();
    let len = unsafe { checked::wide::wcslen(wide.as_ptr()) };
    assert_eq!(len, 4);
    let elem = std::mem::size_of::<WideChar>();
    assert_eq!(rec.loads(), vec![(wide.as_ptr() as usize, 5 * elem)]);
}

#[test]
fn malloc_registers_the_requested_extent() {
    let _serial = TEST_LOCK.lock().unwrap();
    let rec = recorder();
    rec.clear();

    let p = unsafe { tagger::malloc(89) };
    assert!(!p.is_null());

    let allocs: Vec<(usize, usize)> = rec
        .events()
        .into_iter()
        .filter(|(a, _, _)| *a == Action::Alloc)
        .map(|(_, s, e)| (s, e))
        .collect();
    assert_eq!(allocs.len(), 1);
    let (start, end) = allocs[0];
    assert_eq!(start, p as usize);
    // 89 requested bytes registered; the granule-rounded raw block keeps
    // its extra seven bytes unregistered.
    assert_eq!(end - start, 89);

    unsafe { tagger::free(p) };
}

#[test]
fn double_free_stops_at_the_backend_refusal() {
    let _serial = TEST_LOCK.lock().unwrap();
    let rec = recorder();
    rec.clear();

    let p = unsafe { tagger::malloc(24) };
    assert!(!p.is_null());
    unsafe {
        tagger::free(p);
        // The second release is refused by the backend (null translation)
        // and must not reach the host allocator.
        tagger::free(p);
    }

    let deallocs = rec
        .events()
        .into_iter()
        .filter(|(a, _, _)| *a == Action::Dealloc)
        .count();
    assert_eq!(deallocs, 2);
}

#[test]
fn strdup_duplicates_through_the_tagger() {
    let _serial = TEST_LOCK.lock().unwrap();
    let rec = recorder();
    rec.clear();

    let s = b"duplicate me\0";
    let dup = unsafe { checked::str::strdup(s.as_ptr().cast()) };
    assert!(!dup.is_null());
    unsafe {
        for (i, &expect) in s.iter().enumerate() {
            assert_eq!(*dup.cast::<u8>().add(i), expect);
        }
    }

    // The duplicate is a registered allocation of len + 1 bytes.
    let allocs: Vec<(usize, usize)> = rec
        .events()
        .into_iter()
        .filter(|(a, _, _)| *a == Action::Alloc)
        .map(|(_, a, b)| (a, b))
        .collect();
    assert_eq!(allocs.len(), 1);
    assert_eq!(allocs[0].1 - allocs[0].0, s.len());

    unsafe { tagger::free(dup.cast()) };
}
