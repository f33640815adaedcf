//! Memory allocation utilities for FFI functions.
//!
//! Everything handed to C is allocated with `malloc` so callers can release
//! it with the matching `revcast_free_*` function.

use crate::types::{ErrorCode, RevcastError};
use libc::{c_char, free, malloc};
use std::ptr;

/// Allocate and copy an array, setting error on failure.
///
/// # Safety
/// out_ptr must be a valid pointer; out_error must be valid if non-null.
/// Returns true on success, false on allocation failure.
pub unsafe fn alloc_and_copy_array<T: Copy>(
    items: &[T],
    out_ptr: *mut *mut T,
    out_error: *mut RevcastError,
) -> bool {
    if items.is_empty() {
        *out_ptr = ptr::null_mut();
        return true;
    }

    let ptr = malloc(std::mem::size_of_val(items)) as *mut T;
    if ptr.is_null() {
        if !out_error.is_null() {
            (*out_error).set_error(ErrorCode::AllocationError, "Memory allocation failed");
        }
        return false;
    }

    ptr::copy_nonoverlapping(items.as_ptr(), ptr, items.len());
    *out_ptr = ptr;
    true
}

/// Copy a string into a newly allocated null-terminated C string.
///
/// # Safety
/// Returns null on allocation failure. Interior NUL bytes truncate the string
/// on the C side.
pub unsafe fn alloc_c_string(s: &str) -> *mut c_char {
    let ptr = malloc(s.len() + 1) as *mut c_char;
    if ptr.is_null() {
        return ptr;
    }
    ptr::copy_nonoverlapping(s.as_ptr() as *const c_char, ptr, s.len());
    *ptr.add(s.len()) = 0; // Null terminator
    ptr
}

/// Free a C pointer allocated by this library.
///
/// # Safety
/// ptr must be either null or a valid pointer allocated by malloc.
#[inline]
pub unsafe fn free_ptr(ptr: *mut core::ffi::c_void) {
    if !ptr.is_null() {
        free(ptr);
    }
}

/// Macro to free multiple struct fields.
///
/// Usage:
/// ```ignore
/// free_fields!(result, field1, field2, field3);
/// ```
#[macro_export]
macro_rules! free_fields {
    ($result:expr, $($field:ident),+ $(,)?) => {{
        $(
            if !$result.$field.is_null() {
                $crate::allocation::free_ptr($result.$field as *mut core::ffi::c_void);
                $result.$field = std::ptr::null_mut();
            }
        )+
    }};
}
