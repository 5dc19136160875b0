/*!
 * Argument and Environment Marshaling
 *
 * Builds the NULL-terminated `char*` arrays exec expects. Every
 * allocation is fallible and owned by the array, so an error at any step
 * releases whatever was already built.
 */

use crate::core::errors::{SystemError, SystemResult};
use crate::core::types::EnvMap;
use std::ffi::{c_char, CStr, CString};
use std::mem::size_of;

/// Owned C strings plus the NULL-terminated pointer array over them
#[derive(Debug)]
pub struct CStringArray {
    strings: Vec<CString>,
    pointers: Vec<*const c_char>,
}

impl CStringArray {
    /// `argv`: the program path followed by each parameter, in order
    pub fn arguments<S: AsRef<str>>(program: &str, params: &[S]) -> SystemResult<Self> {
        let mut strings = try_vec(params.len() + 1)?;
        strings.push(c_string(&[program.as_bytes()])?);
        for param in params {
            strings.push(c_string(&[param.as_ref().as_bytes()])?);
        }
        Self::terminate(strings)
    }

    /// `envp`: one `KEY=VALUE` entry per variable
    pub fn environment(env: &EnvMap) -> SystemResult<Self> {
        let mut strings = try_vec(env.len())?;
        for (key, value) in env {
            if key.is_empty() || key.contains('=') {
                return Err(SystemError::InvalidString(key.clone()));
            }
            strings.push(c_string(&[key.as_bytes(), b"=", value.as_bytes()])?);
        }
        Self::terminate(strings)
    }

    fn terminate(strings: Vec<CString>) -> SystemResult<Self> {
        let mut pointers = try_vec(strings.len() + 1)?;
        for s in &strings {
            pointers.push(s.as_ptr());
        }
        pointers.push(std::ptr::null());
        Ok(Self { strings, pointers })
    }

    /// Pointer to the NULL-terminated array, valid while `self` lives
    pub fn as_ptr(&self) -> *const *const c_char {
        self.pointers.as_ptr()
    }

    /// Pointer to the first string (the program path for `argv`)
    pub fn first_ptr(&self) -> *const c_char {
        self.pointers[0]
    }

    /// Number of entries, not counting the terminating NULL
    pub fn len(&self) -> usize {
        self.strings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.strings.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &CStr> + '_ {
        self.strings.iter().map(|s| s.as_c_str())
    }
}

fn try_vec<T>(capacity: usize) -> SystemResult<Vec<T>> {
    let mut v = Vec::new();
    v.try_reserve_exact(capacity)
        .map_err(|_| SystemError::AllocationFailed {
            bytes: capacity.saturating_mul(size_of::<T>()),
        })?;
    Ok(v)
}

fn c_string(parts: &[&[u8]]) -> SystemResult<CString> {
    if parts.iter().any(|p| p.contains(&0)) {
        let joined: Vec<u8> = parts.concat();
        return Err(SystemError::InvalidString(
            String::from_utf8_lossy(&joined).into_owned(),
        ));
    }

    let len = parts.iter().map(|p| p.len()).sum::<usize>() + 1;
    let mut bytes = try_vec::<u8>(len)?;
    for part in parts {
        bytes.extend_from_slice(part);
    }
    bytes.push(0);

    CString::from_vec_with_nul(bytes)
        .map_err(|e| SystemError::InvalidString(String::from_utf8_lossy(e.as_bytes()).into_owned()))
}
