/*!
 * Memory-Mapped Files
 * A byte range of a file made addressable in-process
 */

use crate::core::errors::{SystemError, SystemResult};
use crate::core::guard::{Guard, GuardDrop};
use crate::fs::{Descriptor, File};
use nix::sys::mman::{mmap, munmap, MapFlags, ProtFlags};
use nix::sys::stat::Mode;
use nix::unistd::{sysconf, SysconfVar};
use std::ffi::c_void;
use std::num::NonZeroUsize;
use std::path::PathBuf;
use std::ptr::NonNull;
use tracing::{debug, warn};

const FALLBACK_PAGE_SIZE: usize = 4096;

/// Platform page size
pub fn page_size() -> usize {
    match sysconf(SysconfVar::PAGE_SIZE) {
        Ok(Some(size)) if size > 0 => size as usize,
        _ => FALLBACK_PAGE_SIZE,
    }
}

/// Shared mapping of `size` bytes of a file starting at `offset`
///
/// `map` opens the descriptor then maps; `unmap` unmaps then closes. A
/// value dropped while still mapped unmaps and closes without raising.
#[derive(Debug)]
pub struct MapFile {
    file: File,
    size: usize,
    offset: usize,
    readable: bool,
    writable: bool,
    permissions: Mode,
    address: Option<NonNull<c_void>>,
    descriptor: Option<Descriptor>,
    mapped: bool,
}

impl MapFile {
    /// Describe a mapping; nothing is opened yet
    ///
    /// # Panics
    ///
    /// When neither `readable` nor `writable` is set, or when `size` or
    /// `offset` is not a multiple of the page size.
    pub fn new(
        path: impl Into<PathBuf>,
        size: usize,
        offset: usize,
        readable: bool,
        writable: bool,
        permissions: Mode,
    ) -> Self {
        assert!(readable || writable, "a mapping must be readable or writable");
        let page = page_size();
        assert_eq!(size % page, 0, "map size must be a multiple of {page}");
        assert_eq!(offset % page, 0, "map offset must be a multiple of {page}");

        Self {
            file: File::new(path),
            size,
            offset,
            readable,
            writable,
            permissions,
            address: None,
            descriptor: None,
            mapped: false,
        }
    }

    pub fn file(&self) -> &File {
        &self.file
    }

    /// Open the backing descriptor and map it
    pub fn map(&mut self) -> SystemResult<()> {
        debug_assert!(!self.mapped, "{} is already mapped", self.file);
        self.open_fd()?;
        self.map_mem()
    }

    /// Unmap, then close the backing descriptor
    pub fn unmap(&mut self) -> SystemResult<()> {
        self.unmap_mem()?;
        self.close_fd()
    }

    /// Fill the backing file with zeros over `offset + size` bytes
    ///
    /// Used to give a new file its full length before mapping it writable.
    pub fn zero(&self) -> SystemResult<()> {
        assert!(self.writable, "only writable maps can be zeroed");
        let mut fd = Descriptor::open(&self.file, Descriptor::flags(false, true), self.permissions)?;
        let page = page_size();
        let pages = (self.size + self.offset) / page;
        let buffer = vec![0u8; page];
        for _ in 0..pages {
            fd.write_all(&buffer)?;
        }
        fd.close()
    }

    /// Start of the mapping, `None` until mapped
    pub fn address(&self) -> Option<NonNull<c_void>> {
        self.address
    }

    pub fn memory_size(&self) -> usize {
        self.size
    }

    pub fn offset(&self) -> usize {
        self.offset
    }

    pub fn is_mapped(&self) -> bool {
        self.mapped
    }

    pub fn is_loaded(&self) -> bool {
        self.address.is_some()
    }

    pub fn descriptor(&self) -> Option<&Descriptor> {
        self.descriptor.as_ref()
    }

    /// Mapped bytes, when mapped readable
    pub fn as_slice(&self) -> Option<&[u8]> {
        match self.address {
            Some(addr) if self.mapped && self.readable => {
                // SAFETY: the mapping covers `size` bytes and lives until
                // unmap, which needs `&mut self`
                Some(unsafe { std::slice::from_raw_parts(addr.as_ptr().cast::<u8>(), self.size) })
            }
            _ => None,
        }
    }

    /// Mapped bytes, when mapped writable
    pub fn as_mut_slice(&mut self) -> Option<&mut [u8]> {
        match self.address {
            Some(addr) if self.mapped && self.writable => {
                // SAFETY: as above; the exclusive borrow of self makes this
                // the only in-process view
                Some(unsafe {
                    std::slice::from_raw_parts_mut(addr.as_ptr().cast::<u8>(), self.size)
                })
            }
            _ => None,
        }
    }

    fn open_fd(&mut self) -> SystemResult<()> {
        let flags = Descriptor::flags(self.readable, self.writable);
        self.descriptor = Some(Descriptor::open(&self.file, flags, self.permissions)?);
        Ok(())
    }

    fn close_fd(&mut self) -> SystemResult<()> {
        match self.descriptor.take() {
            Some(mut descriptor) => descriptor.close(),
            None => Ok(()),
        }
    }

    fn map_mem(&mut self) -> SystemResult<()> {
        let context = format!("on file {}", self.file);
        let fd = self
            .descriptor
            .as_ref()
            .and_then(|d| d.as_fd())
            .ok_or_else(|| SystemError::os_call("mmap", context.clone(), nix::errno::Errno::EBADF))?;

        let length = NonZeroUsize::new(self.size)
            .ok_or_else(|| SystemError::os_call("mmap", context.clone(), nix::errno::Errno::EINVAL))?;

        let mut prot = ProtFlags::empty();
        if self.readable {
            prot |= ProtFlags::PROT_READ;
        }
        if self.writable {
            prot |= ProtFlags::PROT_WRITE;
        }

        // SAFETY: no address hint; the kernel picks a fresh range so no
        // existing Rust object is aliased
        let result = unsafe {
            mmap(
                None,
                length,
                prot,
                MapFlags::MAP_SHARED,
                fd,
                self.offset as libc::off_t,
            )
        };

        match result {
            Ok(address) => {
                self.address = Some(address);
                self.mapped = true;
                debug!(path = %self.file, size = self.size, "file mapped");
                Ok(())
            }
            Err(errno) => {
                self.mapped = false;
                Err(SystemError::os_call("mmap", context, errno))
            }
        }
    }

    fn unmap_mem(&mut self) -> SystemResult<()> {
        let Some(address) = self.address else {
            return Ok(());
        };

        // SAFETY: address/size are exactly what mmap returned; slices handed
        // out borrow self and cannot outlive this call
        match unsafe { munmap(address, self.size) } {
            Ok(()) => {
                self.address = None;
                self.mapped = false;
                debug!(path = %self.file, "file unmapped");
                Ok(())
            }
            Err(errno) => {
                self.mapped = true;
                Err(SystemError::os_call(
                    "munmap",
                    format!("on file {}", self.file),
                    errno,
                ))
            }
        }
    }
}

impl Guard for MapFile {
    fn resource_type(&self) -> &'static str {
        "map_file"
    }

    fn is_active(&self) -> bool {
        self.address.is_some() || self.descriptor.is_some()
    }

    fn release(&mut self) -> SystemResult<()> {
        self.unmap()
    }
}

impl GuardDrop for MapFile {
    fn on_drop(&mut self) {
        if let Err(e) = self.unmap_mem() {
            warn!(
                resource = self.resource_type(),
                path = %self.file,
                error = %e,
                "unmap on drop failed"
            );
        }
        if let Some(mut descriptor) = self.descriptor.take() {
            descriptor.close_safe();
        }
    }
}

impl Drop for MapFile {
    fn drop(&mut self) {
        self.on_drop();
    }
}
