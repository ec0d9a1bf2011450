//!
//! Bump allocator over a growable linear memory.
//!
//! Addresses are byte offsets into the arena, `0` is the null address.
//! Allocations are 4 bytes aligned and never freed: the arena only grows,
//! one page at a time, until it is dropped.
//!

use bytemuck::Pod;
use std::fmt::{self, Debug};
use std::marker::PhantomData;
use std::mem;

use crate::base::{align_usize, SkinError};

/// Size of one arena page, in bytes.
pub const PAGE_SIZE: usize = 64 * 1024;

/// Bytes at the start of the arena left to the native side call frames.
pub const DEFAULT_RESERVED_BYTES: usize = 1024 * 1024;

const WORD: usize = mem::size_of::<u32>();

/// Typed view into an arena: a byte address plus a number of `T` elements.
pub struct ArenaSlice<T> {
    offset: u32,
    len: u32,
    _marker: PhantomData<T>,
}

impl<T> ArenaSlice<T> {
    #[inline]
    pub const fn new(offset: u32, len: u32) -> ArenaSlice<T> {
        ArenaSlice {
            offset,
            len,
            _marker: PhantomData,
        }
    }

    /// Byte address of the first element.
    #[inline]
    pub fn offset(&self) -> u32 {
        self.offset
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.len as usize
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    #[inline]
    pub fn is_null(&self) -> bool {
        self.offset == 0
    }

    /// Size in bytes.
    #[inline]
    pub fn size(&self) -> usize {
        self.len as usize * mem::size_of::<T>()
    }
}

impl<T> Clone for ArenaSlice<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for ArenaSlice<T> {}

impl<T> PartialEq for ArenaSlice<T> {
    fn eq(&self, other: &Self) -> bool {
        self.offset == other.offset && self.len == other.len
    }
}

impl<T> Debug for ArenaSlice<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ArenaSlice")
            .field("type", &std::any::type_name::<T>())
            .field("offset", &self.offset)
            .field("len", &self.len)
            .finish()
    }
}

/// Linear memory with a bump allocation cursor.
pub struct Arena {
    words: Vec<u32>,
    top: usize,
    reserved: usize,
    page_size: usize,
}

impl Debug for Arena {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Arena")
            .field("capacity", &self.capacity())
            .field("top", &self.top)
            .field("reserved", &self.reserved)
            .field("page_size", &self.page_size)
            .finish()
    }
}

impl Default for Arena {
    fn default() -> Arena {
        Arena::new(DEFAULT_RESERVED_BYTES, 0, PAGE_SIZE)
    }
}

impl Arena {
    /// Creates an arena with `reserved` bytes never handed out, plus
    /// `initial_pages` pages of free space.
    pub fn new(reserved: usize, initial_pages: usize, page_size: usize) -> Arena {
        let page_size = if page_size >= WORD && page_size.is_power_of_two() {
            page_size
        } else {
            let fixed = page_size.max(WORD).checked_next_power_of_two().unwrap_or(PAGE_SIZE);
            log::warn!("Invalid arena page size {}, using {}", page_size, fixed);
            fixed
        };
        // Address 0 stays null even without reserved region.
        let reserved = align_usize(reserved.max(WORD), WORD);
        let capacity = align_usize(reserved + initial_pages * page_size, page_size);
        Arena {
            words: vec![0; capacity / WORD],
            top: reserved,
            reserved,
            page_size,
        }
    }

    /// Total bytes of the linear memory, reserved region included.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.words.len() * WORD
    }

    /// Next free address.
    #[inline]
    pub fn top(&self) -> usize {
        self.top
    }

    #[inline]
    pub fn reserved(&self) -> usize {
        self.reserved
    }

    /// Bytes allocated so far, the reserved region excluded.
    #[inline]
    pub fn used(&self) -> usize {
        self.top - self.reserved
    }

    /// Allocates room for `count` zeroed `T`.
    pub fn alloc<T: Pod>(&mut self, count: usize) -> Result<ArenaSlice<T>, SkinError> {
        debug_assert!(mem::align_of::<T>() <= WORD);
        let size = align_usize(count * mem::size_of::<T>(), WORD);
        let offset = self.top;
        let end = offset + size;
        if end > u32::MAX as usize || count > u32::MAX as usize {
            return Err(SkinError::ArenaOutOfBounds { offset, size });
        }

        if end > self.capacity() {
            let capacity = align_usize(end, self.page_size);
            log::debug!(
                "Arena grows from {} to {} pages",
                self.capacity() / self.page_size,
                capacity / self.page_size
            );
            self.words.resize(capacity / WORD, 0);
        }
        self.top = end;
        Ok(ArenaSlice::new(offset as u32, count as u32))
    }

    /// Allocates a copy of `values`.
    pub fn alloc_from<T: Pod>(&mut self, values: &[T]) -> Result<ArenaSlice<T>, SkinError> {
        let slice = self.alloc::<T>(values.len())?;
        self.slice_mut(slice)?.copy_from_slice(values);
        Ok(slice)
    }

    fn word_range<T>(&self, slice: ArenaSlice<T>) -> Result<std::ops::Range<usize>, SkinError> {
        let offset = slice.offset as usize;
        let size = slice.size();
        if slice.is_null() || offset < self.reserved || offset % WORD != 0 || offset + size > self.top {
            return Err(SkinError::ArenaOutOfBounds { offset, size });
        }
        Ok(offset / WORD..(offset + size) / WORD)
    }

    pub fn slice<T: Pod>(&self, slice: ArenaSlice<T>) -> Result<&[T], SkinError> {
        let range = self.word_range(slice)?;
        if slice.is_empty() {
            return Ok(&[]);
        }
        Ok(bytemuck::cast_slice(&self.words[range]))
    }

    pub fn slice_mut<T: Pod>(&mut self, slice: ArenaSlice<T>) -> Result<&mut [T], SkinError> {
        let range = self.word_range(slice)?;
        if slice.is_empty() {
            return Ok(&mut []);
        }
        Ok(bytemuck::cast_slice_mut(&mut self.words[range]))
    }

    /// Reads the `idx`th element of `slice`.
    pub fn get<T: Pod>(&self, slice: ArenaSlice<T>, idx: usize) -> Result<T, SkinError> {
        let values = self.slice(slice)?;
        values.get(idx).copied().ok_or(SkinError::ArenaOutOfBounds {
            offset: slice.offset as usize + idx * mem::size_of::<T>(),
            size: mem::size_of::<T>(),
        })
    }

    /// Reads a single `T` at `offset`.
    #[inline]
    pub fn read<T: Pod>(&self, offset: u32) -> Result<T, SkinError> {
        self.get(ArenaSlice::<T>::new(offset, 1), 0)
    }

    /// Writes `values` into `slice`, starting at element `start`.
    pub fn write<T: Pod>(&mut self, slice: ArenaSlice<T>, start: usize, values: &[T]) -> Result<(), SkinError> {
        let target = self.slice_mut(slice)?;
        match target.get_mut(start..start + values.len()) {
            Some(target) => {
                target.copy_from_slice(values);
                Ok(())
            }
            None => Err(SkinError::ArenaOutOfBounds {
                offset: slice.offset as usize + start * mem::size_of::<T>(),
                size: mem::size_of_val(values),
            }),
        }
    }
}
