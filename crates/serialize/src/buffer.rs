//! Reusable scratch buffers.
//!
//! Codecs that stage bytes before writing them rent a [`PooledBuffer`]; the
//! buffer goes back to the pool of the renting thread when the guard drops,
//! whether the codec finished or bailed out with an error.

use std::{
    cell::RefCell,
    ops::{Deref, DerefMut},
};

use thread_local::ThreadLocal;

/// Buffers that grew beyond this capacity are freed instead of pooled.
pub const MAX_RETAINED_CAPACITY: usize = 1 << 20;

/// At most this many idle buffers are kept per thread.
const MAX_IDLE_PER_THREAD: usize = 16;

static SHARED: BufferPool = BufferPool::new();

/// A per-thread pool of byte buffers.
#[derive(Debug)]
pub struct BufferPool {
    pool: ThreadLocal<RefCell<Vec<Vec<u8>>>>,
}

impl BufferPool {
    /// Creates an empty pool.
    #[must_use]
    pub const fn new() -> Self { Self { pool: ThreadLocal::new() } }

    /// The process-wide pool used by [`PooledBuffer::rent`].
    #[must_use]
    pub fn shared() -> &'static Self { &SHARED }

    /// Takes an empty buffer from the calling thread's pool.
    pub fn rent(&self) -> PooledBuffer<'_> {
        PooledBuffer { pool: self, buffer: self.get_buffer() }
    }

    fn get_buffer(&self) -> Vec<u8> {
        let cell = self.pool.get_or(|| RefCell::new(Vec::new()));

        cell.borrow_mut().pop().unwrap_or_default()
    }

    fn return_buffer(&self, mut buffer: Vec<u8>) {
        if buffer.capacity() > MAX_RETAINED_CAPACITY {
            return;
        }

        // keep the allocation, drop the content
        buffer.clear();

        let cell = self.pool.get_or(|| RefCell::new(Vec::new()));
        let mut idle = cell.borrow_mut();
        if idle.len() < MAX_IDLE_PER_THREAD {
            idle.push(buffer);
        }
    }

    /// The number of idle buffers in the calling thread's pool.
    #[must_use]
    pub fn idle_count(&self) -> usize {
        self.pool.get().map_or(0, |cell| cell.borrow().len())
    }
}

impl Default for BufferPool {
    fn default() -> Self { Self::new() }
}

/// A buffer on loan from a [`BufferPool`].
///
/// Dereferences to the underlying `Vec<u8>`, which is always empty when
/// rented.
#[derive(Debug)]
pub struct PooledBuffer<'p> {
    pool: &'p BufferPool,
    buffer: Vec<u8>,
}

impl PooledBuffer<'static> {
    /// Rents a buffer from the shared pool.
    #[must_use]
    pub fn rent() -> Self { SHARED.rent() }
}

impl Deref for PooledBuffer<'_> {
    type Target = Vec<u8>;

    fn deref(&self) -> &Self::Target { &self.buffer }
}

impl DerefMut for PooledBuffer<'_> {
    fn deref_mut(&mut self) -> &mut Self::Target { &mut self.buffer }
}

impl Drop for PooledBuffer<'_> {
    fn drop(&mut self) {
        self.pool.return_buffer(std::mem::take(&mut self.buffer));
    }
}
