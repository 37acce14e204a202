// Copyright 2019 Petar Dambovaliev. All rights reserved.
// This software may be modified and distributed under the terms
// of the BSD license. See the LICENSE file for details.

//! A mutex-protected command FIFO wired to a self-pipe, so a session's
//! `poll()` loop can wake on an enqueued command the same way it wakes
//! on socket readability.

use std::io;
use std::os::unix::io::RawFd;
use std::sync::Mutex;

use crate::error::{Error, Result};

struct Inner<T> {
    items: Vec<T>,
    closed: bool,
}

/// FIFO command queue. `put` from any thread, `get_all` from the owning
/// session thread; the read end of the pipe becomes readable exactly when
/// the queue holds at least one item.
pub struct CommandQueue<T> {
    inner: Mutex<Inner<T>>,
    read_fd: RawFd,
    write_fd: RawFd,
}

impl<T> CommandQueue<T> {
    pub fn new() -> io::Result<CommandQueue<T>> {
        let mut fds = [0 as RawFd; 2];
        let rc = unsafe { libc::pipe2(fds.as_mut_ptr(), libc::O_NONBLOCK | libc::O_CLOEXEC) };
        if rc != 0 {
            return Err(io::Error::last_os_error());
        }
        Ok(CommandQueue {
            inner: Mutex::new(Inner { items: Vec::new(), closed: false }),
            read_fd: fds[0],
            write_fd: fds[1],
        })
    }

    /// The fd to hand to `poll()`; readable means `get_all` has work to do.
    pub fn wake_fd(&self) -> RawFd {
        self.read_fd
    }

    pub fn put(&self, item: T) -> Result<()> {
        let mut inner = self.inner.lock().unwrap();
        if inner.closed {
            return Err(Error::QueueClosed);
        }
        let was_empty = inner.items.is_empty();
        inner.items.push(item);
        if was_empty {
            self.signal()?;
        }
        Ok(())
    }

    /// Drain every pending item. Clears the wake pipe if anything was queued.
    pub fn get_all(&self) -> Vec<T> {
        let mut inner = self.inner.lock().unwrap();
        let items = std::mem::take(&mut inner.items);
        if !items.is_empty() {
            self.clear();
        }
        items
    }

    pub fn close(&self) {
        let mut inner = self.inner.lock().unwrap();
        inner.closed = true;
    }

    fn signal(&self) -> Result<()> {
        let byte: u8 = 0xF0;
        let n = unsafe { libc::write(self.write_fd, &byte as *const u8 as *const _, 1) };
        if n < 0 {
            return Err(Error::TransportError(io::Error::last_os_error()));
        }
        Ok(())
    }

    fn clear(&self) {
        let mut buf = [0u8; 64];
        loop {
            let n = unsafe { libc::read(self.read_fd, buf.as_mut_ptr() as *mut _, buf.len()) };
            if n <= 0 {
                break;
            }
        }
    }
}

impl<T> Drop for CommandQueue<T> {
    fn drop(&mut self) {
        unsafe {
            libc::close(self.read_fd);
            libc::close(self.write_fd);
        }
    }
}

unsafe impl<T: Send> Sync for CommandQueue<T> {}
unsafe impl<T: Send> Send for CommandQueue<T> {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn put_then_get_all_returns_in_order() {
        let q: CommandQueue<u32> = CommandQueue::new().unwrap();
        q.put(1).unwrap();
        q.put(2).unwrap();
        assert_eq!(q.get_all(), vec![1, 2]);
        assert!(q.get_all().is_empty());
    }

    #[test]
    fn put_after_close_is_rejected() {
        let q: CommandQueue<u32> = CommandQueue::new().unwrap();
        q.close();
        match q.put(1) {
            Err(Error::QueueClosed) => {}
            other => panic!("expected QueueClosed, got {:?}", other),
        }
    }

    #[test]
    fn wake_fd_is_readable_after_put() {
        let q: CommandQueue<u32> = CommandQueue::new().unwrap();
        q.put(7).unwrap();
        let mut pfd = libc::pollfd { fd: q.wake_fd(), events: libc::POLLIN, revents: 0 };
        let rc = unsafe { libc::poll(&mut pfd, 1, 0) };
        assert_eq!(rc, 1);
        assert_ne!(pfd.revents & libc::POLLIN, 0);
        q.get_all();
    }
}
