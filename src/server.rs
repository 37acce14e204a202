// Copyright 2019 Petar Dambovaliev. All rights reserved.
// This software may be modified and distributed under the terms
// of the BSD license. See the LICENSE file for details.

//! TCP acceptor: binds the listening socket, spawns one session thread
//! per accepted connection, and fans STOP/RELOAD out to all of them.

use std::net::{TcpListener, ToSocketAddrs};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;

use crate::error::Result;
use crate::queue::CommandQueue;
use crate::runtime::Runtime;
use crate::session::{Session, SessionCommand};

struct SessionHandle {
    commands: Arc<CommandQueue<SessionCommand>>,
    join: JoinHandle<()>,
}

pub struct Server {
    listener: TcpListener,
    runtime: Arc<Runtime>,
    sessions: Arc<Mutex<Vec<SessionHandle>>>,
}

impl Server {
    pub fn bind(addr: impl ToSocketAddrs, runtime: Arc<Runtime>) -> Result<Server> {
        let listener = TcpListener::bind(addr)?;
        Ok(Server { listener, runtime, sessions: Arc::new(Mutex::new(Vec::new())) })
    }

    /// Accept connections until the listener errors out (e.g. the
    /// process is shutting the socket down from another thread).
    pub fn serve(&self) -> Result<()> {
        for conn in self.listener.incoming() {
            let stream = conn?;
            self.runtime.stats.sessions_accepted.fetch_add(1, std::sync::atomic::Ordering::Relaxed);

            let commands = Arc::new(CommandQueue::new()?);
            let runtime = self.runtime.clone();
            let thread_commands = commands.clone();
            let join = std::thread::spawn(move || {
                match Session::new(stream, thread_commands) {
                    Ok(mut session) => session.run(&runtime),
                    Err(e) => log::error!("failed to create session: {}", e),
                }
                runtime.stats.sessions_closed.fetch_add(1, std::sync::atomic::Ordering::Relaxed);
            });

            self.sessions.lock().unwrap().push(SessionHandle { commands, join });
        }
        Ok(())
    }

    /// Ask every live session to reload its view of the configuration.
    pub fn broadcast_reload(&self) {
        let sessions = self.sessions.lock().unwrap();
        for s in sessions.iter() {
            let _ = s.commands.put(SessionCommand::Reload);
        }
    }

    /// Ask every live session to stop and wait for its thread to exit.
    pub fn stop_all(&self) {
        let mut sessions = self.sessions.lock().unwrap();
        for s in sessions.iter() {
            let _ = s.commands.put(SessionCommand::Stop);
        }
        for s in sessions.drain(..) {
            let _ = s.join.join();
        }
    }
}
