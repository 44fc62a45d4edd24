//! Pseudo-terminal wrapper for Unix
//!
//! Spawns a shell attached to the slave side of a fresh pty pair and keeps
//! three descriptors duplicated from the master side: a blocking input channel
//! for keystrokes and two output channels that are only read after a
//! zero-timeout `poll`, so reading never stalls the event loop.

use std::fs::File;
use std::io::{self, Read, Write};
use std::os::fd::{AsRawFd, FromRawFd, OwnedFd, RawFd};
use std::os::unix::process::CommandExt;
use std::process::{Child, Command, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use thiserror::Error;
use tracing::{debug, error, info};

#[derive(Error, Debug)]
pub enum PtyError {
    #[error("Failed to open pseudo terminal: {0}")]
    Open(#[source] io::Error),

    #[error("Failed to duplicate pty descriptor: {0}")]
    Duplicate(#[source] io::Error),

    #[error("Failed to spawn process '{shell}': {source}")]
    ProcessSpawn {
        shell: String,
        #[source]
        source: io::Error,
    },

    #[error("Failed to resize pseudo terminal: {0}")]
    Resize(#[source] io::Error),

    #[error("Failed to write to PTY: {0}")]
    Write(#[source] io::Error),
}

pub type Result<T> = std::result::Result<T, PtyError>;

/// Output channel selector
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Channel {
    Primary,
    Secondary,
}

/// A child process driven through a terminal
pub trait ShellProcess {
    /// Decoded text currently available on `channel`, or an empty string.
    fn read(&mut self, channel: Channel, max_bytes: usize) -> String;

    /// Forward input bytes to the child.
    fn send(&mut self, data: &[u8]) -> Result<()>;

    /// Update the terminal size and notify the child.
    fn resize(&mut self, cols: u16, rows: u16) -> Result<()>;

    /// Poll liveness. Once this returns false the process is gone for good.
    fn is_running(&mut self) -> bool;
}

/// Creates processes for new panes
pub trait Spawner {
    fn spawn(&self, cols: u16, rows: u16) -> Result<Box<dyn ShellProcess>>;
}

/// Platform default when neither config nor `$SHELL` name a shell
pub const DEFAULT_SHELL: &str = "/bin/sh";

/// Resolve the shell to run: explicit choice, then `$SHELL`, then the default.
pub fn resolve_shell(shell: Option<&str>) -> String {
    shell
        .map(str::to_string)
        .or_else(|| std::env::var("SHELL").ok().filter(|s| !s.is_empty()))
        .unwrap_or_else(|| DEFAULT_SHELL.to_string())
}

/// Spawns real shells on pseudo terminals
pub struct PtySpawner {
    shell: String,
}

impl PtySpawner {
    pub fn new(shell: Option<&str>) -> Self {
        Self {
            shell: resolve_shell(shell),
        }
    }
}

impl Spawner for PtySpawner {
    fn spawn(&self, cols: u16, rows: u16) -> Result<Box<dyn ShellProcess>> {
        Ok(Box::new(ProcessHandle::spawn(&self.shell, cols, rows)?))
    }
}

/// Incremental UTF-8 decoder that carries incomplete trailing bytes over to
/// the next chunk and replaces genuinely invalid bytes.
#[derive(Default)]
struct Utf8Decoder {
    pending: Vec<u8>,
}

impl Utf8Decoder {
    fn decode(&mut self, bytes: &[u8]) -> String {
        self.pending.extend_from_slice(bytes);
        let mut out = String::with_capacity(self.pending.len());
        loop {
            match std::str::from_utf8(&self.pending) {
                Ok(text) => {
                    out.push_str(text);
                    self.pending.clear();
                    break;
                }
                Err(e) => {
                    let valid = e.valid_up_to();
                    out.push_str(&String::from_utf8_lossy(&self.pending[..valid]));
                    match e.error_len() {
                        Some(len) => {
                            out.push(char::REPLACEMENT_CHARACTER);
                            self.pending.drain(..valid + len);
                        }
                        None => {
                            self.pending.drain(..valid);
                            break;
                        }
                    }
                }
            }
        }
        out
    }
}

fn winsize(cols: u16, rows: u16) -> libc::winsize {
    libc::winsize {
        ws_row: rows,
        ws_col: cols,
        ws_xpixel: 0,
        ws_ypixel: 0,
    }
}

/// True when `fd` has data (or a hangup) ready right now.
fn poll_readable(fd: RawFd) -> bool {
    let mut pfd = libc::pollfd {
        fd,
        events: libc::POLLIN,
        revents: 0,
    };
    let ready = unsafe { libc::poll(&mut pfd, 1, 0) };
    ready > 0 && pfd.revents & (libc::POLLIN | libc::POLLHUP) != 0
}

/// Runs in the child between fork and exec: leave the inherited controlling
/// terminal, adopt the pty slave (already on stdin) and check that worked.
fn attach_controlling_tty() -> io::Result<()> {
    const DEV_TTY: &[u8] = b"/dev/tty\0";
    unsafe {
        if libc::setsid() < 0 {
            return Err(io::Error::last_os_error());
        }
        // Detached: /dev/tty must not be openable any more
        let fd = libc::open(DEV_TTY.as_ptr().cast(), libc::O_RDWR | libc::O_NOCTTY);
        if fd >= 0 {
            libc::close(fd);
            return Err(io::Error::from_raw_os_error(libc::EPERM));
        }
        if libc::ioctl(0, libc::TIOCSCTTY as _, 0) < 0 {
            return Err(io::Error::last_os_error());
        }
        let fd = libc::open(DEV_TTY.as_ptr().cast(), libc::O_WRONLY);
        if fd < 0 {
            return Err(io::Error::last_os_error());
        }
        libc::close(fd);
    }
    Ok(())
}

/// One shell process on a pseudo terminal
pub struct ProcessHandle {
    child: Child,
    input: File,
    primary: File,
    secondary: File,
    decoders: [Utf8Decoder; 2],
    running: bool,
}

impl ProcessHandle {
    /// Open a pty pair sized `cols`x`rows` and start `shell` on it.
    pub fn spawn(shell: &str, cols: u16, rows: u16) -> Result<Self> {
        let (master, slave) = Self::open_pair(cols, rows)?;

        let slave = File::from(slave);
        let stdio = |file: &File| -> Result<Stdio> {
            Ok(Stdio::from(file.try_clone().map_err(PtyError::Duplicate)?))
        };

        let mut command = Command::new(shell);
        command
            .stdin(stdio(&slave)?)
            .stdout(stdio(&slave)?)
            .stderr(stdio(&slave)?)
            .env("TERM", "xterm")
            .env("SPLITTERM", "1");
        unsafe {
            command.pre_exec(attach_controlling_tty);
        }
        let child = command.spawn().map_err(|source| PtyError::ProcessSpawn {
            shell: shell.to_string(),
            source,
        })?;
        // The child holds its own copies of the slave now
        drop(command);
        drop(slave);

        let master = File::from(master);
        let input = master.try_clone().map_err(PtyError::Duplicate)?;
        let primary = master.try_clone().map_err(PtyError::Duplicate)?;
        let secondary = master.try_clone().map_err(PtyError::Duplicate)?;

        info!(pid = child.id(), shell, cols, rows, "Spawned shell");

        Ok(Self {
            child,
            input,
            primary,
            secondary,
            decoders: [Utf8Decoder::default(), Utf8Decoder::default()],
            running: true,
        })
    }

    fn open_pair(cols: u16, rows: u16) -> Result<(OwnedFd, OwnedFd)> {
        let mut master: RawFd = -1;
        let mut slave: RawFd = -1;
        let mut size = winsize(cols, rows);
        let rc = unsafe {
            libc::openpty(
                &mut master,
                &mut slave,
                std::ptr::null_mut(),
                std::ptr::null_mut(),
                &mut size,
            )
        };
        if rc != 0 {
            return Err(PtyError::Open(io::Error::last_os_error()));
        }
        let (master, slave) = unsafe { (OwnedFd::from_raw_fd(master), OwnedFd::from_raw_fd(slave)) };
        for fd in [&master, &slave] {
            if unsafe { libc::fcntl(fd.as_raw_fd(), libc::F_SETFD, libc::FD_CLOEXEC) } < 0 {
                return Err(PtyError::Open(io::Error::last_os_error()));
            }
        }
        Ok((master, slave))
    }
}

impl ShellProcess for ProcessHandle {
    fn read(&mut self, channel: Channel, max_bytes: usize) -> String {
        let (file, decoder) = match channel {
            Channel::Primary => (&mut self.primary, &mut self.decoders[0]),
            Channel::Secondary => (&mut self.secondary, &mut self.decoders[1]),
        };
        if !poll_readable(file.as_raw_fd()) {
            return String::new();
        }
        let mut buf = vec![0u8; max_bytes.max(1)];
        match file.read(&mut buf) {
            Ok(n) => decoder.decode(&buf[..n]),
            // EIO once the slave side is closed; liveness polling handles it
            Err(e) => {
                debug!(error = %e, ?channel, "pty read returned nothing");
                String::new()
            }
        }
    }

    fn send(&mut self, data: &[u8]) -> Result<()> {
        self.input.write_all(data).map_err(PtyError::Write)?;
        self.input.flush().map_err(PtyError::Write)
    }

    fn resize(&mut self, cols: u16, rows: u16) -> Result<()> {
        let size = winsize(cols, rows);
        let rc = unsafe { libc::ioctl(self.primary.as_raw_fd(), libc::TIOCSWINSZ as _, &size) };
        if rc < 0 {
            return Err(PtyError::Resize(io::Error::last_os_error()));
        }
        if unsafe { libc::kill(self.child.id() as libc::pid_t, libc::SIGWINCH) } < 0 {
            return Err(PtyError::Resize(io::Error::last_os_error()));
        }
        debug!(pid = self.child.id(), cols, rows, "Resized pty");
        Ok(())
    }

    fn is_running(&mut self) -> bool {
        if !self.running {
            return false;
        }
        match self.child.try_wait() {
            Ok(None) => true,
            Ok(Some(status)) => {
                info!(pid = self.child.id(), %status, "Shell exited");
                self.running = false;
                false
            }
            Err(e) => {
                error!(pid = self.child.id(), error = %e, "Failed to poll shell status");
                self.running = false;
                false
            }
        }
    }
}

/// How long a hung-up shell gets to exit before it is killed outright
const REAP_TIMEOUT: Duration = Duration::from_millis(100);

impl Drop for ProcessHandle {
    fn drop(&mut self) {
        if !self.running {
            return;
        }
        let pid = self.child.id();
        unsafe {
            libc::kill(pid as libc::pid_t, libc::SIGHUP);
        }
        let deadline = Instant::now() + REAP_TIMEOUT;
        while Instant::now() < deadline {
            match self.child.try_wait() {
                Ok(None) => thread::sleep(Duration::from_millis(5)),
                Ok(Some(_)) | Err(_) => return,
            }
        }
        debug!(pid, "Shell still running after SIGHUP, killing it");
        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}
