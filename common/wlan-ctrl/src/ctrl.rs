//! Unix datagram control socket client
//!
//! hostapd and wpa_supplicant expose a request/response control interface on
//! a Unix datagram socket. The client binds its own socket in the temp
//! directory (the daemon replies to that path) and connects to the daemon's
//! socket. A socket that has sent `ATTACH` also receives unsolicited event
//! messages, which carry a `<level>` prefix.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio::net::UnixDatagram;
use tokio::time::timeout;
use tracing::{debug, instrument, trace, warn};

use crate::error::{CtrlError, CtrlResult};

/// Default time to wait for a control reply
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

const MAX_MESSAGE: usize = 8192;

static SOCKET_COUNTER: AtomicUsize = AtomicUsize::new(0);

/// A connected control interface socket
#[derive(Debug)]
pub struct CtrlSocket {
    socket: UnixDatagram,
    local_path: PathBuf,
    dest: PathBuf,
    timeout: Duration,
}

impl CtrlSocket {
    /// Open a control connection to the socket at `dest`
    ///
    /// Must be called from within a tokio runtime.
    pub fn open(dest: impl AsRef<Path>, request_timeout: Duration) -> CtrlResult<Self> {
        let dest = dest.as_ref().to_path_buf();
        let local_path = std::env::temp_dir().join(format!(
            "wlan_ctrl_{}-{}",
            std::process::id(),
            SOCKET_COUNTER.fetch_add(1, Ordering::Relaxed)
        ));

        // Stale path from a previous process with the same pid
        let _ = std::fs::remove_file(&local_path);

        let socket = UnixDatagram::bind(&local_path)?;
        if let Err(e) = socket.connect(&dest) {
            let _ = std::fs::remove_file(&local_path);
            return Err(e.into());
        }

        debug!(dest = %dest.display(), local = %local_path.display(), "control socket opened");

        Ok(Self {
            socket,
            local_path,
            dest,
            timeout: request_timeout,
        })
    }

    /// Send a command and wait for its reply
    ///
    /// Anything already queued is discarded first: a reply that missed an
    /// earlier request's timeout must not be taken as this one's. Unsolicited
    /// event messages that arrive in between are skipped.
    #[instrument(skip(self, command), fields(dest = %self.dest.display(), cmd = %redact(command)))]
    pub async fn request(&self, command: &str) -> CtrlResult<String> {
        let stale = self.drain();
        if stale > 0 {
            debug!(stale, "discarded queued messages before request");
        }

        self.socket.send(command.as_bytes()).await?;

        let mut buf = vec![0u8; MAX_MESSAGE];
        loop {
            let n = match timeout(self.timeout, self.socket.recv(&mut buf)).await {
                Ok(res) => res?,
                Err(_) => {
                    warn!("control request timed out");
                    return Err(CtrlError::Timeout {
                        target: self.dest.display().to_string(),
                        command: redact(command),
                        timeout: self.timeout,
                    });
                }
            };

            let msg = String::from_utf8_lossy(&buf[..n]).to_string();
            if is_event(&msg) {
                trace!(event = %msg.trim_end(), "skipping event while waiting for reply");
                continue;
            }

            trace!(reply = %msg.trim_end(), "control reply");
            return Ok(msg);
        }
    }

    /// Send a command whose reply must contain `OK`
    pub async fn request_ok(&self, command: &str) -> CtrlResult<()> {
        let reply = self.request(command).await?;
        if reply.trim_end() == "OK" {
            Ok(())
        } else {
            Err(CtrlError::CommandFailed {
                target: self.dest.display().to_string(),
                command: redact(command),
                reply: reply.trim_end().to_string(),
            })
        }
    }

    /// Register this socket as an event monitor
    pub async fn attach(&self) -> CtrlResult<()> {
        self.request_ok("ATTACH").await
    }

    /// Wait up to `wait` for the next event message
    ///
    /// Returns `None` when nothing arrives in time. The `<level>` prefix is
    /// stripped.
    pub async fn recv_event(&self, wait: Duration) -> CtrlResult<Option<String>> {
        let mut buf = vec![0u8; MAX_MESSAGE];
        match timeout(wait, self.socket.recv(&mut buf)).await {
            Ok(res) => {
                let n = res?;
                let msg = String::from_utf8_lossy(&buf[..n]);
                Ok(Some(strip_level(msg.trim_end()).to_string()))
            }
            Err(_) => Ok(None),
        }
    }

    /// Discard every message already queued on the socket
    pub fn drain(&self) -> usize {
        let mut buf = vec![0u8; MAX_MESSAGE];
        let mut count = 0;
        while let Ok(n) = self.socket.try_recv(&mut buf) {
            trace!(msg = %String::from_utf8_lossy(&buf[..n]).trim_end(), "drained");
            count += 1;
        }
        count
    }
}

impl Drop for CtrlSocket {
    fn drop(&mut self) {
        let _ = std::fs::remove_file(&self.local_path);
    }
}

/// Fields whose value is a secret; everything after them is masked
const SECRET_KEYS: &[&str] = &["psk", "password", "wpa_passphrase", "add_passphrase"];

/// Mask credentials in a command line before it is logged or put in an error
pub fn redact(command: &str) -> String {
    let mut tokens = Vec::new();
    for token in command.split(' ') {
        tokens.push(token);
        if SECRET_KEYS.contains(&token) {
            tokens.push("[REDACTED]");
            break;
        }
    }
    tokens.join(" ")
}

fn is_event(msg: &str) -> bool {
    msg.starts_with('<')
}

/// Strip the `<N>` priority prefix of an event message
pub fn strip_level(event: &str) -> &str {
    if let Some(rest) = event.strip_prefix('<') {
        if let Some(idx) = rest.find('>') {
            return &rest[idx + 1..];
        }
    }
    event
}

/// Extract `field=value` from a multi-line STATUS style reply
pub fn reply_field<'a>(reply: &'a str, field: &str) -> Option<&'a str> {
    reply.lines().find_map(|line| {
        line.split_once('=')
            .filter(|(k, _)| *k == field)
            .map(|(_, v)| v.trim())
    })
}

#[cfg(test)]
pub(crate) mod testing {
    //! In-process stand-in for a daemon control socket

    use std::path::{Path, PathBuf};
    use std::sync::{Arc, Mutex};
    use tokio::net::UnixDatagram;
    use tokio::task::JoinHandle;

    /// Answers each request with the datagrams `respond` returns, in order,
    /// and records every command it received. Datagrams starting with `<`
    /// are events and go to every peer that sent `ATTACH`.
    pub struct FakeDaemon {
        pub path: PathBuf,
        pub received: Arc<Mutex<Vec<String>>>,
        handle: JoinHandle<()>,
    }

    impl FakeDaemon {
        pub fn spawn<F>(dir: &Path, name: &str, respond: F) -> Self
        where
            F: Fn(&str) -> Vec<String> + Send + 'static,
        {
            let path = dir.join(name);
            let socket = UnixDatagram::bind(&path).unwrap();
            let received = Arc::new(Mutex::new(Vec::new()));
            let log = received.clone();

            let handle = tokio::spawn(async move {
                let mut buf = vec![0u8; 4096];
                let mut attached: Vec<PathBuf> = Vec::new();
                loop {
                    let Ok((n, peer)) = socket.recv_from(&mut buf).await else {
                        break;
                    };
                    let cmd = String::from_utf8_lossy(&buf[..n]).to_string();
                    log.lock().unwrap().push(cmd.clone());
                    let Some(peer) = peer.as_pathname().map(|p| p.to_path_buf()) else {
                        continue;
                    };
                    if cmd == "ATTACH" {
                        attached.push(peer.clone());
                    }
                    for msg in respond(&cmd) {
                        if msg.starts_with('<') {
                            for monitor in &attached {
                                let _ = socket.send_to(msg.as_bytes(), monitor).await;
                            }
                        } else {
                            let _ = socket.send_to(msg.as_bytes(), &peer).await;
                        }
                    }
                }
            });

            Self {
                path,
                received,
                handle,
            }
        }

        pub fn commands(&self) -> Vec<String> {
            self.received.lock().unwrap().clone()
        }
    }

    impl Drop for FakeDaemon {
        fn drop(&mut self) {
            self.handle.abort();
        }
    }
}
