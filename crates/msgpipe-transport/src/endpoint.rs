use std::os::unix::fs::{FileTypeExt, MetadataExt, PermissionsExt};
use std::os::unix::net::{UnixListener, UnixStream};
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::error::{Result, TransportError};
use crate::message::MessageStream;

/// Default permission mode for created socket paths.
pub const DEFAULT_SOCKET_MODE: u32 = 0o600;

/// Maximum socket path length.
/// Unix `sockaddr_un.sun_path` is typically 108 bytes on Linux, 104 on macOS.
#[cfg(target_os = "linux")]
const MAX_PATH_LEN: usize = 108;
#[cfg(not(target_os = "linux"))]
const MAX_PATH_LEN: usize = 104;

/// Server-side pipe endpoint (blocking).
///
/// Binds a path-addressed local pipe and accepts message-mode streams.
pub struct PipeEndpoint {
    listener: UnixListener,
    guard: SocketGuard,
}

impl PipeEndpoint {
    /// Bind an endpoint at `path` with the default socket mode.
    ///
    /// If the path already exists and is a socket, it is removed first
    /// (stale socket cleanup); an existing non-socket file is an error.
    pub fn bind(path: impl AsRef<Path>) -> Result<Self> {
        Self::bind_with_mode(path, DEFAULT_SOCKET_MODE)
    }

    /// Bind an endpoint at `path` with an explicit permission mode.
    pub fn bind_with_mode(path: impl AsRef<Path>, mode: u32) -> Result<Self> {
        let (listener, guard) = bind_uds(path.as_ref(), mode)?;
        Ok(Self { listener, guard })
    }

    /// Accept an incoming connection (blocking).
    pub fn accept(&self) -> Result<MessageStream> {
        let (stream, _addr) = self.listener.accept().map_err(TransportError::Accept)?;
        debug!("accepted connection");
        Ok(MessageStream::new(stream))
    }

    /// Connect to a listening endpoint (blocking, no retry).
    pub fn connect(path: impl AsRef<Path>) -> Result<MessageStream> {
        let path = path.as_ref();
        let stream = UnixStream::connect(path).map_err(|e| TransportError::Connect {
            path: path.to_path_buf(),
            source: e,
        })?;
        debug!(?path, "connected to pipe endpoint");
        Ok(MessageStream::new(stream))
    }

    /// The path this endpoint is bound to.
    pub fn path(&self) -> &Path {
        &self.guard.path
    }
}

/// Shared bind logic for the blocking and async endpoints.
pub(crate) fn bind_uds(path: &Path, mode: u32) -> Result<(UnixListener, SocketGuard)> {
    let path = path.to_path_buf();

    let path_bytes = path.as_os_str().len();
    if path_bytes >= MAX_PATH_LEN {
        return Err(TransportError::PathTooLong {
            path,
            len: path_bytes,
            max: MAX_PATH_LEN,
        });
    }

    // Remove stale sockets, but never remove non-socket files.
    if path.exists() {
        let metadata = std::fs::symlink_metadata(&path).map_err(|e| TransportError::Bind {
            path: path.clone(),
            source: e,
        })?;
        if metadata.file_type().is_socket() {
            debug!(?path, "removing stale socket");
            std::fs::remove_file(&path).map_err(|e| TransportError::Bind {
                path: path.clone(),
                source: e,
            })?;
        } else {
            return Err(TransportError::Bind {
                path: path.clone(),
                source: std::io::Error::new(
                    std::io::ErrorKind::AlreadyExists,
                    "existing path is not a unix socket",
                ),
            });
        }
    }

    let listener = UnixListener::bind(&path).map_err(|e| TransportError::Bind {
        path: path.clone(),
        source: e,
    })?;

    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(mode)).map_err(|e| {
        TransportError::Bind {
            path: path.clone(),
            source: e,
        }
    })?;
    let created_metadata = std::fs::symlink_metadata(&path).map_err(|e| TransportError::Bind {
        path: path.clone(),
        source: e,
    })?;
    let created_inode = Some((created_metadata.dev(), created_metadata.ino()));

    info!(?path, "pipe endpoint listening");

    Ok((
        listener,
        SocketGuard {
            path,
            created_inode,
        },
    ))
}

/// Removes the socket file on drop, provided the path still names the socket
/// this endpoint created.
pub(crate) struct SocketGuard {
    pub(crate) path: PathBuf,
    created_inode: Option<(u64, u64)>,
}

impl Drop for SocketGuard {
    fn drop(&mut self) {
        if let Some((expected_dev, expected_ino)) = self.created_inode {
            if let Ok(metadata) = std::fs::symlink_metadata(&self.path) {
                if metadata.file_type().is_socket()
                    && metadata.dev() == expected_dev
                    && metadata.ino() == expected_ino
                {
                    debug!(path = ?self.path, "cleaning up socket file");
                    let _ = std::fs::remove_file(&self.path);
                } else {
                    debug!(
                        path = ?self.path,
                        "socket path identity changed; skipping cleanup"
                    );
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_dir(tag: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("msgpipe-{}-{}", tag, std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn bind_accept_connect_roundtrip() {
        let dir = temp_dir("endpoint");
        let sock_path = dir.join("endpoint.sock");

        let endpoint = PipeEndpoint::bind(&sock_path).unwrap();
        assert!(sock_path.exists());

        let path_clone = sock_path.clone();
        let client = std::thread::spawn(move || {
            let mut stream = PipeEndpoint::connect(&path_clone).unwrap();
            stream.write_message(b"hello").unwrap();
        });

        let mut server = endpoint.accept().unwrap();
        let mut buf = [0u8; 16];
        let chunk = server.read_chunk(&mut buf).unwrap();
        assert_eq!(&buf[..chunk.len], b"hello");
        assert!(!chunk.more);

        client.join().unwrap();

        drop(server);
        drop(endpoint);
        assert!(
            !sock_path.exists(),
            "socket file should be cleaned up on drop"
        );
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn bind_rejects_overlong_path() {
        let long_path = "/tmp/".to_string() + &"a".repeat(200) + ".sock";
        let result = PipeEndpoint::bind(&long_path);
        assert!(matches!(result, Err(TransportError::PathTooLong { .. })));
    }

    #[test]
    fn bind_hardens_default_permissions() {
        let dir = temp_dir("perms");
        let sock_path = dir.join("perm.sock");

        let endpoint = PipeEndpoint::bind(&sock_path).unwrap();
        let mode = std::fs::metadata(&sock_path).unwrap().permissions().mode() & 0o777;
        assert_eq!(mode, 0o600);

        drop(endpoint);
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn bind_rejects_existing_non_socket_file() {
        let dir = temp_dir("bind-file");
        let sock_path = dir.join("not-a-socket.sock");
        std::fs::write(&sock_path, b"regular-file").unwrap();

        let result = PipeEndpoint::bind(&sock_path);
        assert!(matches!(result, Err(TransportError::Bind { .. })));

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn drop_does_not_remove_replaced_path() {
        let dir = temp_dir("drop-race");
        let sock_path = dir.join("drop.sock");

        let endpoint = PipeEndpoint::bind(&sock_path).unwrap();
        assert!(sock_path.exists());

        // Replace the path while the endpoint is alive.
        std::fs::remove_file(&sock_path).unwrap();
        std::fs::write(&sock_path, b"replacement-file").unwrap();

        drop(endpoint);
        assert!(
            sock_path.exists(),
            "drop must not remove path if inode identity changed"
        );

        let _ = std::fs::remove_dir_all(&dir);
    }
}
