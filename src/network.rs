//
// SPDX-License-Identifier: MIT
//
// Raw layer-2 socket: open/bind on a named interface, readiness-bounded
// receive, and destination-addressed send. The event loop is the sole
// owner of the returned `NetSocket`.

use std::io;
use std::os::fd::{AsRawFd, FromRawFd, OwnedFd};
use std::time::Duration;

use bytes::Bytes;
use nix::sys::socket::{self, LinkAddr};

use crate::error::IoError;
use crate::packet::consts::PACKET_BUF_LEN;

// Ethernet LLC header (no SNAP) prepended to every IS-IS frame.
pub const LLC_HDR: [u8; 3] = [0xFE, 0xFE, 0x03];

// IEEE 802.2 LLC ethertype, per the external interface contract.
const ETH_P_802_2: u16 = 0x0004;

// A 6-byte Ethernet address.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub struct MacAddr(pub [u8; 6]);

impl From<[u8; 6]> for MacAddr {
    fn from(bytes: [u8; 6]) -> MacAddr {
        MacAddr(bytes)
    }
}

impl std::fmt::Display for MacAddr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let [a, b, c, d, e, g] = self.0;
        write!(f, "{a:02x}:{b:02x}:{c:02x}:{d:02x}:{e:02x}:{g:02x}")
    }
}

// IS-IS ethernet multicast destinations.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum MulticastAddr {
    AllL1Iss,
    AllL2Iss,
}

impl MulticastAddr {
    pub const fn as_mac(&self) -> MacAddr {
        match self {
            MulticastAddr::AllL1Iss => MacAddr([0x01, 0x80, 0xC2, 0x00, 0x00, 0x14]),
            MulticastAddr::AllL2Iss => MacAddr([0x01, 0x80, 0xC2, 0x00, 0x00, 0x15]),
        }
    }
}

pub struct NetSocket {
    fd: OwnedFd,
    ifindex: u32,
    local_mac: MacAddr,
}

impl NetSocket {
    pub fn open(ifname: &str) -> Result<NetSocket, IoError> {
        let ifindex = if_nametoindex(ifname)?;
        let fd = raw_socket()?;

        let sockaddr = LinkAddr::new(ETH_P_802_2.to_be(), ifindex, None);
        socket::bind(fd.as_raw_fd(), &sockaddr)
            .map_err(|errno| IoError::BindError(errno.into()))?;

        let local_mac = local_mac(&fd)?;
        Ok(NetSocket {
            fd,
            ifindex,
            local_mac,
        })
    }

    pub fn local_mac(&self) -> MacAddr {
        self.local_mac
    }

    // Blocks up to `timeout` for a readable frame. Returns `Ok(None)` on
    // timeout or a spurious/interrupted wakeup; never blocks the loop
    // past `timeout`.
    pub fn recv(
        &self,
        timeout: Duration,
    ) -> Result<Option<(MacAddr, Bytes)>, IoError> {
        let mut pfd = libc::pollfd {
            fd: self.fd.as_raw_fd(),
            events: libc::POLLIN,
            revents: 0,
        };
        let timeout_ms = timeout.as_millis().min(i32::MAX as u128) as i32;
        let ready = unsafe { libc::poll(&mut pfd, 1, timeout_ms) };
        if ready < 0 {
            let err = io::Error::last_os_error();
            if err.kind() == io::ErrorKind::Interrupted {
                return Ok(None);
            }
            return Err(IoError::RecvError(err));
        }
        if ready == 0 || pfd.revents & libc::POLLIN == 0 {
            return Ok(None);
        }

        let mut buf = [0u8; PACKET_BUF_LEN];
        match socket::recvfrom::<LinkAddr>(self.fd.as_raw_fd(), &mut buf) {
            Ok((len, Some(addr))) => match addr.addr() {
                Some(src) => {
                    Ok(Some((MacAddr::from(src), Bytes::copy_from_slice(&buf[..len]))))
                }
                None => {
                    IoError::RecvMissingSourceAddr.log();
                    Ok(None)
                }
            },
            Ok((_, None)) => {
                IoError::RecvMissingSourceAddr.log();
                Ok(None)
            }
            Err(nix::errno::Errno::EINTR) => Ok(None),
            Err(errno) => Err(IoError::RecvError(errno.into())),
        }
    }

    // Oversized frames are silently suppressed rather than crashing the
    // loop, per the I/O error handling policy.
    pub fn send(&self, dst: MacAddr, frame: &[u8]) -> Result<(), IoError> {
        if frame.len() > PACKET_BUF_LEN {
            return Ok(());
        }
        let sockaddr = LinkAddr::new(ETH_P_802_2.to_be(), self.ifindex, Some(dst.0));
        socket::sendto(self.fd.as_raw_fd(), frame, &sockaddr, socket::MsgFlags::empty())
            .map(|_| ())
            .map_err(|errno| IoError::SendError(errno.into()))
    }
}

fn raw_socket() -> Result<OwnedFd, IoError> {
    let proto = ETH_P_802_2.to_be() as i32;
    let fd = unsafe { libc::socket(libc::AF_PACKET, libc::SOCK_RAW, proto) };
    if fd < 0 {
        return Err(IoError::SocketError(io::Error::last_os_error()));
    }
    Ok(unsafe { OwnedFd::from_raw_fd(fd) })
}

fn local_mac(fd: &OwnedFd) -> Result<MacAddr, IoError> {
    let addr: LinkAddr = socket::getsockname(fd.as_raw_fd())
        .map_err(|errno| IoError::SocketError(errno.into()))?;
    addr.addr()
        .map(MacAddr::from)
        .ok_or(IoError::RecvMissingSourceAddr)
}

fn if_nametoindex(ifname: &str) -> Result<u32, IoError> {
    let cname = std::ffi::CString::new(ifname)
        .map_err(|_| IoError::SocketError(io::Error::last_os_error()))?;
    let index = unsafe { libc::if_nametoindex(cname.as_ptr()) };
    if index == 0 {
        return Err(IoError::SocketError(io::Error::last_os_error()));
    }
    Ok(index)
}
