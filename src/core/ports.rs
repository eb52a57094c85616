//! Port Binding
//!
//! Scans upward from a preferred port until a listener binds.

use std::io::ErrorKind;
use std::net::{IpAddr, SocketAddr};

use thiserror::Error;
use tokio::net::TcpListener;

#[derive(Debug, Error)]
pub enum BindError {
    #[error("no free port on {host} in {first}..={last}")]
    Exhausted { host: IpAddr, first: u16, last: u16 },
}

/// A listener bound for one service, fixed for the life of the process
#[derive(Debug)]
pub struct ListenerBinding {
    listener: TcpListener,
    local_addr: SocketAddr,
}

impl ListenerBinding {
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn port(&self) -> u16 {
        self.local_addr.port()
    }

    pub fn into_listener(self) -> TcpListener {
        self.listener
    }
}

/// Bind on `host`, trying `preferred` and up to `max_attempts - 1` ports above it.
///
/// Every bind failure advances to the next port; only address-in-use is
/// expected, anything else is logged louder. A preferred port of 0 lets the OS
/// pick and the binding reports the port actually assigned.
pub async fn bind_with_fallback(
    host: IpAddr,
    preferred: u16,
    max_attempts: u16,
) -> Result<ListenerBinding, BindError> {
    let mut last = preferred;

    for offset in 0..max_attempts {
        let Some(port) = preferred.checked_add(offset) else {
            break;
        };
        last = port;

        match TcpListener::bind((host, port)).await {
            Ok(listener) => match listener.local_addr() {
                Ok(local_addr) => {
                    log::debug!("Bound {}", local_addr);
                    return Ok(ListenerBinding {
                        listener,
                        local_addr,
                    });
                }
                Err(e) => log::warn!("Bound {}:{} but could not read address: {}", host, port, e),
            },
            Err(e) if e.kind() == ErrorKind::AddrInUse => {
                log::debug!("Port {} on {} in use, trying next", port, host);
            }
            Err(e) => {
                log::warn!("Cannot bind {}:{} ({}), trying next port", host, port, e);
            }
        }
    }

    Err(BindError::Exhausted {
        host,
        first: preferred,
        last,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::Ipv4Addr;

    const LOCALHOST: IpAddr = IpAddr::V4(Ipv4Addr::LOCALHOST);

    #[tokio::test]
    async fn binds_preferred_port_when_free() {
        let binding = bind_with_fallback(LOCALHOST, 0, 1).await.expect("bind");
        assert_ne!(binding.port(), 0);
        assert_eq!(binding.local_addr().ip(), LOCALHOST);
    }

    /// Occupy some port P whose successor is currently free
    fn occupy_port_below_free_one() -> (std::net::TcpListener, u16) {
        for _ in 0..50 {
            let occupied = std::net::TcpListener::bind((LOCALHOST, 0)).expect("dummy listener");
            let taken = occupied.local_addr().unwrap().port();
            let Some(next) = taken.checked_add(1) else {
                continue;
            };
            if std::net::TcpListener::bind((LOCALHOST, next)).is_ok() {
                return (occupied, taken);
            }
        }
        panic!("no occupied/free port pair found");
    }

    #[tokio::test]
    async fn skips_occupied_port() {
        let (_occupied, taken) = occupy_port_below_free_one();

        let binding = bind_with_fallback(LOCALHOST, taken, 2)
            .await
            .expect("next port is free");
        assert_eq!(binding.port(), taken + 1);
    }

    #[tokio::test]
    async fn exhausted_range_is_reported() {
        let occupied = std::net::TcpListener::bind((LOCALHOST, 0)).expect("dummy listener");
        let taken = occupied.local_addr().unwrap().port();

        let err = bind_with_fallback(LOCALHOST, taken, 1).await.unwrap_err();
        let BindError::Exhausted { host, first, last } = err;
        assert_eq!(host, LOCALHOST);
        assert_eq!(first, taken);
        assert_eq!(last, taken);
    }

    #[tokio::test]
    async fn zero_attempts_is_exhausted() {
        assert!(bind_with_fallback(LOCALHOST, 0, 0).await.is_err());
    }

    #[tokio::test]
    async fn scan_stops_at_top_of_port_range() {
        // Whatever happens at 65535, the scan must not wrap to low ports
        if let Ok(binding) = bind_with_fallback(LOCALHOST, u16::MAX, 5).await {
            assert_eq!(binding.port(), u16::MAX);
        }
    }
}
