use std::collections::HashSet;
use std::io::ErrorKind;
use std::net::{Ipv4Addr, Ipv6Addr, SocketAddr, TcpListener};
use std::path::Path;

use rand::Rng;
use tracing::{debug, info};

use crate::errors::{GymError, Result};

/// Whether nothing is listening on `port`, checked by binding the IPv4 and IPv6 wildcards.
/// Hosts without IPv6 are judged on IPv4 alone.
pub fn is_port_free(port: u16) -> bool {
    let v4 = SocketAddr::from((Ipv4Addr::UNSPECIFIED, port));
    if TcpListener::bind(v4).is_err() {
        return false;
    }

    let v6 = SocketAddr::from((Ipv6Addr::UNSPECIFIED, port));
    match TcpListener::bind(v6) {
        Ok(_) => true,
        Err(e) => matches!(e.kind(), ErrorKind::AddrNotAvailable | ErrorKind::Unsupported),
    }
}

/// A fixed set of ports, verified free when drawn, handed out round-robin.
///
/// A port may be taken by another program after the draw; callers must tolerate a failed bind.
#[derive(Debug, Clone)]
pub struct PortPool {
    ports: Vec<u16>,
    next: usize,
}

impl PortPool {
    pub fn from_ports(ports: Vec<u16>) -> Result<Self> {
        if ports.is_empty() {
            return Err(GymError::Config("port pool cannot be empty".to_string()));
        }
        Ok(Self { ports, next: 0 })
    }

    /// Draws `size` distinct free ports from `[min, max]`, giving up after `max_draws` draws.
    pub fn generate<R: Rng>(size: usize, min: u16, max: u16, max_draws: usize, rng: &mut R) -> Result<Self> {
        Self::generate_with(size, min, max, max_draws, rng, is_port_free)
    }

    pub(crate) fn generate_with<R: Rng>(
        size: usize,
        min: u16,
        max: u16,
        max_draws: usize,
        rng: &mut R,
        is_free: impl Fn(u16) -> bool,
    ) -> Result<Self> {
        if size == 0 || min > max {
            return Err(GymError::Config(format!("invalid port pool: {size} ports in [{min}, {max}]")));
        }

        let mut seen = HashSet::new();
        let mut ports = Vec::with_capacity(size);
        for _ in 0..max_draws {
            if ports.len() == size {
                break;
            }
            let port = rng.random_range(min..=max);
            if !seen.insert(port) {
                continue;
            }
            if is_free(port) {
                ports.push(port);
            } else {
                debug!("port {port} is in use");
            }
        }

        if ports.len() < size {
            return Err(GymError::PortExhausted(max_draws));
        }

        info!("Port pool: {ports:?}");
        Self::from_ports(ports)
    }

    pub fn ports(&self) -> &[u16] {
        &self.ports
    }

    pub fn allocate_port(&mut self) -> u16 {
        let port = self.ports[self.next];
        self.next = (self.next + 1) % self.ports.len();
        port
    }
}

/// Writes `port` to the per-episode port file both peers read it from.
pub fn write_port_file(path: &Path, port: u16) -> Result<()> {
    std::fs::write(path, port.to_string())?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    use super::*;

    #[test]
    fn test_round_robin_rotation() -> anyhow::Result<()> {
        let ports: Vec<u16> = (0..10).map(|i| 40000 + i).collect();
        let mut pool = PortPool::from_ports(ports.clone())?;

        let allocated: Vec<u16> = (0..11).map(|_| pool.allocate_port()).collect();
        let mut expected = ports.clone();
        expected.push(ports[0]);
        assert_eq!(allocated, expected);
        Ok(())
    }

    #[test]
    fn test_generate_skips_busy_and_duplicate_ports() -> anyhow::Result<()> {
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let pool = PortPool::generate_with(5, 2000, 2009, 10_000, &mut rng, |p| p % 2 == 0)?;
        let mut ports = pool.ports().to_vec();
        assert!(ports.iter().all(|p| p % 2 == 0));
        ports.sort();
        ports.dedup();
        assert_eq!(ports, vec![2000, 2002, 2004, 2006, 2008]);
        Ok(())
    }

    #[test]
    fn test_exhaustion_is_an_error() {
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        let ret = PortPool::generate_with(3, 2000, 2001, 100, &mut rng, |_| true);
        assert!(matches!(ret, Err(GymError::PortExhausted(100))));

        let ret = PortPool::generate_with(1, 2000, 2001, 100, &mut rng, |_| false);
        assert!(matches!(ret, Err(GymError::PortExhausted(100))));
    }

    #[test]
    fn test_bound_port_is_not_free() -> anyhow::Result<()> {
        let listener = TcpListener::bind((Ipv4Addr::UNSPECIFIED, 0))?;
        let port = listener.local_addr()?.port();
        assert!(!is_port_free(port));
        Ok(())
    }

    #[test]
    fn test_port_file() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("port.txt");
        write_port_file(&path, 45678)?;
        assert_eq!(std::fs::read_to_string(path)?, "45678");
        Ok(())
    }
}
