use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Protocol {
    Tcp,
    Udp,
    Other(String),
}

impl Protocol {
    pub fn as_str(&self) -> &str {
        match self {
            Protocol::Tcp => "TCP",
            Protocol::Udp => "UDP",
            Protocol::Other(raw) => raw,
        }
    }

    pub fn is_known(&self) -> bool {
        !matches!(self, Protocol::Other(_))
    }
}

impl From<String> for Protocol {
    fn from(raw: String) -> Self {
        match raw.as_str() {
            "TCP" => Protocol::Tcp,
            "UDP" => Protocol::Udp,
            _ => Protocol::Other(raw),
        }
    }
}

impl From<Protocol> for String {
    fn from(protocol: Protocol) -> Self {
        protocol.as_str().to_string()
    }
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Socket state as reported by the collector.
///
/// `Listen`, `SynRcvd`, `Closing` and `DeleteTcb` are the spellings emitted by
/// the Windows TCP table and are accepted alongside the canonical names.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ConnectionState {
    Listening,
    Listen,
    Established,
    TimeWait,
    CloseWait,
    FinWait1,
    FinWait2,
    SynSent,
    SynRecv,
    SynRcvd,
    LastAck,
    Closing,
    Closed,
    DeleteTcb,
    Other(String),
}

const STATE_NAMES: &[(&str, ConnectionState)] = &[
    ("LISTENING", ConnectionState::Listening),
    ("LISTEN", ConnectionState::Listen),
    ("ESTABLISHED", ConnectionState::Established),
    ("TIME_WAIT", ConnectionState::TimeWait),
    ("CLOSE_WAIT", ConnectionState::CloseWait),
    ("FIN_WAIT1", ConnectionState::FinWait1),
    ("FIN_WAIT2", ConnectionState::FinWait2),
    ("SYN_SENT", ConnectionState::SynSent),
    ("SYN_RECV", ConnectionState::SynRecv),
    ("SYN_RCVD", ConnectionState::SynRcvd),
    ("LAST_ACK", ConnectionState::LastAck),
    ("CLOSING", ConnectionState::Closing),
    ("CLOSED", ConnectionState::Closed),
    ("DELETE_TCB", ConnectionState::DeleteTcb),
];

impl ConnectionState {
    pub fn as_str(&self) -> &str {
        if let ConnectionState::Other(raw) = self {
            return raw;
        }
        STATE_NAMES
            .iter()
            .find(|(_, state)| state == self)
            .map(|(name, _)| *name)
            .unwrap_or("UNKNOWN")
    }

    pub fn is_known(&self) -> bool {
        !matches!(self, ConnectionState::Other(_))
    }
}

impl From<String> for ConnectionState {
    fn from(raw: String) -> Self {
        STATE_NAMES
            .iter()
            .find(|(name, _)| *name == raw)
            .map(|(_, state)| state.clone())
            .unwrap_or(ConnectionState::Other(raw))
    }
}

impl From<ConnectionState> for String {
    fn from(state: ConnectionState) -> Self {
        state.as_str().to_string()
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkConnection {
    pub protocol: Protocol,
    pub local_address: String,
    pub remote_address: String,
    pub state: ConnectionState,
    /// 0 when the socket could not be attributed to a process.
    pub owning_pid: u32,
}

impl NetworkConnection {
    pub fn remote_ip(&self) -> Option<IpAddr> {
        parse_endpoint_ip(&self.remote_address)
    }

    /// True when the remote endpoint is a routable public address.
    pub fn is_external(&self) -> bool {
        self.remote_ip().is_some_and(|ip| !is_internal_ip(&ip))
    }
}

/// Loopback, private, link-local, unspecified and other non-routable ranges.
pub fn is_internal_ip(ip: &IpAddr) -> bool {
    match ip {
        IpAddr::V4(v4) => is_internal_v4(v4),
        IpAddr::V6(v6) => match v6.to_ipv4_mapped() {
            Some(v4) => is_internal_v4(&v4),
            None => {
                let first = v6.segments()[0];
                let second = v6.segments()[1];
                v6.is_loopback()
                    || v6.is_unspecified()
                    || (first & 0xfe00) == 0xfc00
                    || (first & 0xffc0) == 0xfe80
                    // 2001::/23 IETF protocol assignments and 2001:db8::/32 documentation
                    || (first == 0x2001 && (second < 0x0200 || second == 0x0db8))
            }
        },
    }
}

fn is_internal_v4(ip: &Ipv4Addr) -> bool {
    let [a, b, c, d] = ip.octets();
    ip.is_private()
        || ip.is_loopback()
        || ip.is_link_local()
        || ip.is_unspecified()
        || ip.is_documentation()
        || a == 0
        // 192.0.0.0/29 IETF protocol assignments
        || (a == 192 && b == 0 && c == 0 && d < 8)
        // 198.18.0.0/15 benchmarking
        || (a == 198 && (b & 0xfe) == 18)
        // 240.0.0.0/4 reserved, includes broadcast
        || a >= 240
}

/// Extract the IP part of an `ip:port` endpoint.
///
/// Handles bracketed IPv6 (`[::1]:443`) as well as bare IPv6 with a trailing
/// port (`fe80::1:443`). Wildcards such as `*:*` yield `None`.
pub fn parse_endpoint_ip(endpoint: &str) -> Option<IpAddr> {
    let endpoint = endpoint.trim();

    if let Ok(socket) = endpoint.parse::<SocketAddr>() {
        return Some(socket.ip());
    }

    let (host, _port) = endpoint.rsplit_once(':')?;
    let host = host.trim_start_matches('[').trim_end_matches(']');
    host.parse::<IpAddr>().ok()
}
