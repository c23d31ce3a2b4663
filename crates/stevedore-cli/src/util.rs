//! Argument parsers shared by CLI commands

use stevedore_kube::{Port, ServiceType};

/// Parse `KEY=VALUE`
pub fn parse_key_value(s: &str) -> Result<(String, String), String> {
    let (key, value) = s
        .split_once('=')
        .ok_or_else(|| format!("expected KEY=VALUE, got '{}'", s))?;
    if key.is_empty() {
        return Err(format!("empty key in '{}'", s));
    }
    Ok((key.to_string(), value.to_string()))
}

/// Parse a bind mount `HOST:CONTAINER`
pub fn parse_mount(s: &str) -> Result<(String, String), String> {
    match s.split_once(':') {
        Some((host, container)) if !host.is_empty() && !container.is_empty() => {
            Ok((host.to_string(), container.to_string()))
        }
        _ => Err(format!("expected HOST:CONTAINER, got '{}'", s)),
    }
}

/// Parse a port `[NAME:]PORT[/PROTOCOL]`
pub fn parse_port(s: &str) -> Result<Port, String> {
    let (name, rest) = match s.split_once(':') {
        Some((name, rest)) => (name, rest),
        None => ("", s),
    };
    let (number, protocol) = match rest.split_once('/') {
        Some((number, protocol)) => (number, protocol),
        None => (rest, ""),
    };
    let port: i32 = number
        .parse()
        .map_err(|_| format!("invalid port number '{}'", number))?;
    if !(1..=65535).contains(&port) {
        return Err(format!("port {} out of range", port));
    }
    Ok(Port::new(port).with_name(name).with_protocol(protocol))
}

/// Parse a byte size with an optional `b`, `k`, `m` or `g` suffix (powers of 1024)
pub fn parse_memory(s: &str) -> Result<i64, String> {
    let lower = s.trim().to_ascii_lowercase();
    let (digits, multiplier) = match lower.chars().last() {
        Some('b') => (&lower[..lower.len() - 1], 1),
        Some('k') => (&lower[..lower.len() - 1], 1 << 10),
        Some('m') => (&lower[..lower.len() - 1], 1 << 20),
        Some('g') => (&lower[..lower.len() - 1], 1 << 30),
        _ => (lower.as_str(), 1),
    };
    let value: i64 = digits
        .parse()
        .map_err(|_| format!("invalid memory size '{}'", s))?;
    value
        .checked_mul(multiplier)
        .filter(|bytes| *bytes > 0)
        .ok_or_else(|| format!("invalid memory size '{}'", s))
}

/// Parse a service type, case-insensitively
pub fn parse_service_type(s: &str) -> Result<ServiceType, String> {
    s.parse().map_err(|e: stevedore_kube::KubeError| e.to_string())
}
