// Inkwell - A multi-user blogging platform built with Rust
// Copyright (C) 2025 Inkwell Project Contributors
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as
// published by the Free Software Foundation, either version 3 of the
// License, or (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program.  If not, see <https://www.gnu.org/licenses/>.

//! Wake-on-LAN magic packets.

use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum WakeOnLanError {
    #[error("Incorrect MAC address format: {0}")]
    InvalidMac(String),

    #[error("SecureOn password must be 4 or 6 bytes of hex")]
    InvalidPassword,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MacAddress([u8; 6]);

impl MacAddress {
    pub fn octets(&self) -> [u8; 6] {
        self.0
    }
}

impl FromStr for MacAddress {
    type Err = WakeOnLanError;

    /// Accepts `001122aabbcc` or any single-character separator such as
    /// `00:11:22:aa:bb:cc` and `00-11-22-AA-BB-CC`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || WakeOnLanError::InvalidMac(s.to_string());

        let hex: String = match s.len() {
            12 => s.to_string(),
            17 => {
                let sep = s.chars().nth(2).ok_or_else(invalid)?;
                if sep.is_ascii_hexdigit() {
                    return Err(invalid());
                }
                s.split(sep).collect()
            }
            _ => return Err(invalid()),
        };

        let bytes = decode_hex(&hex).ok_or_else(invalid)?;
        let octets: [u8; 6] = bytes.try_into().map_err(|_| invalid())?;
        Ok(MacAddress(octets))
    }
}

impl fmt::Display for MacAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.0.iter().map(|b| format!("{:02X}", b)).collect();
        f.write_str(&parts.join(":"))
    }
}

/// Six `0xFF` bytes, the MAC repeated sixteen times, then the optional password.
pub fn magic_packet(mac: &MacAddress, password: Option<&str>) -> Result<Vec<u8>, WakeOnLanError> {
    let password = match password {
        Some(p) if !p.is_empty() => {
            if p.len() != 8 && p.len() != 12 {
                return Err(WakeOnLanError::InvalidPassword);
            }
            decode_hex(p).ok_or(WakeOnLanError::InvalidPassword)?
        }
        _ => Vec::new(),
    };

    let mut packet = Vec::with_capacity(6 + 16 * 6 + password.len());
    packet.extend_from_slice(&[0xFF; 6]);
    for _ in 0..16 {
        packet.extend_from_slice(&mac.0);
    }
    packet.extend_from_slice(&password);
    Ok(packet)
}

/// Destination ports: the well-known 7 and 9 plus the configured one.
pub fn target_ports(configured: u16) -> Vec<u16> {
    let mut ports = vec![7, 9];
    if !ports.contains(&configured) {
        ports.push(configured);
    }
    ports
}

fn decode_hex(s: &str) -> Option<Vec<u8>> {
    if s.len() % 2 != 0 || !s.chars().all(|c| c.is_ascii_hexdigit()) {
        return None;
    }
    (0..s.len())
        .step_by(2)
        .map(|i| u8::from_str_radix(&s[i..i + 2], 16).ok())
        .collect()
}
