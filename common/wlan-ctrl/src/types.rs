//! Shared value types for AP/station security configuration

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::CtrlError;

/// IEEE 802 hardware address
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct MacAddr([u8; 6]);

impl MacAddr {
    pub const fn new(octets: [u8; 6]) -> Self {
        Self(octets)
    }

    pub fn octets(&self) -> [u8; 6] {
        self.0
    }
}

impl FromStr for MacAddr {
    type Err = CtrlError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let mut octets = [0u8; 6];
        let mut parts = s.split(':');

        for octet in octets.iter_mut() {
            let part = parts
                .next()
                .filter(|p| p.len() == 2 && p.bytes().all(|b| b.is_ascii_hexdigit()))
                .ok_or_else(|| CtrlError::InvalidMac(s.to_string()))?;
            *octet =
                u8::from_str_radix(part, 16).map_err(|_| CtrlError::InvalidMac(s.to_string()))?;
        }

        if parts.next().is_some() {
            return Err(CtrlError::InvalidMac(s.to_string()));
        }

        Ok(Self(octets))
    }
}

impl fmt::Display for MacAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [a, b, c, d, e, g] = self.0;
        write!(f, "{a:02x}:{b:02x}:{c:02x}:{d:02x}:{e:02x}:{g:02x}")
    }
}

impl TryFrom<String> for MacAddr {
    type Error = CtrlError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<MacAddr> for String {
    fn from(addr: MacAddr) -> Self {
        addr.to_string()
    }
}

/// Authentication and key management suite
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum KeyMgmt {
    #[serde(rename = "WPA-PSK")]
    WpaPsk,
    #[serde(rename = "WPA-PSK-SHA256")]
    WpaPskSha256,
}

impl KeyMgmt {
    /// Name used in hostapd and wpa_supplicant configuration
    pub fn config_name(&self) -> &'static str {
        match self {
            KeyMgmt::WpaPsk => "WPA-PSK",
            KeyMgmt::WpaPskSha256 => "WPA-PSK-SHA256",
        }
    }

    /// Name wlantest reports for a negotiated AKM
    pub fn observed_name(&self) -> &'static str {
        match self {
            KeyMgmt::WpaPsk => "PSK",
            KeyMgmt::WpaPskSha256 => "PSK-SHA256",
        }
    }
}

impl fmt::Display for KeyMgmt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.config_name())
    }
}

impl FromStr for KeyMgmt {
    type Err = CtrlError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "WPA-PSK" | "PSK" => Ok(KeyMgmt::WpaPsk),
            "WPA-PSK-SHA256" | "PSK-SHA256" => Ok(KeyMgmt::WpaPskSha256),
            other => Err(CtrlError::UnexpectedReply {
                command: "key_mgmt".to_string(),
                reply: other.to_string(),
            }),
        }
    }
}

/// Ordered set of key management suites, rendered space separated
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeyMgmtSet(Vec<KeyMgmt>);

impl KeyMgmtSet {
    pub fn new(suites: impl IntoIterator<Item = KeyMgmt>) -> Self {
        let mut set = Self::default();
        for suite in suites {
            set.insert(suite);
        }
        set
    }

    /// `WPA-PSK WPA-PSK-SHA256`, what the stations offer in every scenario
    pub fn psk_both() -> Self {
        Self::new([KeyMgmt::WpaPsk, KeyMgmt::WpaPskSha256])
    }

    pub fn insert(&mut self, suite: KeyMgmt) {
        if !self.0.contains(&suite) {
            self.0.push(suite);
        }
    }

    pub fn contains(&self, suite: KeyMgmt) -> bool {
        self.0.contains(&suite)
    }
}

impl From<KeyMgmt> for KeyMgmtSet {
    fn from(suite: KeyMgmt) -> Self {
        Self(vec![suite])
    }
}

impl fmt::Display for KeyMgmtSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = self.0.iter().map(|k| k.config_name()).collect();
        f.write_str(&names.join(" "))
    }
}

impl FromStr for KeyMgmtSet {
    type Err = CtrlError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.split_whitespace()
            .map(KeyMgmt::from_str)
            .collect::<Result<Vec<_>, _>>()
            .map(Self::new)
    }
}

/// Protected Management Frames policy (`ieee80211w`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PmfMode {
    Disabled,
    Optional,
    Required,
}

impl PmfMode {
    /// Value of the `ieee80211w` configuration field
    pub fn ieee80211w(&self) -> &'static str {
        match self {
            PmfMode::Disabled => "0",
            PmfMode::Optional => "1",
            PmfMode::Required => "2",
        }
    }
}

impl fmt::Display for PmfMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PmfMode::Disabled => write!(f, "disabled"),
            PmfMode::Optional => write!(f, "optional"),
            PmfMode::Required => write!(f, "required"),
        }
    }
}

/// Security protocol for a station network block
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Proto {
    #[serde(rename = "WPA2", alias = "RSN")]
    Wpa2,
}

impl Proto {
    pub fn config_name(&self) -> &'static str {
        match self {
            Proto::Wpa2 => "WPA2",
        }
    }
}

impl FromStr for Proto {
    type Err = CtrlError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "WPA2" | "RSN" => Ok(Proto::Wpa2),
            other => Err(CtrlError::UnexpectedReply {
                command: "proto".to_string(),
                reply: other.to_string(),
            }),
        }
    }
}

/// Per-station counters kept by wlantest
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StaCounter {
    ValidSaQueryReqTx,
    ValidSaQueryRespTx,
}

impl StaCounter {
    pub fn as_str(&self) -> &'static str {
        match self {
            StaCounter::ValidSaQueryReqTx => "valid_saqueryreq_tx",
            StaCounter::ValidSaQueryRespTx => "valid_saqueryresp_tx",
        }
    }
}

impl fmt::Display for StaCounter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
