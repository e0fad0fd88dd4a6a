use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use sysinfo::System;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum OsFamily {
    Ios,
    Android,
    MacOs,
    Windows,
    Linux,
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OsVersion {
    pub family: OsFamily,
    pub major: u32,
}

/// Hardware and OS facts the classifier decides on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceFacts {
    /// `false` on simulators and emulators.
    pub is_physical_device: bool,
    /// Device "year class", when the platform can tell.
    pub year_class: Option<u32>,
    pub total_memory_bytes: u64,
    pub os: OsVersion,
}

pub trait DeviceProbe: Send + Sync {
    fn probe(&self) -> Result<DeviceFacts>;
}

/// Probe returning fixed facts. Hosts that already know their device use this.
#[derive(Debug, Clone)]
pub struct StaticProbe {
    facts: DeviceFacts,
}

impl StaticProbe {
    pub fn new(facts: DeviceFacts) -> Self {
        Self { facts }
    }
}

impl DeviceProbe for StaticProbe {
    fn probe(&self) -> Result<DeviceFacts> {
        Ok(self.facts.clone())
    }
}

/// Reads memory and OS version from the running system through `sysinfo`.
///
/// Physical-device and year-class facts are not observable here, so the host
/// passes them in.
#[derive(Debug, Clone)]
pub struct SysinfoProbe {
    is_physical_device: bool,
    year_class: Option<u32>,
}

impl SysinfoProbe {
    pub fn new(is_physical_device: bool, year_class: Option<u32>) -> Self {
        Self {
            is_physical_device,
            year_class,
        }
    }
}

impl DeviceProbe for SysinfoProbe {
    fn probe(&self) -> Result<DeviceFacts> {
        let mut system = System::new();
        system.refresh_memory();
        let total_memory_bytes = system.total_memory();

        let family = os_family(System::name().as_deref().unwrap_or_default());
        let version = if family == OsFamily::Linux {
            System::kernel_version()
        } else {
            System::os_version()
        }
        .context("os version unavailable")?;
        let major = parse_major(&version)
            .with_context(|| format!("unparseable os version '{version}'"))?;

        Ok(DeviceFacts {
            is_physical_device: self.is_physical_device,
            year_class: self.year_class,
            total_memory_bytes,
            os: OsVersion { family, major },
        })
    }
}

fn os_family(name: &str) -> OsFamily {
    let name = name.to_ascii_lowercase();
    if name.contains("ios") || name.contains("ipados") {
        OsFamily::Ios
    } else if name.contains("android") {
        OsFamily::Android
    } else if name.contains("mac") || name.contains("darwin") {
        OsFamily::MacOs
    } else if name.contains("windows") {
        OsFamily::Windows
    } else if name.contains("linux")
        || ["ubuntu", "debian", "fedora", "arch", "alpine", "centos"]
            .iter()
            .any(|distro| name.contains(distro))
    {
        OsFamily::Linux
    } else {
        OsFamily::Other
    }
}

/// Leading numeric component of a version string such as `14.2.1` or `6.1.0-13-amd64`.
fn parse_major(version: &str) -> Option<u32> {
    let digits: String = version
        .trim()
        .chars()
        .take_while(|c| c.is_ascii_digit())
        .collect();
    digits.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_leading_major() {
        assert_eq!(parse_major("14.2.1"), Some(14));
        assert_eq!(parse_major("6.1.0-13-amd64"), Some(6));
        assert_eq!(parse_major("11"), Some(11));
        assert_eq!(parse_major("beta"), None);
    }

    #[test]
    fn maps_os_names() {
        assert_eq!(os_family("Darwin"), OsFamily::MacOs);
        assert_eq!(os_family("Ubuntu"), OsFamily::Linux);
        assert_eq!(os_family("Windows"), OsFamily::Windows);
        assert_eq!(os_family("Android"), OsFamily::Android);
        assert_eq!(os_family("Plan 9"), OsFamily::Other);
    }
}
