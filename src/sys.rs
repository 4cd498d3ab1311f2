//! The `sys://` scheme: host information as an element tree.
//!
//! `sys://system/info` yields a `system` element whose attributes describe
//! the running host. A third path segment selects a single attribute, so
//! `sys://system/info/hostname` is just the host name.

use crate::error::MosaicError;
use mosaic_value::{Context, Item};

pub const SCHEME: &str = "sys://";

/// A parsed `sys://<category>/<subcategory>[/<item>]` address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SysPath<'a> {
    pub category: &'a str,
    pub subcategory: &'a str,
    pub item: Option<&'a str>,
}

impl<'a> SysPath<'a> {
    pub fn parse(url: &'a str) -> Result<Self, MosaicError> {
        let path = url
            .strip_prefix(SCHEME)
            .ok_or_else(|| MosaicError::NotFound(format!("not a sys:// url: {}", url)))?;
        let mut segments = path.trim_end_matches('/').split('/');
        let category = segments.next().filter(|s| !s.is_empty());
        let subcategory = segments.next().filter(|s| !s.is_empty());
        let item = segments.next().filter(|s| !s.is_empty());
        match (category, subcategory, segments.next()) {
            (Some(category), Some(subcategory), None) => Ok(SysPath {
                category,
                subcategory,
                item,
            }),
            _ => Err(MosaicError::NotFound(url.to_string())),
        }
    }
}

/// Joins a relative path such as `system/info` onto a `sys://` base.
pub fn resolve(source: &str, base_url: Option<&str>) -> String {
    let source = source.trim();
    if source.starts_with(SCHEME) {
        return source.to_string();
    }
    match base_url.filter(|base| base.starts_with(SCHEME)) {
        Some(base) => format!("{}/{}", base.trim_end_matches('/'), source.trim_start_matches('/')),
        None => format!("{}{}", SCHEME, source.trim_start_matches('/')),
    }
}

/// Resolves a `sys://` url to an item.
pub fn load(ctx: &Context, url: &str) -> Result<Item, MosaicError> {
    let path = SysPath::parse(url)?;
    log::debug!("resolving {}", url);
    match (path.category, path.subcategory) {
        ("system", "info") => {
            let info = SystemInfo::collect();
            match path.item {
                None => info.to_item(ctx),
                Some(key) => info
                    .attribute(ctx, key)?
                    .ok_or_else(|| MosaicError::NotFound(url.to_string())),
            }
        }
        _ => Err(MosaicError::NotFound(url.to_string())),
    }
}

/// A snapshot of host facts.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SystemInfo {
    pub os_name: String,
    pub os_version: String,
    pub os_kernel: String,
    pub os_machine: String,
    pub os_nodename: String,
    pub hostname: String,
    pub uptime_seconds: Option<u64>,
    pub architecture: String,
    pub platform: String,
    pub cpu_count: usize,
}

impl SystemInfo {
    pub const KEYS: [&'static str; 14] = [
        "os.name",
        "os.version",
        "os.kernel",
        "os.machine",
        "os.nodename",
        "hostname",
        "uptime.seconds",
        "uptime.days",
        "uptime.hours",
        "uptime.minutes",
        "architecture",
        "platform",
        "cpu.count",
        "category",
    ];

    pub fn collect() -> Self {
        let uname = uname();
        let hostname = uname
            .as_ref()
            .map(|u| u.nodename.clone())
            .filter(|name| !name.is_empty())
            .or_else(|| std::env::var("HOSTNAME").ok())
            .or_else(|| std::env::var("COMPUTERNAME").ok())
            .unwrap_or_default();
        let (os_name, os_version, os_kernel, os_machine) = match uname {
            Some(u) => (u.sysname, u.release, u.version, u.machine),
            None => (
                fallback_os_name().to_string(),
                String::new(),
                String::new(),
                std::env::consts::ARCH.to_string(),
            ),
        };
        SystemInfo {
            os_name,
            os_version,
            os_kernel,
            os_machine,
            os_nodename: hostname.clone(),
            hostname,
            uptime_seconds: uptime_seconds(),
            architecture: std::env::consts::ARCH.to_string(),
            platform: std::env::consts::OS.to_string(),
            cpu_count: num_cpus::get(),
        }
    }

    /// The value of one attribute, or `None` for an unknown key or an
    /// uptime the host does not report.
    pub fn attribute(&self, ctx: &Context, key: &str) -> Result<Option<Item>, MosaicError> {
        let text = |value: &str| ctx.string(value).map(Some);
        let uptime = |divisor: u64| self.uptime_seconds.map(|s| Item::make_int((s / divisor) as i64));
        Ok(match key {
            "os.name" => text(&self.os_name)?,
            "os.version" => text(&self.os_version)?,
            "os.kernel" => text(&self.os_kernel)?,
            "os.machine" => text(&self.os_machine)?,
            "os.nodename" => text(&self.os_nodename)?,
            "hostname" => text(&self.hostname)?,
            "uptime.seconds" => uptime(1),
            "uptime.days" => uptime(86_400),
            "uptime.hours" => uptime(3_600),
            "uptime.minutes" => uptime(60),
            "architecture" => text(&self.architecture)?,
            "platform" => text(&self.platform)?,
            "cpu.count" => Some(Item::make_int(self.cpu_count as i64)),
            "category" => text("system/info")?,
            _ => None,
        })
    }

    pub fn to_item(&self, ctx: &Context) -> Result<Item, MosaicError> {
        let mut element = ctx.element("system")?;
        for key in Self::KEYS {
            if let Some(value) = self.attribute(ctx, key)? {
                element.attr(key, value)?;
            }
        }
        Ok(element.into_item()?)
    }
}

fn fallback_os_name() -> &'static str {
    match std::env::consts::OS {
        "linux" => "Linux",
        "macos" => "Darwin",
        "windows" => "Windows",
        "freebsd" => "FreeBSD",
        other => other,
    }
}

struct Uname {
    sysname: String,
    nodename: String,
    release: String,
    version: String,
    machine: String,
}

#[cfg(unix)]
fn uname() -> Option<Uname> {
    use std::ffi::CStr;
    use std::mem::MaybeUninit;

    let mut raw = MaybeUninit::<libc::utsname>::uninit();
    // SAFETY: uname only writes into the buffer it is handed.
    if unsafe { libc::uname(raw.as_mut_ptr()) } != 0 {
        log::warn!("uname failed: {}", std::io::Error::last_os_error());
        return None;
    }
    // SAFETY: uname returned 0, so every field is a NUL-terminated string.
    let raw = unsafe { raw.assume_init() };
    // SAFETY: each utsname field is a NUL-terminated array owned by `raw`.
    let field = |chars: &[libc::c_char]| unsafe {
        CStr::from_ptr(chars.as_ptr()).to_string_lossy().into_owned()
    };
    Some(Uname {
        sysname: field(&raw.sysname),
        nodename: field(&raw.nodename),
        release: field(&raw.release),
        version: field(&raw.version),
        machine: field(&raw.machine),
    })
}

#[cfg(not(unix))]
fn uname() -> Option<Uname> {
    None
}

#[cfg(target_os = "linux")]
fn uptime_seconds() -> Option<u64> {
    let text = std::fs::read_to_string("/proc/uptime").ok()?;
    let seconds: f64 = text.split_whitespace().next()?.parse().ok()?;
    Some(seconds as u64)
}

#[cfg(not(target_os = "linux"))]
fn uptime_seconds() -> Option<u64> {
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> SystemInfo {
        SystemInfo {
            os_name: "Linux".into(),
            os_version: "6.1.0".into(),
            os_kernel: "#1 SMP".into(),
            os_machine: "x86_64".into(),
            os_nodename: "box".into(),
            hostname: "box".into(),
            uptime_seconds: Some(90_061),
            architecture: "x86_64".into(),
            platform: "linux".into(),
            cpu_count: 8,
        }
    }

    #[test]
    fn test_parse_sys_paths() {
        let path = SysPath::parse("sys://system/info").unwrap();
        assert_eq!((path.category, path.subcategory, path.item), ("system", "info", None));
        let path = SysPath::parse("sys://system/info/hostname").unwrap();
        assert_eq!(path.item, Some("hostname"));
        assert!(SysPath::parse("sys://system").is_err());
        assert!(SysPath::parse("file:///etc/hosts").is_err());
        assert!(SysPath::parse("sys://a/b/c/d").is_err());
    }

    #[test]
    fn test_resolve_relative_paths() {
        assert_eq!(resolve("system/info", None), "sys://system/info");
        assert_eq!(resolve("info", Some("sys://system/")), "sys://system/info");
        assert_eq!(resolve(" sys://system/info\n", Some("http://x")), "sys://system/info");
    }

    #[test]
    fn test_info_element_attributes() {
        let ctx = Context::new();
        let item = sample().to_item(&ctx).unwrap();
        let element = item.reader().as_element().unwrap();
        assert_eq!(element.tag(), "system");
        assert_eq!(element.attr_str("os.name"), Some("Linux"));
        assert_eq!(element.attr_str("hostname"), Some("box"));
        assert_eq!(element.attr_int("uptime.seconds"), Some(90_061));
        assert_eq!(element.attr_int("uptime.days"), Some(1));
        assert_eq!(element.attr_int("uptime.hours"), Some(25));
        assert_eq!(element.attr_int("uptime.minutes"), Some(1501));
        assert_eq!(element.attr_int("cpu.count"), Some(8));
    }

    #[test]
    fn test_missing_uptime_is_left_out() {
        let ctx = Context::new();
        let info = SystemInfo {
            uptime_seconds: None,
            ..sample()
        };
        let item = info.to_item(&ctx).unwrap();
        let element = item.reader().as_element().unwrap();
        assert!(!element.has_attr("uptime.seconds"));
        assert!(element.has_attr("platform"));
    }

    #[test]
    fn test_load_live_host() {
        let ctx = Context::new();
        let item = load(&ctx, "sys://system/info").unwrap();
        let element = item.reader().as_element().unwrap();
        assert_eq!(element.attr_str("platform"), Some(std::env::consts::OS));
        assert!(element.attr_int("cpu.count").unwrap_or(0) >= 1);

        let arch = load(&ctx, "sys://system/info/architecture").unwrap();
        assert_eq!(arch.reader().as_str(), Some(std::env::consts::ARCH));
    }

    #[cfg(unix)]
    #[test]
    fn test_uname_fields() {
        let info = uname().unwrap();
        assert!(!info.sysname.is_empty());
        assert!(!info.machine.is_empty());
        assert!(!info.sysname.contains('\0'));
    }

    #[test]
    fn test_unknown_categories_are_not_found() {
        let ctx = Context::new();
        assert!(matches!(load(&ctx, "sys://disk/usage"), Err(MosaicError::NotFound(_))));
        assert!(matches!(
            load(&ctx, "sys://system/info/colour"),
            Err(MosaicError::NotFound(_))
        ));
    }
}
