//! External Dependency Manager for Unity (EDM4U) project files.
//!
//! `ProjectSettings/GvhProjectSettings.xml` is a flat list of
//! `<projectSetting name="..." value="..." />` entries. It is parsed into an
//! ordered key/value list so unrelated entries survive a rewrite.

use regex::Regex;
use std::sync::OnceLock;

pub const SETTINGS_FILE: &str = "ProjectSettings/GvhProjectSettings.xml";
pub const PACKAGE_NAME: &str = "com.google.external-dependency-manager";
pub const LEGACY_PLUGIN_DIR: &str = "Assets/ExternalDependencyManager";

pub const COCOAPODS_INSTALL_ENABLED: &str = "Google.IOSResolver.CocoapodsInstallEnabled";
pub const COCOAPODS_INTEGRATION_METHOD: &str = "Google.IOSResolver.CocoapodsIntegrationMethod";
pub const POD_TOOL_VIA_SHELL: &str = "Google.IOSResolver.PodToolExecutionViaShellEnabled";
pub const AUTO_POD_TOOL_INSTALL: &str = "Google.IOSResolver.AutoPodToolInstallInEditor";
pub const POD_TOOL_PATH: &str = "Google.IOSResolver.PodToolPath";

/// How the iOS resolver wires pods into the generated Xcode project.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum IntegrationMethod {
    None = 0,
    Project = 1,
    Workspace = 2,
}

impl IntegrationMethod {
    pub fn from_setting(value: &str) -> Option<Self> {
        match value.trim() {
            "0" => Some(IntegrationMethod::None),
            "1" => Some(IntegrationMethod::Project),
            "2" => Some(IntegrationMethod::Workspace),
            _ => None,
        }
    }

    pub fn as_setting(self) -> String {
        (self as u8).to_string()
    }
}

fn setting_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"<projectSetting\s+name="([^"]*)"\s+value="([^"]*)"\s*/>"#)
            .expect("static projectSetting regex")
    })
}

fn escape(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

fn unescape(value: &str) -> String {
    value
        .replace("&quot;", "\"")
        .replace("&gt;", ">")
        .replace("&lt;", "<")
        .replace("&amp;", "&")
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct GvhSettings {
    entries: Vec<(String, String)>,
}

impl GvhSettings {
    pub fn parse(xml: &str) -> Self {
        let entries = setting_re()
            .captures_iter(xml)
            .map(|caps| (unescape(&caps[1]), unescape(&caps[2])))
            .collect();
        Self { entries }
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    /// `True`/`False` as Unity writes them, case-insensitive.
    pub fn get_bool(&self, name: &str) -> Option<bool> {
        match self.get(name)?.trim().to_ascii_lowercase().as_str() {
            "true" => Some(true),
            "false" => Some(false),
            _ => None,
        }
    }

    /// Sets `name`, returning true when the stored value changed.
    pub fn set(&mut self, name: &str, value: impl Into<String>) -> bool {
        let value = value.into();
        match self.entries.iter_mut().find(|(key, _)| key == name) {
            Some((_, existing)) if *existing == value => false,
            Some((_, existing)) => {
                *existing = value;
                true
            }
            None => {
                self.entries.push((name.to_string(), value));
                true
            }
        }
    }

    pub fn set_bool(&mut self, name: &str, value: bool) -> bool {
        self.set(name, if value { "True" } else { "False" })
    }

    pub fn render(&self) -> String {
        let mut out = String::from("<?xml version=\"1.0\" encoding=\"utf-8\"?>\n<projectSettings>\n");
        for (name, value) in &self.entries {
            out.push_str(&format!(
                "  <projectSetting name=\"{}\" value=\"{}\" />\n",
                escape(name),
                escape(value)
            ));
        }
        out.push_str("</projectSettings>\n");
        out
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Applies the settings the iOS build expects, returning the names that changed.
pub fn apply_ios_integration(settings: &mut GvhSettings, pod_tool: &str) -> Vec<&'static str> {
    let mut changed = Vec::new();
    if settings.set(POD_TOOL_PATH, pod_tool) {
        changed.push(POD_TOOL_PATH);
    }
    if settings.set_bool(COCOAPODS_INSTALL_ENABLED, true) {
        changed.push(COCOAPODS_INSTALL_ENABLED);
    }
    if settings.set(
        COCOAPODS_INTEGRATION_METHOD,
        IntegrationMethod::Workspace.as_setting(),
    ) {
        changed.push(COCOAPODS_INTEGRATION_METHOD);
    }
    if settings.set_bool(POD_TOOL_VIA_SHELL, true) {
        changed.push(POD_TOOL_VIA_SHELL);
    }
    if settings.set_bool(AUTO_POD_TOOL_INSTALL, false) {
        changed.push(AUTO_POD_TOOL_INSTALL);
    }
    changed
}

/// True when `Packages/manifest.json` lists the EDM4U package.
pub fn manifest_has_package(manifest_json: &str) -> Result<bool, serde_json::Error> {
    let manifest: serde_json::Value = serde_json::from_str(manifest_json)?;
    Ok(manifest
        .get("dependencies")
        .and_then(|deps| deps.as_object())
        .map(|deps| deps.contains_key(PACKAGE_NAME))
        .unwrap_or(false))
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct IosPod {
    pub name: String,
    pub version: Option<String>,
}

fn ios_pod_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r#"<iosPod\b([^>]*)>"#).expect("static iosPod regex"))
}

fn attribute_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"([A-Za-z_][A-Za-z0-9_]*)\s*=\s*"([^"]*)""#).expect("static attribute regex")
    })
}

/// `<iosPod>` declarations in an EDM4U `*Dependencies.xml` file.
pub fn ios_pods(dependencies_xml: &str) -> Vec<IosPod> {
    ios_pod_re()
        .captures_iter(dependencies_xml)
        .map(|caps| {
            let mut pod = IosPod {
                name: String::new(),
                version: None,
            };
            for attr in attribute_re().captures_iter(&caps[1]) {
                match &attr[1] {
                    "name" => pod.name = unescape(&attr[2]),
                    "version" if !attr[2].trim().is_empty() => {
                        pod.version = Some(unescape(&attr[2]))
                    }
                    _ => {}
                }
            }
            pod
        })
        .collect()
}
