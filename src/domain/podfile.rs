//! Podfile inspection and patching for the Unity-generated iOS project.

use regex::Regex;
use std::fmt;
use std::sync::OnceLock;

/// Dotted version, missing components count as zero.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub struct Version(pub u32, pub u32, pub u32);

impl Version {
    pub fn parse(raw: &str) -> Option<Version> {
        let mut parts = raw.trim().split('.');
        let major = parts.next()?.trim().parse().ok()?;
        let minor = match parts.next() {
            Some(p) => p.trim().parse().ok()?,
            None => 0,
        };
        let patch = match parts.next() {
            // pre-release suffixes like `0.beta.1` only keep the numeric part
            Some(p) => p
                .trim()
                .split(|c: char| !c.is_ascii_digit())
                .next()
                .and_then(|n| n.parse().ok())
                .unwrap_or(0),
            None => 0,
        };
        Some(Version(major, minor, patch))
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.2 == 0 {
            write!(f, "{}.{}", self.0, self.1)
        } else {
            write!(f, "{}.{}.{}", self.0, self.1, self.2)
        }
    }
}

fn platform_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"^\s*platform\s+:ios\s*(?:,\s*['"]([0-9][0-9.]*)['"])?"#)
            .expect("static platform regex")
    })
}

/// Version literals the marked hook pins, in the comparison and the assignment.
fn hook_version_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"(Gem::Version\.new\('|\['IPHONEOS_DEPLOYMENT_TARGET'\] = ')([0-9][0-9.]*)'"#)
            .expect("static hook version regex")
    })
}

fn is_comment(line: &str) -> bool {
    line.trim_start().starts_with('#')
}

/// Deployment target declared by `platform :ios, 'X'`.
///
/// Returns `Some(None)` when the platform line has no version.
pub fn ios_platform(podfile: &str) -> Option<Option<Version>> {
    podfile
        .lines()
        .filter(|line| !is_comment(line))
        .find_map(|line| platform_re().captures(line))
        .map(|caps| caps.get(1).and_then(|v| Version::parse(v.as_str())))
}

/// True when `use_frameworks!` is active without static linkage. Unity's
/// UnityFramework target breaks with dynamic pod frameworks.
pub fn uses_dynamic_frameworks(podfile: &str) -> bool {
    podfile
        .lines()
        .filter(|line| !is_comment(line))
        .filter(|line| line.contains("use_frameworks!"))
        .any(|line| !(line.contains(":linkage => :static") || line.contains("linkage: :static")))
}

pub const PATCH_MARKER: &str = "# pipewright: deployment target";

#[derive(Debug, Default, PartialEq, Eq)]
pub struct PatchOutcome {
    pub content: String,
    pub changes: Vec<String>,
}

fn deployment_target_lines(min: Version, indent: &str) -> Vec<String> {
    vec![
        format!("{}{}", indent, PATCH_MARKER),
        format!("{}installer.pods_project.targets.each do |target|", indent),
        format!("{}  target.build_configurations.each do |config|", indent),
        format!(
            "{}    if Gem::Version.new(config.build_settings['IPHONEOS_DEPLOYMENT_TARGET'] || '0') < Gem::Version.new('{}')",
            indent, min
        ),
        format!(
            "{}      config.build_settings['IPHONEOS_DEPLOYMENT_TARGET'] = '{}'",
            indent, min
        ),
        format!("{}    end", indent),
        format!("{}  end", indent),
        format!("{}end", indent),
    ]
}

/// Raises the Podfile's iOS deployment target to at least `min` and makes
/// every pod target build with it. Running it twice changes nothing the
/// second time.
pub fn patch(podfile: &str, min: Version) -> PatchOutcome {
    let mut lines: Vec<String> = podfile.lines().map(String::from).collect();
    let mut changes = Vec::new();

    let platform_index = lines
        .iter()
        .position(|line| !is_comment(line) && platform_re().is_match(line));
    match platform_index {
        Some(index) => {
            let line = &lines[index];
            let version = platform_re().captures(line).and_then(|caps| caps.get(1));
            let current = version.and_then(|v| Version::parse(v.as_str()));
            if current.map(|v| v < min).unwrap_or(true) {
                changes.push(format!(
                    "platform :ios {} -> {}",
                    current.map(|v| v.to_string()).unwrap_or_else(|| "unset".into()),
                    min
                ));
                // keep indentation and anything after the declaration
                let rewritten = match version {
                    Some(v) => format!("{}{}{}", &line[..v.start()], min, &line[v.end()..]),
                    None => {
                        let end = platform_re().find(line).map(|m| m.end()).unwrap_or(line.len());
                        format!("{}, '{}'{}", &line[..end], min, &line[end..])
                    }
                };
                lines[index] = rewritten;
            }
        }
        None => {
            changes.push(format!("added platform :ios, '{}'", min));
            lines.insert(0, format!("platform :ios, '{}'", min));
        }
    }

    if let Some(marker) = lines.iter().position(|line| line.trim() == PATCH_MARKER) {
        let block_end = (marker + deployment_target_lines(min, "").len()).min(lines.len());
        let mut raised = None;
        for line in &mut lines[marker + 1..block_end] {
            let pinned = hook_version_re()
                .captures(line)
                .and_then(|caps| caps.get(2))
                .and_then(|v| Version::parse(v.as_str()));
            if let Some(pinned) = pinned.filter(|pinned| *pinned < min) {
                *line = hook_version_re()
                    .replace_all(line, format!("${{1}}{}'", min).as_str())
                    .into_owned();
                raised = Some(pinned);
            }
        }
        if let Some(pinned) = raised {
            changes.push(format!("post_install deployment target {} -> {}", pinned, min));
        }
    } else {
        let hook = lines
            .iter()
            .position(|line| !is_comment(line) && line.trim_start().starts_with("post_install do"));
        match hook {
            Some(index) => {
                let indent: String = lines[index]
                    .chars()
                    .take_while(|c| c.is_whitespace())
                    .collect();
                let body = deployment_target_lines(min, &format!("{}  ", indent));
                lines.splice(index + 1..index + 1, body);
                changes.push("extended existing post_install hook".to_string());
            }
            None => {
                lines.push(String::new());
                lines.push("post_install do |installer|".to_string());
                lines.extend(deployment_target_lines(min, "  "));
                lines.push("end".to_string());
                changes.push("added post_install hook".to_string());
            }
        }
    }

    let mut content = lines.join("\n");
    content.push('\n');
    PatchOutcome { content, changes }
}
