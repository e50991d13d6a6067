// ─── HotSpot settings probe ───
// `java -XshowSettings:properties -version` dumps the property table on
// the diagnostic stream. Property lines are indented exactly four
// spaces; continuation values (multi-entry paths) get eight.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use tracing::debug;

/// One parsed property value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SettingValue {
    Single(String),
    List(Vec<String>),
}

/// The JVM's property dump, keyed by property name.
///
/// `java.library.path` is always a [`SettingValue::List`], even when the
/// dump produced a single entry.
#[derive(Debug, Clone, Default)]
pub struct HotSpotSettings {
    values: HashMap<String, SettingValue>,
}

impl HotSpotSettings {
    pub fn get(&self, key: &str) -> Option<&str> {
        match self.values.get(key)? {
            SettingValue::Single(v) => Some(v),
            SettingValue::List(list) => list.first().map(String::as_str),
        }
    }

    pub fn get_list(&self, key: &str) -> Option<&[String]> {
        match self.values.get(key)? {
            SettingValue::List(list) => Some(list),
            SettingValue::Single(_) => None,
        }
    }

    /// `sun.arch.data.model`, defaulting to "unknown".
    pub fn arch_data_model(&self) -> &str {
        self.get("sun.arch.data.model").unwrap_or("unknown")
    }

    pub fn os_arch(&self) -> Option<&str> {
        self.get("os.arch")
    }

    pub fn java_version(&self) -> Option<&str> {
        self.get("java.version")
    }

    pub fn java_vendor(&self) -> Option<&str> {
        self.get("java.vendor")
    }

    /// Parse the raw diagnostic output.
    pub fn parse(output: &str) -> Self {
        let mut values: HashMap<String, SettingValue> = HashMap::new();
        let mut last_key: Option<String> = None;

        for line in output.lines() {
            if let Some(continuation) = line.strip_prefix("        ") {
                // Continuation entry belonging to the previous property.
                let Some(key) = &last_key else { continue };
                let entry = continuation.trim().to_string();
                match values.get_mut(key) {
                    Some(SettingValue::List(list)) => list.push(entry),
                    Some(SettingValue::Single(first)) => {
                        let list = vec![std::mem::take(first), entry];
                        values.insert(key.clone(), SettingValue::List(list));
                    }
                    None => {
                        values.insert(key.clone(), SettingValue::List(vec![entry]));
                    }
                }
            } else if let Some(property) = line.strip_prefix("    ") {
                let Some((key, value)) = property.split_once('=') else {
                    continue;
                };
                let key = key.trim().to_string();
                let value = value.trim().to_string();
                last_key = Some(key.clone());
                values.insert(key, SettingValue::Single(value));
            }
        }

        // Callers iterate library paths unconditionally.
        if let Some(SettingValue::Single(single)) = values.get("java.library.path") {
            let single = single.clone();
            values.insert(
                "java.library.path".into(),
                SettingValue::List(vec![single]),
            );
        }

        Self { values }
    }
}

/// Run the probe against a Java executable and parse its output.
///
/// A `javaw.exe` path is retargeted to `java.exe` (the windowless
/// launcher swallows the diagnostic stream). Returns `None` when the
/// executable is missing or refuses to run.
pub async fn extract_settings(exec_path: &Path) -> Option<HotSpotSettings> {
    let exec_path = retarget_windowless(exec_path);

    if !exec_path.exists() {
        debug!("Java executable missing: {:?}", exec_path);
        return None;
    }

    let output = tokio::process::Command::new(&exec_path)
        .args(["-XshowSettings:properties", "-version"])
        .output()
        .await
        .ok()?;

    let stderr = String::from_utf8_lossy(&output.stderr);
    let settings = HotSpotSettings::parse(&stderr);
    debug!(
        "Probed {:?}: java.version={:?}",
        exec_path,
        settings.java_version()
    );
    Some(settings)
}

fn retarget_windowless(exec_path: &Path) -> PathBuf {
    match exec_path.file_name().and_then(|n| n.to_str()) {
        Some("javaw.exe") => exec_path.with_file_name("java.exe"),
        _ => exec_path.to_path_buf(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "Property settings:\n    java.class.version = 61.0\n    java.home = /usr/lib/jvm/temurin-17\n    java.library.path = /usr/java/packages/lib\n        /usr/lib64\n        /lib64\n    java.vendor = Eclipse Adoptium\n    java.version = 17.0.5\n    os.arch = amd64\n    sun.arch.data.model = 64\n\nopenjdk version \"17.0.5\" 2022-10-18\n";

    #[test]
    fn parses_properties_and_continuations() {
        let settings = HotSpotSettings::parse(SAMPLE);

        assert_eq!(settings.java_version(), Some("17.0.5"));
        assert_eq!(settings.java_vendor(), Some("Eclipse Adoptium"));
        assert_eq!(settings.arch_data_model(), "64");
        assert_eq!(settings.os_arch(), Some("amd64"));
        assert_eq!(
            settings.get_list("java.library.path").unwrap(),
            &[
                "/usr/java/packages/lib".to_string(),
                "/usr/lib64".to_string(),
                "/lib64".to_string()
            ]
        );
    }

    #[test]
    fn single_library_path_is_forced_to_a_list() {
        let settings =
            HotSpotSettings::parse("    java.library.path = C:\\Windows\\system32\n");
        assert_eq!(
            settings.get_list("java.library.path").unwrap(),
            &["C:\\Windows\\system32".to_string()]
        );
    }

    #[test]
    fn unindented_lines_are_ignored() {
        let settings = HotSpotSettings::parse("Property settings:\njunk = nope\n    real = yes\n");
        assert_eq!(settings.get("junk"), None);
        assert_eq!(settings.get("real"), Some("yes"));
    }

    #[test]
    fn missing_data_model_reads_unknown() {
        let settings = HotSpotSettings::parse("    java.version = 8\n");
        assert_eq!(settings.arch_data_model(), "unknown");
    }

    #[test]
    fn windowless_launcher_is_retargeted() {
        let retargeted = retarget_windowless(Path::new(r"C:\jdk\bin\javaw.exe"));
        assert_eq!(retargeted, PathBuf::from(r"C:\jdk\bin\java.exe"));
        let untouched = retarget_windowless(Path::new("/usr/bin/java"));
        assert_eq!(untouched, PathBuf::from("/usr/bin/java"));
    }
}
