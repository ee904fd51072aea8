//! iOS `itms-services` install manifest.

use betadrop_protocol::{BundleRecord, Platform};
use plist::{Dictionary, Value};

use crate::OtaError;

pub const MANIFEST_CONTENT_TYPE: &str = "application/x-plist";

/// URLs the manifest points a device at.
#[derive(Debug, Clone)]
pub struct ManifestUrls {
    /// Where the package is fetched; the download endpoint, never the
    /// manifest itself.
    pub package: String,
    pub icon: String,
}

/// Renders the XML plist for an iOS bundle.
pub fn render(record: &BundleRecord, urls: &ManifestUrls) -> Result<Vec<u8>, OtaError> {
    if record.platform != Platform::Ios {
        return Err(OtaError::UnsupportedPlatform(record.platform));
    }

    let assets = vec![
        asset("software-package", &urls.package),
        asset("display-image", &urls.icon),
        asset("full-size-image", &urls.icon),
    ];

    let mut metadata = Dictionary::new();
    metadata.insert("bundle-identifier".into(), Value::from(record.bundle_id.as_str()));
    metadata.insert("bundle-version".into(), Value::from(record.version.as_str()));
    metadata.insert("kind".into(), Value::from("software"));
    metadata.insert("title".into(), Value::from(record.name.as_str()));
    // Compatibility wildcard.
    metadata.insert("device-family".into(), Value::from("*"));

    let mut item = Dictionary::new();
    item.insert("assets".into(), Value::Array(assets));
    item.insert("metadata".into(), Value::Dictionary(metadata));

    let mut root = Dictionary::new();
    root.insert("items".into(), Value::Array(vec![Value::Dictionary(item)]));

    let mut xml = Vec::new();
    Value::Dictionary(root).to_writer_xml(&mut xml)?;
    Ok(xml)
}

fn asset(kind: &str, url: &str) -> Value {
    let mut dict = Dictionary::new();
    dict.insert("kind".into(), Value::from(kind));
    dict.insert("url".into(), Value::from(url));
    Value::Dictionary(dict)
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;

    fn record(platform: Platform) -> BundleRecord {
        BundleRecord {
            id: "Ab3dE9xYz0".into(),
            platform,
            name: "Demo & Co".into(),
            bundle_id: "com.example.demo".into(),
            version: "1.2.0".into(),
            build: "42".into(),
            size_bytes: 1,
            changelog: String::new(),
            downloads: 0,
            created_at: Utc::now(),
        }
    }

    fn urls() -> ManifestUrls {
        ManifestUrls {
            package: "https://h/bundle/Ab3dE9xYz0/download".into(),
            icon: "https://h/icon/Ab3dE9xYz0.png".into(),
        }
    }

    #[test]
    fn manifest_structure() {
        let xml = render(&record(Platform::Ios), &urls()).unwrap();
        let value = Value::from_reader_xml(xml.as_slice()).unwrap();

        let item = value.as_dictionary().unwrap().get("items").unwrap().as_array().unwrap()[0]
            .as_dictionary()
            .unwrap();
        let assets = item.get("assets").unwrap().as_array().unwrap();
        let kinds: Vec<_> = assets
            .iter()
            .map(|a| a.as_dictionary().unwrap().get("kind").unwrap().as_string().unwrap())
            .collect();
        assert_eq!(kinds, ["software-package", "display-image", "full-size-image"]);

        let package_url = assets[0].as_dictionary().unwrap().get("url").unwrap().as_string().unwrap();
        assert_eq!(package_url, "https://h/bundle/Ab3dE9xYz0/download");

        let meta = item.get("metadata").unwrap().as_dictionary().unwrap();
        assert_eq!(meta.get("bundle-identifier").unwrap().as_string(), Some("com.example.demo"));
        assert_eq!(meta.get("bundle-version").unwrap().as_string(), Some("1.2.0"));
        assert_eq!(meta.get("kind").unwrap().as_string(), Some("software"));
        assert_eq!(meta.get("title").unwrap().as_string(), Some("Demo & Co"));
        assert_eq!(meta.get("device-family").unwrap().as_string(), Some("*"));
    }

    #[test]
    fn xml_escapes_title() {
        let xml = render(&record(Platform::Ios), &urls()).unwrap();
        let text = String::from_utf8(xml).unwrap();
        assert!(text.contains("Demo &amp; Co"));
    }

    #[test]
    fn android_has_no_manifest() {
        let err = render(&record(Platform::Android), &urls()).unwrap_err();
        assert!(matches!(err, OtaError::UnsupportedPlatform(Platform::Android)));
    }
}
