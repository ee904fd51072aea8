fn main() {
    println!("Run `cargo test -p wire-compat` to execute wire compatibility tests.");
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::path::PathBuf;

    use betadrop_ota::{DistributionEncoder, PublicOrigin};
    use betadrop_protocol::{BundleDetail, BundlePayload, BundleRecord, Platform};
    use chrono::{TimeZone, Utc};

    /// Returns the path to the fixtures directory.
    fn fixtures_dir() -> PathBuf {
        PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("fixtures")
    }

    /// Loads a fixture JSON file and returns it as a `serde_json::Value`.
    fn load_fixture(name: &str) -> serde_json::Value {
        let path = fixtures_dir().join(name);
        let data = fs::read_to_string(&path)
            .unwrap_or_else(|e| panic!("failed to read fixture {}: {e}", path.display()));
        serde_json::from_str(&data)
            .unwrap_or_else(|e| panic!("failed to parse fixture {}: {e}", path.display()))
    }

    /// Deserializes a fixture into a Rust type, re-serializes it, and compares
    /// the JSON values.
    fn roundtrip_test<T>(name: &str)
    where
        T: serde::de::DeserializeOwned + serde::Serialize,
    {
        let fixture = load_fixture(name);
        let parsed: T = serde_json::from_value(fixture.clone())
            .unwrap_or_else(|e| panic!("failed to deserialize {name}: {e}"));
        let reserialized = serde_json::to_value(&parsed)
            .unwrap_or_else(|e| panic!("failed to re-serialize {name}: {e}"));

        assert_eq!(
            fixture, reserialized,
            "roundtrip mismatch for {name}:\n  fixture: {fixture}\n  Rust:    {reserialized}"
        );
    }

    fn encoder() -> DistributionEncoder {
        DistributionEncoder::new(PublicOrigin::parse("https://ota.example.com").unwrap())
    }

    fn ios_record() -> BundleRecord {
        BundleRecord {
            id: "Ab3dE9xYz0".into(),
            platform: Platform::Ios,
            name: "Demo".into(),
            bundle_id: "com.example.demo".into(),
            version: "1.2.0".into(),
            build: "42".into(),
            size_bytes: 1_572_864,
            changelog: "fix login\\nnew icon".into(),
            downloads: 0,
            created_at: Utc.with_ymd_and_hms(2024, 3, 9, 14, 5, 59).unwrap(),
        }
    }

    fn android_record() -> BundleRecord {
        BundleRecord {
            id: "Zx81Qw0pLm".into(),
            platform: Platform::Android,
            build: "43".into(),
            changelog: String::new(),
            downloads: 17,
            ..ios_record()
        }
    }

    // --- Round-trips ---

    #[test]
    fn fixture_bundle_payload_ios() {
        roundtrip_test::<BundlePayload>("bundle_payload_ios.json");
    }

    #[test]
    fn fixture_bundle_payload_android() {
        roundtrip_test::<BundlePayload>("bundle_payload_android.json");
    }

    #[test]
    fn fixture_bundle_detail() {
        roundtrip_test::<BundleDetail>("bundle_detail.json");
    }

    // --- Encoder output matches the published contract ---

    #[test]
    fn encoder_payload_matches_ios_fixture() {
        let payload = encoder().payload(&ios_record());
        assert_eq!(
            serde_json::to_value(&payload).unwrap(),
            load_fixture("bundle_payload_ios.json")
        );
    }

    #[test]
    fn encoder_payload_matches_android_fixture() {
        let payload = encoder().payload(&android_record());
        assert_eq!(
            serde_json::to_value(&payload).unwrap(),
            load_fixture("bundle_payload_android.json")
        );
    }

    #[test]
    fn detail_matches_fixture() {
        let detail = encoder().detail(&ios_record());
        assert_eq!(
            serde_json::to_value(&detail).unwrap(),
            load_fixture("bundle_detail.json")
        );
    }

    #[test]
    fn android_detail_omits_empty_preview() {
        let detail = encoder().detail(&android_record());
        let json = serde_json::to_value(&detail).unwrap();
        assert!(json.get("changelogPreview").is_none());
        assert_eq!(json["changelog"], "");
    }
}
