use std::path::{Component, Path};

use betadrop_protocol::{ArtifactKey, ArtifactKind, Platform};

use crate::ArtifactError;

/// Validates a requested artifact file name before it touches the file
/// system.
///
/// Rejects:
/// - Empty names and names starting with a dot
/// - Anything with more than one path component
/// - Parent directory traversal (`..`), root and prefix components
/// - Characters outside `[A-Za-z0-9._-]`
pub fn validate_file_name(name: &str) -> Result<(), ArtifactError> {
    if name.is_empty() {
        return Err(ArtifactError::InvalidName("empty name".into()));
    }
    if name.starts_with('.') {
        return Err(ArtifactError::InvalidName(format!(
            "hidden file not allowed: {name}"
        )));
    }
    if let Some(c) = name
        .chars()
        .find(|c| !(c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-')))
    {
        return Err(ArtifactError::InvalidName(format!(
            "character {c:?} not allowed: {name}"
        )));
    }

    let mut components = Path::new(name).components();
    match (components.next(), components.next()) {
        (Some(Component::Normal(_)), None) => Ok(()),
        (Some(Component::ParentDir), _) => Err(ArtifactError::InvalidName(format!(
            "parent directory traversal not allowed: {name}"
        ))),
        _ => Err(ArtifactError::InvalidName(format!(
            "single file name expected: {name}"
        ))),
    }
}

/// Resolves a served file name (`Ab3dE9xYz0.ipa`) under a storage directory
/// (`app` or `icon`) to its artifact key.
pub fn parse_file_name(dir: &str, name: &str) -> Result<ArtifactKey, ArtifactError> {
    validate_file_name(name)?;

    let (id, ext) = name
        .rsplit_once('.')
        .filter(|(id, _)| !id.is_empty() && id.chars().all(|c| c.is_ascii_alphanumeric()))
        .ok_or_else(|| ArtifactError::InvalidName(format!("expected <id>.<ext>: {name}")))?;

    let kind = match dir {
        ArtifactKind::PACKAGE_DIR => Platform::from_extension(ext).map(ArtifactKind::Package),
        ArtifactKind::ICON_DIR if ext == "png" => Some(ArtifactKind::Icon),
        _ => None,
    }
    .ok_or_else(|| ArtifactError::InvalidName(format!("unexpected file under {dir}/: {name}")))?;

    // Stored names always use the canonical lowercase extension.
    if ext != kind.extension() {
        return Err(ArtifactError::InvalidName(format!(
            "non-canonical extension: {name}"
        )));
    }

    Ok(ArtifactKey {
        id: id.to_string(),
        kind,
    })
}
