//! Mapping of remote paths onto the local download root.
//!
//! Layout: `<root>/<UPPERCASE collection name>/<remote path components>`.
//! Remote paths use `/` as separator. Empty and `.` components are dropped;
//! anything that could leave the collection directory is rejected with
//! [`Error::PathTraversal`] before a single byte is written.

use std::path::{Component, Path, PathBuf};

use crate::error::{Error, Result};

/// Local destination of `remote_path` inside `collection_name` under `root`
///
/// # Examples
///
/// ```
/// use collection_mirror::paths::local_path;
/// use std::path::Path;
///
/// let p = local_path(Path::new("/mirror"), "Foo", "bar/baz.txt").unwrap();
/// assert_eq!(p, Path::new("/mirror/FOO/bar/baz.txt"));
///
/// assert!(local_path(Path::new("/mirror"), "Foo", "../../etc/passwd").is_err());
/// ```
pub fn local_path(root: &Path, collection_name: &str, remote_path: &str) -> Result<PathBuf> {
    let mut path = collection_dir(root, collection_name)?;

    let mut pushed = 0usize;
    for segment in remote_path.split('/') {
        match segment {
            "" | "." => continue,
            ".." => {
                return Err(Error::PathTraversal(format!(
                    "'{}' contains a parent-directory component",
                    remote_path
                )));
            }
            other => {
                ensure_plain_component(other, remote_path)?;
                path.push(other);
                pushed += 1;
            }
        }
    }

    if pushed == 0 {
        return Err(Error::PathTraversal(format!(
            "'{}' does not name a file inside the collection",
            remote_path
        )));
    }

    Ok(path)
}

/// Directory holding every file of a collection
pub fn collection_dir(root: &Path, collection_name: &str) -> Result<PathBuf> {
    let name = collection_name.trim().to_uppercase();
    if name.is_empty() || name.contains('/') {
        return Err(Error::PathTraversal(format!(
            "invalid collection name '{}'",
            collection_name
        )));
    }
    ensure_plain_component(&name, collection_name)?;
    Ok(root.join(name))
}

/// The host platform must see `segment` as exactly one ordinary file name.
///
/// Catches Windows drive prefixes and backslash separators that `/`
/// splitting alone would let through.
fn ensure_plain_component(segment: &str, original: &str) -> Result<()> {
    let mut components = Path::new(segment).components();
    match (components.next(), components.next()) {
        (Some(Component::Normal(c)), None) if c == segment => Ok(()),
        _ => Err(Error::PathTraversal(format!(
            "'{}' contains unsafe component '{}'",
            original, segment
        ))),
    }
}
