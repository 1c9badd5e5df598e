//! Path grammar and resolution.
//!
//! Paths are absolute and `/`-separated. Empty components, as produced by
//! duplicate or trailing slashes, are skipped, so `/a//b/` names the same
//! inode as `/a/b`.

use crate::config::MAX_NAME_LEN;
use crate::structs::Inode;
use crate::{directory, inode, Error, Result};

/// Splits an absolute path into validated components.
///
/// Every component is checked here, so operations reject over-long or
/// NUL-carrying names before touching the region.
pub(crate) fn components(path: &str) -> Result<Vec<&str>> {
    if !path.starts_with('/') {
        return Err(Error::InvalidPath);
    }
    let comps: Vec<&str> = path.split('/').filter(|c| !c.is_empty()).collect();
    for c in &comps {
        if c.len() > MAX_NAME_LEN {
            return Err(Error::NameTooLong);
        }
        if c.contains('\0') {
            return Err(Error::InvalidPath);
        }
    }
    Ok(comps)
}

/// Resolves a path to the offset of its inode, creating the root lazily.
pub(crate) fn resolve(region: &mut [u8], path: &str) -> Result<u64> {
    let root_off = inode::ensure_root(region)?;
    let comps = components(path)?;

    let mut cur_off = root_off;
    for name in comps {
        let cur: Inode = inode::get_inode(region, cur_off);
        if !cur.is_dir() {
            return Err(Error::NotADirectory);
        }
        cur_off = directory::lookup_child(region, &cur, name)?;
    }
    Ok(cur_off)
}

/// Splits a path into its parent path and final name.
/// An empty final name means the path denotes the root itself.
/// eg. "/home/user/file.txt" -> ("/home/user", "file.txt")
///     "/file.txt" -> ("/", "file.txt")
pub(crate) fn split(path: &str) -> Result<(String, String)> {
    let mut comps = components(path)?;
    let name = comps.pop().unwrap_or("").to_string();
    let parent = if comps.is_empty() {
        "/".to_string()
    } else {
        format!("/{}", comps.join("/"))
    };
    Ok((parent, name))
}
