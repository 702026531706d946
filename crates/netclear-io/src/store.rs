//! Filesystem access for market descriptions.

use std::{fs, path::Path};

use netclear_types::{MarketGraph, NetclearError, Result};

use crate::{GraphDocument, parse_document};

fn io_error(path: &Path, err: &std::io::Error) -> NetclearError {
    NetclearError::Io(format!("{}: {err}", path.display()))
}

/// Read and parse a document from `path`.
///
/// # Errors
/// `Io` if the file cannot be read, `Serialization` if it is not a
/// node-link document.
pub fn load_document(path: impl AsRef<Path>) -> Result<GraphDocument> {
    let path = path.as_ref();
    let text = fs::read_to_string(path).map_err(|err| io_error(path, &err))?;
    let doc = parse_document(&text).map_err(|err| match err {
        NetclearError::Serialization(msg) => {
            NetclearError::Serialization(format!("{}: {msg}", path.display()))
        }
        other => other,
    })?;
    tracing::debug!(
        path = %path.display(),
        nodes = doc.nodes.len(),
        links = doc.links.len(),
        "Document loaded"
    );
    Ok(doc)
}

/// Load `path` and build its market.
pub fn load_market(path: impl AsRef<Path>) -> Result<MarketGraph> {
    load_document(path)?.to_market()
}

/// Write `doc` to `path` as pretty-printed JSON.
///
/// # Errors
/// `Io` if the file cannot be written.
pub fn save_document(path: impl AsRef<Path>, doc: &GraphDocument) -> Result<()> {
    let path = path.as_ref();
    let mut text = serde_json::to_string_pretty(doc)?;
    text.push('\n');
    fs::write(path, text).map_err(|err| io_error(path, &err))?;
    tracing::debug!(path = %path.display(), "Document saved");
    Ok(())
}
