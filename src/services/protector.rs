//! PDF protection service
//!
//! Re-encodes an uploaded PDF into a fresh document holding the same pages in
//! the same order, then applies password encryption to it.

use lopdf::{
    dictionary, Dictionary, Document, EncryptionState, EncryptionVersion, Object, ObjectId,
    Permissions, StringFormat,
};
use std::path::Path;
use thiserror::Error;
use tracing::debug;

/// Page attributes a page may inherit from its ancestors in the page tree
const INHERITABLE_PAGE_KEYS: [&[u8]; 4] = [b"Resources", b"MediaBox", b"CropBox", b"Rotate"];

/// Page trees deeper than this are treated as malformed
const MAX_TREE_DEPTH: usize = 64;

/// Errors that can occur while protecting or inspecting a document
#[derive(Error, Debug)]
pub enum ProtectError {
    /// Input could not be decoded as a PDF
    #[error("Failed to parse PDF: {0}")]
    Parse(#[from] lopdf::Error),

    /// Page tree is cyclic or unreasonably deep
    #[error("Malformed page tree: {0}")]
    MalformedPageTree(String),

    /// Input is already encrypted with a password we do not know
    #[error("Document is already password protected")]
    AlreadyEncrypted,

    /// Setting up or applying the security handler failed
    #[error("Failed to encrypt PDF: {0}")]
    Encryption(String),

    /// Writing the encrypted document failed
    #[error("Failed to serialize PDF: {0}")]
    Serialize(String),

    /// Reading or writing a scratch file failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// An encrypted document ready to be handed back to the caller
#[derive(Debug)]
pub struct ProtectedDocument {
    /// Serialized, encrypted PDF
    pub bytes: Vec<u8>,
    /// Number of pages carried over from the input
    pub page_count: usize,
}

/// Structural facts about an uploaded document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentSummary {
    /// Number of pages in the document
    pub page_count: usize,
    /// PDF header version, e.g. `1.7`
    pub version: String,
    /// Whether the document carries an encryption dictionary
    pub encrypted: bool,
}

/// PDF protection service
pub struct ProtectorService;

impl ProtectorService {
    /// Encrypt the PDF at `input`, writing the result to `output`
    ///
    /// # Returns
    /// * `Ok(usize)` - Number of pages written
    /// * `Err(ProtectError)` - If the input is not a usable PDF or a file operation fails
    pub fn protect_file(
        input: &Path,
        output: &Path,
        password: &str,
    ) -> Result<usize, ProtectError> {
        let data = std::fs::read(input)?;
        let protected = Self::protect(&data, password)?;
        std::fs::write(output, &protected.bytes)?;
        Ok(protected.page_count)
    }

    /// Encrypt an in-memory PDF with `password`
    ///
    /// The same password is used as user and owner password.
    pub fn protect(data: &[u8], password: &str) -> Result<ProtectedDocument, ProtectError> {
        let source = Document::load_mem(data)?;
        if source.is_encrypted() {
            return Err(ProtectError::AlreadyEncrypted);
        }

        let mut document = copy_pages(source)?;
        let page_count = document.get_pages().len();

        document.trailer.set("ID", file_identifier());
        let state = EncryptionState::try_from(EncryptionVersion::V2 {
            document: &document,
            owner_password: password,
            user_password: password,
            key_length: 128,
            permissions: Permissions::all(),
        })
        .map_err(|e| ProtectError::Encryption(e.to_string()))?;
        document
            .encrypt(&state)
            .map_err(|e| ProtectError::Encryption(e.to_string()))?;

        let mut bytes = Vec::with_capacity(data.len());
        document
            .save_to(&mut bytes)
            .map_err(|e| ProtectError::Serialize(e.to_string()))?;

        debug!(page_count, size = bytes.len(), "Document encrypted");
        Ok(ProtectedDocument { bytes, page_count })
    }

    /// Report page count, version and encryption state of the PDF at `input`
    pub fn inspect_file(input: &Path) -> Result<DocumentSummary, ProtectError> {
        let data = std::fs::read(input)?;
        Self::inspect(&data)
    }

    /// Report page count, version and encryption state of an in-memory PDF
    pub fn inspect(data: &[u8]) -> Result<DocumentSummary, ProtectError> {
        let document = Document::load_mem(data)?;
        Ok(DocumentSummary {
            page_count: document.get_pages().len(),
            version: document.version.clone(),
            encrypted: document.is_encrypted() || document.encryption_state.is_some(),
        })
    }
}

/// Build a new document whose page tree is a single flat node holding every
/// page of `source` in order.
///
/// Attributes pages inherited from intermediate tree nodes are copied onto
/// the pages themselves, since those nodes do not survive the rebuild.
fn copy_pages(mut source: Document) -> Result<Document, ProtectError> {
    let page_ids: Vec<ObjectId> = source.get_pages().into_values().collect();

    let mut inherited = Vec::with_capacity(page_ids.len());
    for &page_id in &page_ids {
        inherited.push(inherited_attributes(&source, page_id)?);
    }

    let mut document = Document::with_version(output_version(&source.version));
    document.objects = std::mem::take(&mut source.objects);
    document.max_id = source.max_id;

    let pages_id = document.new_object_id();
    for (&page_id, attributes) in page_ids.iter().zip(inherited) {
        let page = document.get_object_mut(page_id)?.as_dict_mut()?;
        for (key, value) in attributes {
            page.set(key, value);
        }
        page.set("Parent", pages_id);
    }

    let kids: Vec<Object> = page_ids.iter().map(|&id| Object::Reference(id)).collect();
    document.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => page_ids.len() as i64,
        }),
    );

    let catalog_id = document.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    document.trailer.set("Root", catalog_id);
    if let Ok(info) = source.trailer.get(b"Info").and_then(Object::as_reference) {
        document.trailer.set("Info", info);
    }

    // Old catalog and page-tree nodes are unreachable from the new trailer
    document.prune_objects();
    document.renumber_objects();
    Ok(document)
}

fn inherited_attributes(
    document: &Document,
    page_id: ObjectId,
) -> Result<Vec<(Vec<u8>, Object)>, ProtectError> {
    let page = document.get_dictionary(page_id)?;
    let mut found: Vec<(Vec<u8>, Object)> = Vec::new();
    let mut parent = page.get(b"Parent").and_then(Object::as_reference).ok();
    let mut depth = 0;

    while let Some(node_id) = parent {
        depth += 1;
        if depth > MAX_TREE_DEPTH {
            return Err(ProtectError::MalformedPageTree(format!(
                "page {:?} is nested more than {} levels deep",
                page_id, MAX_TREE_DEPTH
            )));
        }
        let node: &Dictionary = document.get_dictionary(node_id)?;
        for key in INHERITABLE_PAGE_KEYS {
            let already = page.has(key) || found.iter().any(|(k, _)| k.as_slice() == key);
            if !already {
                if let Ok(value) = node.get(key) {
                    found.push((key.to_vec(), value.clone()));
                }
            }
        }
        parent = node.get(b"Parent").and_then(Object::as_reference).ok();
    }

    Ok(found)
}

/// RC4 encryption needs at least PDF 1.4
fn output_version(source: &str) -> String {
    match source {
        "1.0" | "1.1" | "1.2" | "1.3" => "1.4".to_string(),
        other => other.to_string(),
    }
}

fn file_identifier() -> Object {
    let id = uuid::Uuid::new_v4().as_bytes().to_vec();
    Object::Array(vec![
        Object::String(id.clone(), StringFormat::Hexadecimal),
        Object::String(id, StringFormat::Hexadecimal),
    ])
}
