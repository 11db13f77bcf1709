//! Loading of template families from `.prompt` source files.
//!
//! A file holds one family, named after the file stem. An optional first
//! line `@category public|private` fixes the category; variants follow in
//! chronological order, separated by lines containing only `---`.

use std::fs;
use std::path::{Path, PathBuf};

use notegen_primitives::{Category, FamilyKey};
use tracing::info;

use crate::binder::ensure_single_placeholder;
use crate::error::{PromptError, PromptResult};
use crate::store::TemplateStore;

/// File extension recognised by [`load_dir`].
pub const TEMPLATE_EXTENSION: &str = "prompt";

const CATEGORY_DIRECTIVE: &str = "@category";
const VARIANT_SEPARATOR: &str = "---";

/// Parsed contents of a template source file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateFile {
    /// Category declared in the header, if any.
    pub category: Option<Category>,
    /// Variant texts in chronological order.
    pub variants: Vec<String>,
}

/// Parses template file contents.
///
/// # Errors
///
/// Returns [`PromptError::Primitive`] if the category header names an unknown
/// category.
pub fn parse(contents: &str) -> PromptResult<TemplateFile> {
    let mut lines = contents.lines().peekable();
    while lines.peek().is_some_and(|line| line.trim().is_empty()) {
        lines.next();
    }

    let mut category = None;
    if let Some(rest) = lines
        .peek()
        .and_then(|line| line.trim().strip_prefix(CATEGORY_DIRECTIVE))
    {
        category = Some(rest.parse::<Category>()?);
        lines.next();
    }

    let mut variants = Vec::new();
    let mut current: Vec<&str> = Vec::new();
    for line in lines {
        if line.trim() == VARIANT_SEPARATOR {
            push_variant(&mut variants, &current);
            current.clear();
        } else {
            current.push(line);
        }
    }
    push_variant(&mut variants, &current);

    Ok(TemplateFile { category, variants })
}

fn push_variant(variants: &mut Vec<String>, lines: &[&str]) {
    let text = lines.join("\n");
    let text = text.trim();
    if !text.is_empty() {
        variants.push(text.to_owned());
    }
}

/// Registers every variant in the file at `path`, in file order.
///
/// Every variant is checked before the first is registered, so a rejected
/// file leaves the store untouched.
///
/// `fallback` supplies the category when the file has no header.
///
/// # Errors
///
/// Returns [`PromptError::Io`] if the file cannot be read,
/// [`PromptError::TemplateFile`] if it has no category or no variants, and
/// any registration error from the store.
pub fn load_file(
    store: &TemplateStore,
    path: impl AsRef<Path>,
    fallback: Option<Category>,
) -> PromptResult<usize> {
    let path = path.as_ref();
    let family = family_from_path(path)?;
    let contents = fs::read_to_string(path).map_err(|source| PromptError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let file = parse(&contents)?;

    let category = file
        .category
        .or(fallback)
        .ok_or_else(|| invalid(path, "missing `@category public|private` header"))?;
    if file.variants.is_empty() {
        return Err(invalid(path, "file contains no variants"));
    }

    // Validate every variant before registering any.
    for text in &file.variants {
        ensure_single_placeholder(text)?;
    }
    for text in &file.variants {
        store.register(&family, category, text.as_str())?;
    }

    info!(
        family = %family,
        %category,
        variants = file.variants.len(),
        path = %path.display(),
        "template file loaded"
    );
    Ok(file.variants.len())
}

/// Loads every `*.prompt` file in `dir`, in file-name order.
///
/// Each file must declare its category in a header.
///
/// # Errors
///
/// Returns the first error met while reading the directory or any file.
pub fn load_dir(store: &TemplateStore, dir: impl AsRef<Path>) -> PromptResult<usize> {
    let dir = dir.as_ref();
    let io_error = |source| PromptError::Io {
        path: dir.to_path_buf(),
        source,
    };

    let mut paths: Vec<PathBuf> = Vec::new();
    for entry in fs::read_dir(dir).map_err(io_error)? {
        let path = entry.map_err(io_error)?.path();
        if path.is_file()
            && path
                .extension()
                .is_some_and(|ext| ext == TEMPLATE_EXTENSION)
        {
            paths.push(path);
        }
    }
    paths.sort();

    let mut total = 0;
    for path in paths {
        total += load_file(store, &path, None)?;
    }
    Ok(total)
}

fn family_from_path(path: &Path) -> PromptResult<FamilyKey> {
    let stem = path
        .file_stem()
        .and_then(|stem| stem.to_str())
        .ok_or_else(|| invalid(path, "file name is not valid UTF-8"))?;
    Ok(FamilyKey::new(stem)?)
}

fn invalid(path: &Path, reason: &str) -> PromptError {
    PromptError::TemplateFile {
        path: path.to_path_buf(),
        reason: reason.to_owned(),
    }
}
