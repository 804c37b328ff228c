use std::fs::File;
use std::path::Path;

use serde::Serialize;

use crate::config::lowercase_extension;
use crate::error::AppError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FileCategory {
    Image,
    Document,
    Spreadsheet,
    Code,
    Data,
    Archive,
    Other,
}

impl FileCategory {
    pub fn label(self) -> &'static str {
        match self {
            Self::Image => "image",
            Self::Document => "document",
            Self::Spreadsheet => "spreadsheet",
            Self::Code => "code",
            Self::Data => "data",
            Self::Archive => "archive",
            Self::Other => "other",
        }
    }

    /// Folder name a rules-based oracle files this category under.
    pub fn default_folder_name(self) -> &'static str {
        match self {
            Self::Image => "images",
            Self::Document => "documents",
            Self::Spreadsheet => "spreadsheets",
            Self::Code => "code",
            Self::Data => "data",
            Self::Archive => "archives",
            Self::Other => "other",
        }
    }
}

impl std::fmt::Display for FileCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

pub fn categorize(path: &Path) -> FileCategory {
    let Some(extension) = lowercase_extension(path) else {
        return FileCategory::Other;
    };
    match extension.as_str() {
        "jpg" | "jpeg" | "png" | "gif" | "bmp" => FileCategory::Image,
        "txt" | "docx" | "pdf" | "md" => FileCategory::Document,
        "xlsx" | "csv" => FileCategory::Spreadsheet,
        "py" | "js" | "html" | "css" | "java" | "cpp" | "c" => FileCategory::Code,
        "json" | "xml" => FileCategory::Data,
        "zip" | "rar" | "7z" => FileCategory::Archive,
        _ => FileCategory::Other,
    }
}

/// Reads what the oracle gets to see of a file. Office documents and PDFs
/// are summarized by name and size; zip archives by their entry names.
pub fn read_content(path: &Path) -> Result<String, AppError> {
    let extension = lowercase_extension(path).unwrap_or_default();
    match extension.as_str() {
        "docx" | "xlsx" | "pdf" => {
            let size = std::fs::metadata(path)
                .map_err(|e| AppError::from_io(e, path))?
                .len();
            let name = path
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_default();
            Ok(format!("File: {name}, Size: {size} bytes"))
        }
        "zip" => list_archive(path),
        _ => {
            let bytes = std::fs::read(path).map_err(|e| AppError::from_io(e, path))?;
            Ok(String::from_utf8_lossy(&bytes).into_owned())
        }
    }
}

fn list_archive(path: &Path) -> Result<String, AppError> {
    let file = File::open(path).map_err(|e| AppError::from_io(e, path))?;
    let archive = zip::ZipArchive::new(file)
        .map_err(|e| AppError::General(format!("unreadable archive {}: {e}", path.display())))?;
    let names: Vec<&str> = archive.file_names().collect();
    Ok(names.join("\n"))
}
