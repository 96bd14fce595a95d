//! PDF boundary: page text extraction and page-subset documents
//!
//! Records carry 1-based page numbers. Translation to the PDF library's page
//! tree happens here and nowhere else.

use lopdf::{Dictionary, Document, Object, ObjectId};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::PdfError;
use crate::models::Question;

/// Page attributes a page may inherit from its ancestors in the page tree
const INHERITABLE: [&[u8]; 4] = [b"Resources", b"MediaBox", b"CropBox", b"Rotate"];

/// Extract plain text for every page, in document order
pub fn extract_page_texts(path: &Path) -> Result<Vec<String>, PdfError> {
    let bytes = fs::read(path).map_err(|e| PdfError::Load {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;
    pdf_extract::extract_text_from_mem_by_pages(&bytes).map_err(|e| PdfError::TextExtraction {
        path: path.to_path_buf(),
        message: e.to_string(),
    })
}

/// Question pages in record order, skipping records without one
pub fn question_pages(questions: &[&Question]) -> Vec<u32> {
    questions.iter().filter_map(|q| q.question_page).collect()
}

/// Solution pages in record order, skipping records without one
pub fn solution_pages(questions: &[&Question]) -> Vec<u32> {
    questions.iter().filter_map(|q| q.solution_page).collect()
}

/// Each record's question page followed by its solution page, when present
pub fn interleaved_pages(questions: &[&Question]) -> Vec<u32> {
    questions
        .iter()
        .flat_map(|q| q.question_page.into_iter().chain(q.solution_page))
        .collect()
}

/// Source deck opened once and reused for every output document
pub struct SourceDocument {
    path: PathBuf,
    doc: Document,
    pages: BTreeMap<u32, ObjectId>,
}

impl SourceDocument {
    pub fn open(path: &Path) -> Result<Self, PdfError> {
        let doc = Document::load(path).map_err(|e| PdfError::Load {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        Ok(Self::from_document(path.to_path_buf(), doc))
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, PdfError> {
        let doc = Document::load_mem(bytes).map_err(|e| PdfError::Load {
            path: PathBuf::from("<memory>"),
            message: e.to_string(),
        })?;
        Ok(Self::from_document(PathBuf::from("<memory>"), doc))
    }

    fn from_document(path: PathBuf, doc: Document) -> Self {
        let pages = doc.get_pages();
        Self { path, doc, pages }
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    /// Build a new document holding `pages` (1-based, repeats allowed) in order
    pub fn subset(&self, pages: &[u32]) -> Result<Document, PdfError> {
        let mut doc = self.doc.clone();
        let catalog_id = doc
            .trailer
            .get(b"Root")
            .and_then(Object::as_reference)
            .map_err(|e| PdfError::PageTree(format!("no catalog: {}", e)))?;
        let root_pages_id = doc
            .get_dictionary(catalog_id)
            .and_then(|catalog| catalog.get(b"Pages"))
            .and_then(Object::as_reference)
            .map_err(|e| PdfError::PageTree(format!("no page tree root: {}", e)))?;

        let mut kids = Vec::with_capacity(pages.len());
        for &page in pages {
            let source_id = *self.pages.get(&page).ok_or(PdfError::PageOutOfRange {
                page,
                count: self.pages.len(),
            })?;
            let mut page_dict = self.flattened_page(source_id)?;
            page_dict.set("Parent", Object::Reference(root_pages_id));
            // A fresh object per placement, so a page can appear twice
            let new_id = doc.add_object(Object::Dictionary(page_dict));
            kids.push(Object::Reference(new_id));
        }

        let count = kids.len() as i64;
        let root_pages = doc
            .get_dictionary_mut(root_pages_id)
            .map_err(|e| PdfError::PageTree(e.to_string()))?;
        root_pages.set("Kids", Object::Array(kids));
        root_pages.set("Count", Object::Integer(count));

        // Outline destinations point at pages that may no longer exist
        if let Ok(catalog) = doc.get_dictionary_mut(catalog_id) {
            catalog.remove(b"Outlines");
        }

        doc.prune_objects();
        Ok(doc)
    }

    /// Copy of a page dictionary with inherited attributes made explicit
    fn flattened_page(&self, page_id: ObjectId) -> Result<Dictionary, PdfError> {
        let mut page = self
            .doc
            .get_dictionary(page_id)
            .map_err(|e| PdfError::PageTree(format!("page object {:?}: {}", page_id, e)))?
            .clone();

        let mut parent = page.get(b"Parent").and_then(Object::as_reference).ok();
        while let Some(parent_id) = parent {
            let Ok(node) = self.doc.get_dictionary(parent_id) else {
                break;
            };
            for key in INHERITABLE {
                if !page.has(key) {
                    if let Ok(value) = node.get(key) {
                        page.set(key.to_vec(), value.clone());
                    }
                }
            }
            parent = node.get(b"Parent").and_then(Object::as_reference).ok();
        }

        Ok(page)
    }

    /// Write the given pages to `out`. Returns the number of pages written.
    pub fn write_pages(&self, pages: &[u32], out: &Path) -> Result<usize, PdfError> {
        let mut doc = self.subset(pages)?;

        if let Some(parent) = out.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(|e| PdfError::Save {
                    path: out.to_path_buf(),
                    message: e.to_string(),
                })?;
            }
        }

        doc.save(out).map_err(|e| PdfError::Save {
            path: out.to_path_buf(),
            message: e.to_string(),
        })?;
        tracing::info!(
            pages = pages.len(),
            source = %self.path.display(),
            path = %out.display(),
            "wrote PDF"
        );
        Ok(pages.len())
    }
}

/// The three documents produced for one exam
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct ExamDocuments {
    pub questions: PathBuf,
    pub solutions: PathBuf,
    pub interleaved: PathBuf,
}

pub fn build_question_pdf(src: &SourceDocument, questions: &[&Question], out: &Path) -> Result<usize, PdfError> {
    src.write_pages(&question_pages(questions), out)
}

pub fn build_solution_pdf(src: &SourceDocument, questions: &[&Question], out: &Path) -> Result<usize, PdfError> {
    src.write_pages(&solution_pages(questions), out)
}

pub fn build_interleaved_pdf(src: &SourceDocument, questions: &[&Question], out: &Path) -> Result<usize, PdfError> {
    src.write_pages(&interleaved_pages(questions), out)
}

/// Write `<base>_questions.pdf`, `<base>_solutions.pdf` and `<base>_q_and_a.pdf` into `dir`
pub fn build_exam_pdfs(
    src: &SourceDocument,
    questions: &[&Question],
    dir: &Path,
    base_name: &str,
) -> Result<ExamDocuments, PdfError> {
    let docs = ExamDocuments {
        questions: dir.join(format!("{}_questions.pdf", base_name)),
        solutions: dir.join(format!("{}_solutions.pdf", base_name)),
        interleaved: dir.join(format!("{}_q_and_a.pdf", base_name)),
    };
    build_question_pdf(src, questions, &docs.questions)?;
    build_solution_pdf(src, questions, &docs.solutions)?;
    build_interleaved_pdf(src, questions, &docs.interleaved)?;
    Ok(docs)
}
