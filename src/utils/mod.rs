pub mod document_text;
