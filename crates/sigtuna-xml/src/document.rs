#![forbid(unsafe_code)]

//! Parse-side XML document wrapper over roxmltree.

use crate::element::Element;
use sigtuna_core::{Error, Result};

/// An owned inbound XML document. Stores the text; call
/// [`XmlDocument::parse_doc`] for a temporary `roxmltree::Document`
/// borrowing from it.
pub struct XmlDocument {
    text: String,
}

impl XmlDocument {
    /// Parse and validate XML from a string, taking ownership.
    pub fn parse(text: String) -> Result<Self> {
        let _doc = roxmltree::Document::parse_with_options(&text, crate::parsing_options())
            .map_err(|e| Error::XmlParse(e.to_string()))?;
        Ok(Self { text })
    }

    /// Parse and validate XML from bytes.
    pub fn parse_bytes(data: &[u8]) -> Result<Self> {
        let text = std::str::from_utf8(data)
            .map_err(|e| Error::XmlParse(format!("invalid UTF-8: {e}")))?
            .to_owned();
        Self::parse(text)
    }

    /// Get the raw XML text.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Parse the document and return a temporary `roxmltree::Document`.
    ///
    /// This re-parses the XML from the stored text. Call it once at the
    /// top of a processing pipeline and pass the resulting document
    /// reference down through the call chain.
    pub fn parse_doc(&self) -> Result<roxmltree::Document<'_>> {
        roxmltree::Document::parse_with_options(&self.text, crate::parsing_options())
            .map_err(|e| Error::XmlParse(e.to_string()))
    }

    /// Adopt the document's root element into an owned element tree.
    pub fn root_element(&self) -> Result<Element> {
        let doc = self.parse_doc()?;
        Element::from_node(doc.root_element())
    }
}
