#![forbid(unsafe_code)]

//! Shared handler shapes for the common element flavours.
//!
//! Most SAML elements fall into two camps: containers (attributes plus
//! child elements, no text) and value elements (text content plus
//! attributes). The engine defaults already copy generic attributes, so
//! these handlers only add what the flavour needs; element kinds with
//! wire-format validation get their own unmarshallers elsewhere.

use chrono::DateTime;
use sigtuna_core::{Error, Result};
use sigtuna_object::{ElementMarshaller, ElementUnmarshaller, NodeId, ObjectTree};
use sigtuna_xml::{Element, QName};

/// Marshaller for container elements: engine defaults all the way.
pub struct ContainerMarshaller {
    target: QName,
}

impl ContainerMarshaller {
    pub fn new(target: QName) -> Self {
        Self { target }
    }
}

impl ElementMarshaller for ContainerMarshaller {
    fn target(&self) -> &QName {
        &self.target
    }
}

/// Unmarshaller for container elements: engine defaults all the way.
pub struct ContainerUnmarshaller {
    target: QName,
}

impl ContainerUnmarshaller {
    pub fn new(target: QName) -> Self {
        Self { target }
    }
}

impl ElementUnmarshaller for ContainerUnmarshaller {
    fn target(&self) -> &QName {
        &self.target
    }
}

/// Marshaller for value elements: emits the node's text content.
pub struct ValueMarshaller {
    target: QName,
}

impl ValueMarshaller {
    pub fn new(target: QName) -> Self {
        Self { target }
    }
}

impl ElementMarshaller for ValueMarshaller {
    fn target(&self) -> &QName {
        &self.target
    }

    fn marshal_content(&self, tree: &ObjectTree, node: NodeId, element: &mut Element) -> Result<()> {
        if let Some(text) = tree.text(node) {
            element.append_text(text);
        }
        Ok(())
    }
}

/// Unmarshaller for value elements: stores the element text.
pub struct ValueUnmarshaller {
    target: QName,
}

impl ValueUnmarshaller {
    pub fn new(target: QName) -> Self {
        Self { target }
    }
}

impl ElementUnmarshaller for ValueUnmarshaller {
    fn target(&self) -> &QName {
        &self.target
    }

    fn unmarshal_content(&self, tree: &mut ObjectTree, node: NodeId, content: &str) -> Result<()> {
        tree.set_text(node, content);
        Ok(())
    }
}

/// Validate one xs:dateTime attribute value off the wire.
pub(crate) fn check_date_time(attribute: &str, value: &str) -> Result<()> {
    DateTime::parse_from_rfc3339(value).map_err(|e| {
        Error::AttributeFormat(format!("{attribute} is not a valid dateTime: {e}"))
    })?;
    Ok(())
}
