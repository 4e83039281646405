#![forbid(unsafe_code)]

//! Exclusive Canonical XML 1.0 (exc-C14N) over the owned element tree.
//!
//! Algorithm URI: `http://www.w3.org/2001/10/xml-exc-c14n#`
//!
//! Only "visibly utilized" namespace declarations are output. A
//! namespace is visibly utilized if:
//! 1. Its prefix is used by the element's tag name, OR
//! 2. Its prefix is used by one of the element's attributes, OR
//! 3. The prefix appears in the InclusiveNamespaces PrefixList.
//!
//! Signature subtrees can be omitted from the output, which is the
//! enveloped-signature transform for the one document subset this
//! library canonicalizes: a signed element minus its own signature.

pub mod render;

use render::{Attr, NsDecl};
use sigtuna_core::ns;
use sigtuna_xml::{escape, Element, XmlNode};
use std::collections::{BTreeMap, HashSet};

/// Canonicalize an element subtree using Exclusive C14N 1.0.
///
/// - `inherited`: namespace bindings in scope at the element's position
///   in its document (empty for a document root);
/// - `inclusive_prefixes`: the InclusiveNamespaces PrefixList, rendered
///   even where not visibly utilized ("#default" names the default
///   namespace);
/// - `omit_signatures`: skip `ds:Signature` child subtrees (the
///   enveloped-signature transform).
pub fn canonicalize(
    element: &Element,
    inherited: &BTreeMap<String, String>,
    inclusive_prefixes: &[String],
    omit_signatures: bool,
) -> Vec<u8> {
    let prefix_set: HashSet<String> = inclusive_prefixes.iter().cloned().collect();
    let ctx = ExcC14nContext {
        inclusive_prefixes: prefix_set,
        omit_signatures,
    };
    let mut output = Vec::new();
    ctx.process_element(element, &mut output, inherited, &BTreeMap::new());
    output
}

struct ExcC14nContext {
    inclusive_prefixes: HashSet<String>,
    omit_signatures: bool,
}

impl ExcC14nContext {
    fn process_element(
        &self,
        element: &Element,
        output: &mut Vec<u8>,
        inscope: &BTreeMap<String, String>,
        rendered_ns: &BTreeMap<String, String>,
    ) {
        // Merge this element's declarations into the in-scope bindings.
        let mut inscope = inscope.clone();
        for (prefix, uri) in element.namespaces() {
            if uri.is_empty() {
                inscope.remove(prefix);
            } else {
                inscope.insert(prefix.clone(), uri.clone());
            }
        }

        // Determine which namespace prefixes are visibly utilized.
        let mut utilized: HashSet<String> = HashSet::new();
        utilized.insert(element.name().prefix().unwrap_or("").to_owned());
        for attr in element.attributes() {
            if let Some(prefix) = attr.name.prefix() {
                if !prefix.is_empty() {
                    utilized.insert(prefix.to_owned());
                }
            }
        }
        for p in &self.inclusive_prefixes {
            if p == "#default" {
                utilized.insert(String::new());
            } else {
                utilized.insert(p.clone());
            }
        }

        let mut ns_decls: Vec<NsDecl> = Vec::new();
        for prefix in &utilized {
            if prefix == "xml" {
                continue;
            }
            if let Some(uri) = inscope.get(prefix) {
                if rendered_ns.get(prefix) != Some(uri) {
                    ns_decls.push(NsDecl {
                        prefix: prefix.clone(),
                        uri: uri.clone(),
                    });
                }
            } else if prefix.is_empty() {
                // The default namespace was rendered non-empty by an
                // ancestor and is now unbound: emit xmlns="".
                if rendered_ns.get("").is_some_and(|u| !u.is_empty()) {
                    ns_decls.push(NsDecl {
                        prefix: String::new(),
                        uri: String::new(),
                    });
                }
            }
        }
        ns_decls.sort();

        let mut attrs: Vec<Attr> = Vec::new();
        for attr in element.attributes() {
            attrs.push(Attr {
                ns_uri: attr.name.namespace_uri().to_owned(),
                local_name: attr.name.local_name().to_owned(),
                qualified_name: attr.name.qualified(),
                value: attr.value.clone(),
            });
        }
        attrs.sort();

        let elem_name = element.name().qualified();

        output.push(b'<');
        output.extend_from_slice(elem_name.as_bytes());
        for ns_decl in &ns_decls {
            output.extend_from_slice(ns_decl.render().as_bytes());
        }
        for attr in &attrs {
            output.extend_from_slice(attr.render().as_bytes());
        }
        output.push(b'>');

        let mut child_rendered_ns = rendered_ns.clone();
        for ns_decl in &ns_decls {
            child_rendered_ns.insert(ns_decl.prefix.clone(), ns_decl.uri.clone());
        }

        for child in element.children() {
            match child {
                XmlNode::Element(e) => {
                    if self.omit_signatures && e.name().matches(ns::DSIG, ns::node::SIGNATURE) {
                        continue;
                    }
                    self.process_element(e, output, &inscope, &child_rendered_ns);
                }
                XmlNode::Text(t) => {
                    output.extend_from_slice(escape::escape_text(t).as_bytes());
                }
            }
        }

        output.extend_from_slice(b"</");
        output.extend_from_slice(elem_name.as_bytes());
        output.push(b'>');
    }
}
