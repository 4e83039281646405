#![forbid(unsafe_code)]

//! Enveloped signature creation.
//!
//! Builds the `ds:Signature` element over a serialized element:
//! 1. Canonicalize the element (existing signatures omitted)
//! 2. Digest the canonical form
//! 3. Assemble `<SignedInfo>` with the reference to the element's ID
//! 4. Canonicalize and sign `<SignedInfo>`
//! 5. Attach `<Signature>` (with optional `KeyInfo`) inside the element

use crate::context::SigningContext;
use base64::Engine;
use sigtuna_core::{algorithm, ns, Error, Result};
use sigtuna_crypto::digest;
use sigtuna_xml::{Element, QName};
use std::collections::BTreeMap;
use tracing::debug;

/// Attribute names accepted as the signed element's identifier.
const ID_ATTRS: [&str; 3] = ["ID", "Id", "id"];

/// Sign a serialized element in place, inserting a detached-enveloped
/// `ds:Signature` child that references the element by its ID attribute.
pub fn sign(element: &mut Element, ctx: &SigningContext) -> Result<()> {
    let reference_id = ID_ATTRS
        .iter()
        .find_map(|name| element.attribute("", name))
        .map(str::to_owned)
        .ok_or_else(|| Error::Signature("signed element has no ID attribute".into()))?;

    debug!(id = %reference_id, algorithm = %ctx.signature_algorithm, "signing element");

    // Digest over the canonical form of the element, existing signature
    // subtrees omitted (the enveloped-signature transform).
    let canonical = sigtuna_c14n::canonicalize(
        element,
        &BTreeMap::new(),
        &ctx.inclusive_prefixes,
        true,
    );
    let computed = digest::digest(&ctx.digest_algorithm, &canonical)?;

    let engine = base64::engine::general_purpose::STANDARD;
    let digest_b64 = engine.encode(&computed);

    let signed_info = build_signed_info(ctx, &reference_id, &digest_b64);

    // SignedInfo is canonicalized as a document subset: the bindings
    // declared on the signed element and the ds binding on its
    // Signature parent are in scope. Verification recomputes the same
    // scope from the wire form.
    let mut inherited: BTreeMap<String, String> = element
        .namespaces()
        .iter()
        .cloned()
        .collect();
    inherited.insert(ns::prefix::DSIG.to_string(), ns::DSIG.to_string());
    let canonical_signed_info =
        sigtuna_c14n::canonicalize(&signed_info, &inherited, &ctx.inclusive_prefixes, false);

    let signing_key = ctx
        .key
        .to_signing_key()
        .filter(|k| k.can_sign())
        .ok_or_else(|| Error::Key("signing context key cannot produce signatures".into()))?;
    let sig_alg = sigtuna_crypto::sign::from_uri(&ctx.signature_algorithm)?;
    let signature_value = sig_alg.sign(&signing_key, &canonical_signed_info)?;
    let sig_b64 = engine.encode(&signature_value);

    let mut signature = Element::new(dsig_qname(ns::node::SIGNATURE));
    signature.declare_namespace(ns::prefix::DSIG, ns::DSIG);
    signature.append_element(signed_info);

    let mut sig_value = Element::new(dsig_qname(ns::node::SIGNATURE_VALUE));
    sig_value.append_text(sig_b64);
    signature.append_element(sig_value);

    if let Some(key_info) = build_key_info(ctx) {
        signature.append_element(key_info);
    }

    element.insert_element(ctx.signature_position, signature);
    Ok(())
}

fn build_signed_info(ctx: &SigningContext, reference_id: &str, digest_b64: &str) -> Element {
    let mut signed_info = Element::new(dsig_qname(ns::node::SIGNED_INFO));

    let mut c14n_method = Element::new(dsig_qname(ns::node::CANONICALIZATION_METHOD));
    c14n_method.set_attribute(QName::unqualified(ns::attr::ALGORITHM), algorithm::EXC_C14N);
    if let Some(incl) = build_inclusive_namespaces(&ctx.inclusive_prefixes) {
        c14n_method.append_element(incl);
    }
    signed_info.append_element(c14n_method);

    let mut sig_method = Element::new(dsig_qname(ns::node::SIGNATURE_METHOD));
    sig_method.set_attribute(
        QName::unqualified(ns::attr::ALGORITHM),
        ctx.signature_algorithm.clone(),
    );
    signed_info.append_element(sig_method);

    let mut reference = Element::new(dsig_qname(ns::node::REFERENCE));
    reference.set_attribute(QName::unqualified(ns::attr::URI), format!("#{reference_id}"));

    let mut transforms = Element::new(dsig_qname(ns::node::TRANSFORMS));
    let mut enveloped = Element::new(dsig_qname(ns::node::TRANSFORM));
    enveloped.set_attribute(
        QName::unqualified(ns::attr::ALGORITHM),
        algorithm::ENVELOPED_SIGNATURE,
    );
    transforms.append_element(enveloped);
    let mut exc_c14n = Element::new(dsig_qname(ns::node::TRANSFORM));
    exc_c14n.set_attribute(QName::unqualified(ns::attr::ALGORITHM), algorithm::EXC_C14N);
    if let Some(incl) = build_inclusive_namespaces(&ctx.inclusive_prefixes) {
        exc_c14n.append_element(incl);
    }
    transforms.append_element(exc_c14n);
    reference.append_element(transforms);

    let mut digest_method = Element::new(dsig_qname(ns::node::DIGEST_METHOD));
    digest_method.set_attribute(
        QName::unqualified(ns::attr::ALGORITHM),
        ctx.digest_algorithm.clone(),
    );
    reference.append_element(digest_method);

    let mut digest_value = Element::new(dsig_qname(ns::node::DIGEST_VALUE));
    digest_value.append_text(digest_b64);
    reference.append_element(digest_value);

    signed_info.append_element(reference);
    signed_info
}

fn build_inclusive_namespaces(prefixes: &[String]) -> Option<Element> {
    if prefixes.is_empty() {
        return None;
    }
    let mut incl = Element::new(QName::with_prefix(
        ns::EXC_C14N,
        ns::node::INCLUSIVE_NAMESPACES,
        ns::prefix::EXC_C14N,
    ));
    incl.declare_namespace(ns::prefix::EXC_C14N, ns::EXC_C14N);
    incl.set_attribute(
        QName::unqualified(ns::attr::PREFIX_LIST),
        prefixes.join(" "),
    );
    Some(incl)
}

fn build_key_info(ctx: &SigningContext) -> Option<Element> {
    let engine = base64::engine::general_purpose::STANDARD;
    let mut key_info = Element::new(dsig_qname(ns::node::KEY_INFO));
    let mut emitted = false;

    if let Some(name) = &ctx.key_name {
        let mut key_name = Element::new(dsig_qname(ns::node::KEY_NAME));
        key_name.append_text(name.clone());
        key_info.append_element(key_name);
        emitted = true;
    }

    if !ctx.key.x509_chain.is_empty() {
        let mut x509_data = Element::new(dsig_qname(ns::node::X509_DATA));
        for der in &ctx.key.x509_chain {
            let mut cert = Element::new(dsig_qname(ns::node::X509_CERTIFICATE));
            cert.append_text(engine.encode(der));
            x509_data.append_element(cert);
        }
        key_info.append_element(x509_data);
        emitted = true;
    }

    emitted.then_some(key_info)
}

pub(crate) fn dsig_qname(local: &str) -> QName {
    QName::with_prefix(ns::DSIG, local, ns::prefix::DSIG)
}
