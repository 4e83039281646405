#![forbid(unsafe_code)]

//! Enveloped signature verification.
//!
//! Processing order:
//! 1. Locate `<Signature>` and `<SignedInfo>` in the supplied element
//! 2. Read CanonicalizationMethod (+ PrefixList) and SignatureMethod
//! 3. Recompute the reference digest over the element minus its
//!    signature and compare against `<DigestValue>`
//! 4. Resolve the signing key from the caller's trust set
//! 5. Canonicalize `<SignedInfo>` and check `<SignatureValue>`
//!
//! A digest or key-trust mismatch is a verification *outcome*
//! ([`VerifyResult::Invalid`]); malformed signature structure is an
//! error. Neither is ever downgraded to "unsigned".

use base64::Engine;
use sigtuna_core::{algorithm, ns, Error, Result};
use sigtuna_crypto::digest;
use sigtuna_keys::{KeyUsage, KeysManager};
use sigtuna_xml::Element;
use std::collections::BTreeMap;
use tracing::debug;

/// Result of signature verification.
#[derive(Debug)]
pub enum VerifyResult {
    /// Signature is valid.
    Valid,
    /// Signature is invalid.
    Invalid { reason: String },
}

impl VerifyResult {
    pub fn is_valid(&self) -> bool {
        matches!(self, VerifyResult::Valid)
    }
}

/// Verify the enveloped signature attached to a serialized element
/// against the given trust material.
pub fn verify(element: &Element, keys: &KeysManager) -> Result<VerifyResult> {
    let signature = element
        .find_child(ns::DSIG, ns::node::SIGNATURE)
        .ok_or_else(|| Error::MissingElement("Signature".into()))?;
    let signed_info = signature
        .find_child(ns::DSIG, ns::node::SIGNED_INFO)
        .ok_or_else(|| Error::MissingElement("SignedInfo".into()))?;

    let c14n_method = signed_info
        .find_child(ns::DSIG, ns::node::CANONICALIZATION_METHOD)
        .ok_or_else(|| Error::MissingElement("CanonicalizationMethod".into()))?;
    let c14n_uri = c14n_method
        .attribute("", ns::attr::ALGORITHM)
        .ok_or_else(|| Error::MissingAttribute("Algorithm on CanonicalizationMethod".into()))?;
    if c14n_uri != algorithm::EXC_C14N && c14n_uri != algorithm::EXC_C14N_WITH_COMMENTS {
        return Err(Error::UnsupportedAlgorithm(format!("C14N: {c14n_uri}")));
    }
    let signed_info_prefixes = read_inclusive_prefixes(c14n_method);

    let sig_method = signed_info
        .find_child(ns::DSIG, ns::node::SIGNATURE_METHOD)
        .ok_or_else(|| Error::MissingElement("SignatureMethod".into()))?;
    let sig_method_uri = sig_method
        .attribute("", ns::attr::ALGORITHM)
        .ok_or_else(|| Error::MissingAttribute("Algorithm on SignatureMethod".into()))?;

    // Exactly one reference: the signed element itself.
    let references: Vec<&Element> = signed_info
        .child_elements()
        .filter(|e| e.name().matches(ns::DSIG, ns::node::REFERENCE))
        .collect();
    let [reference] = references.as_slice() else {
        return Err(Error::Signature(format!(
            "expected exactly one Reference, found {}",
            references.len()
        )));
    };

    if let VerifyResult::Invalid { reason } = verify_reference(reference, element)? {
        debug!(%reason, "reference digest check failed");
        return Ok(VerifyResult::Invalid {
            reason: format!("reference digest failed: {reason}"),
        });
    }

    // Canonicalize SignedInfo as a document subset: bindings declared on
    // the signed element and the Signature element are in scope.
    let mut inherited = BTreeMap::new();
    for (prefix, uri) in element.namespaces().iter().chain(signature.namespaces()) {
        inherited.insert(prefix.clone(), uri.clone());
    }
    let canonical_signed_info =
        sigtuna_c14n::canonicalize(signed_info, &inherited, &signed_info_prefixes, false);

    let engine = base64::engine::general_purpose::STANDARD;
    let sig_value = signature
        .find_child(ns::DSIG, ns::node::SIGNATURE_VALUE)
        .ok_or_else(|| Error::MissingElement("SignatureValue".into()))?;
    let sig_b64: String = sig_value.text().chars().filter(|c| !c.is_whitespace()).collect();
    let sig_bytes = engine
        .decode(&sig_b64)
        .map_err(|e| Error::Base64(format!("SignatureValue: {e}")))?;

    let sig_alg = sigtuna_crypto::sign::from_uri(sig_method_uri)?;

    // Resolve the signing key from the trust set. A declared key name
    // must resolve; otherwise every verification-capable key is tried.
    let key_name = signature
        .find_child(ns::DSIG, ns::node::KEY_INFO)
        .and_then(|ki| ki.find_child(ns::DSIG, ns::node::KEY_NAME))
        .map(|kn| kn.text().trim().to_string());

    let candidates: Vec<&sigtuna_keys::Key> = match &key_name {
        Some(name) => match keys.find_by_name(name) {
            Some(key) => vec![key],
            None => {
                return Ok(VerifyResult::Invalid {
                    reason: format!("signing key '{name}' is not in the trust set"),
                })
            }
        },
        None => keys.keys().collect(),
    };

    for key in candidates {
        if !key.allows(KeyUsage::Verify) {
            continue;
        }
        let Some(signing_key) = key.to_signing_key() else {
            continue;
        };
        match sig_alg.verify(&signing_key, &canonical_signed_info, &sig_bytes) {
            Ok(true) => return Ok(VerifyResult::Valid),
            Ok(false) => continue,
            // A key of the wrong family for the algorithm is simply not
            // the signing key; keep trying the rest of the trust set.
            Err(Error::Key(_)) => continue,
            Err(e) => return Err(e),
        }
    }

    Ok(VerifyResult::Invalid {
        reason: "signature value verification failed".into(),
    })
}

/// Recompute and compare the digest for the single enveloped reference.
fn verify_reference(reference: &Element, element: &Element) -> Result<VerifyResult> {
    let uri = reference.attribute("", ns::attr::URI).unwrap_or("");
    if !uri.is_empty() {
        let id = ID_ATTRS
            .iter()
            .find_map(|name| element.attribute("", name))
            .unwrap_or("");
        if uri.strip_prefix('#') != Some(id) {
            return Ok(VerifyResult::Invalid {
                reason: format!("reference {uri} does not point at the signed element"),
            });
        }
    }

    let digest_method = reference
        .find_child(ns::DSIG, ns::node::DIGEST_METHOD)
        .ok_or_else(|| Error::MissingElement("DigestMethod".into()))?;
    let digest_uri = digest_method
        .attribute("", ns::attr::ALGORITHM)
        .ok_or_else(|| Error::MissingAttribute("Algorithm on DigestMethod".into()))?;

    let digest_value = reference
        .find_child(ns::DSIG, ns::node::DIGEST_VALUE)
        .ok_or_else(|| Error::MissingElement("DigestValue".into()))?;
    let expected_b64: String = digest_value
        .text()
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect();
    let engine = base64::engine::general_purpose::STANDARD;
    let expected = engine
        .decode(&expected_b64)
        .map_err(|e| Error::Base64(format!("DigestValue: {e}")))?;

    // Transforms must be the enveloped-signature transform optionally
    // followed by exclusive C14N; anything else is unsupported.
    let mut ref_prefixes = Vec::new();
    if let Some(transforms) = reference.find_child(ns::DSIG, ns::node::TRANSFORMS) {
        for transform in transforms
            .child_elements()
            .filter(|e| e.name().matches(ns::DSIG, ns::node::TRANSFORM))
        {
            let t_uri = transform.attribute("", ns::attr::ALGORITHM).unwrap_or("");
            match t_uri {
                algorithm::ENVELOPED_SIGNATURE => {}
                algorithm::EXC_C14N | algorithm::EXC_C14N_WITH_COMMENTS => {
                    ref_prefixes = read_inclusive_prefixes(transform);
                }
                other => {
                    return Err(Error::UnsupportedAlgorithm(format!("transform: {other}")))
                }
            }
        }
    }

    let canonical = sigtuna_c14n::canonicalize(element, &BTreeMap::new(), &ref_prefixes, true);
    let computed = digest::digest(digest_uri, &canonical)?;

    if computed == expected {
        Ok(VerifyResult::Valid)
    } else {
        Ok(VerifyResult::Invalid {
            reason: "digest mismatch".into(),
        })
    }
}

fn read_inclusive_prefixes(method: &Element) -> Vec<String> {
    method
        .find_child(ns::EXC_C14N, ns::node::INCLUSIVE_NAMESPACES)
        .and_then(|incl| incl.attribute("", ns::attr::PREFIX_LIST))
        .map(|list| list.split_whitespace().map(str::to_owned).collect())
        .unwrap_or_default()
}

const ID_ATTRS: [&str; 3] = ["ID", "Id", "id"];

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::SigningContext;
    use crate::sign::sign;
    use sigtuna_keys::{Key, KeyData, KeysManager};
    use sigtuna_xml::QName;
    use std::sync::Arc;

    fn sample_element() -> Element {
        let mut issuer = Element::new(QName::with_prefix("urn:example", "Issuer", "ex"));
        issuer.append_text("https://idp.example.org");
        let mut root = Element::new(QName::with_prefix("urn:example", "Token", "ex"));
        root.declare_namespace("ex", "urn:example");
        root.set_attribute(QName::unqualified("ID"), "_token1");
        root.append_element(issuer);
        root
    }

    fn hmac_key(name: &str) -> Arc<Key> {
        Arc::new(Key::new(KeyData::Hmac(vec![0x2a; 32]), sigtuna_keys::KeyUsage::Any).with_name(name))
    }

    fn trust_of(key: &Arc<Key>) -> KeysManager {
        let mut mgr = KeysManager::new();
        let data = match &key.data {
            KeyData::Hmac(k) => KeyData::Hmac(k.clone()),
            _ => unreachable!(),
        };
        let mut k = Key::new(data, key.usage);
        k.name = key.name.clone();
        mgr.add_key(k);
        mgr
    }

    #[test]
    fn hmac_sign_verify_round_trip() {
        let key = hmac_key("tenant");
        let ctx = SigningContext::new(key.clone(), sigtuna_core::algorithm::HMAC_SHA256)
            .with_key_name("tenant")
            .with_inclusive_prefix("ex");

        let mut element = sample_element();
        sign(&mut element, &ctx).unwrap();
        assert!(element.find_child(ns::DSIG, ns::node::SIGNATURE).is_some());

        let outcome = verify(&element, &trust_of(&key)).unwrap();
        assert!(outcome.is_valid(), "{outcome:?}");
    }

    #[test]
    fn verification_survives_the_wire() {
        let key = hmac_key("tenant");
        let ctx = SigningContext::new(key.clone(), sigtuna_core::algorithm::HMAC_SHA256)
            .with_key_name("tenant");

        let mut element = sample_element();
        sign(&mut element, &ctx).unwrap();

        let text = element.render();
        let doc = roxmltree::Document::parse(&text).unwrap();
        let reparsed = Element::from_node(doc.root_element()).unwrap();

        let outcome = verify(&reparsed, &trust_of(&key)).unwrap();
        assert!(outcome.is_valid(), "{outcome:?}");
    }

    #[test]
    fn tampered_content_fails_digest() {
        let key = hmac_key("tenant");
        let ctx = SigningContext::new(key.clone(), sigtuna_core::algorithm::HMAC_SHA256)
            .with_key_name("tenant");

        let mut element = sample_element();
        sign(&mut element, &ctx).unwrap();

        let text = element.render().replace("idp.example.org", "idp.evil.org");
        let doc = roxmltree::Document::parse(&text).unwrap();
        let tampered = Element::from_node(doc.root_element()).unwrap();

        match verify(&tampered, &trust_of(&key)).unwrap() {
            VerifyResult::Invalid { reason } => assert!(reason.contains("digest")),
            VerifyResult::Valid => panic!("tampered element verified"),
        }
    }

    #[test]
    fn unknown_key_name_is_untrusted() {
        let key = hmac_key("tenant");
        let ctx = SigningContext::new(key.clone(), sigtuna_core::algorithm::HMAC_SHA256)
            .with_key_name("someone-else");

        let mut element = sample_element();
        sign(&mut element, &ctx).unwrap();

        match verify(&element, &trust_of(&key)).unwrap() {
            VerifyResult::Invalid { reason } => assert!(reason.contains("trust set")),
            VerifyResult::Valid => panic!("untrusted key accepted"),
        }
    }

    #[test]
    fn ecdsa_sign_verify_round_trip() {
        let sk = p256::ecdsa::SigningKey::random(&mut rand::thread_rng());
        let vk = *sk.verifying_key();
        let key = Arc::new(Key::new(
            KeyData::EcP256 { private: Some(sk), public: vk },
            sigtuna_keys::KeyUsage::Sign,
        ));
        let ctx = SigningContext::new(key, sigtuna_core::algorithm::ECDSA_SHA256);

        let mut element = sample_element();
        sign(&mut element, &ctx).unwrap();

        let mut trust = KeysManager::new();
        trust.add_key(Key::new(
            KeyData::EcP256 { private: None, public: vk },
            sigtuna_keys::KeyUsage::Verify,
        ));
        assert!(verify(&element, &trust).unwrap().is_valid());
    }

    #[test]
    fn missing_signature_is_an_error() {
        let element = sample_element();
        assert!(matches!(
            verify(&element, &KeysManager::new()),
            Err(Error::MissingElement(_))
        ));
    }

    #[test]
    fn signing_requires_an_id_attribute() {
        let key = hmac_key("tenant");
        let ctx = SigningContext::new(key, sigtuna_core::algorithm::HMAC_SHA256);
        let mut element = Element::new(QName::with_prefix("urn:example", "Token", "ex"));
        element.declare_namespace("ex", "urn:example");
        assert!(matches!(sign(&mut element, &ctx), Err(Error::Signature(_))));
    }
}
