#![forbid(unsafe_code)]

//! Assertion-namespace element kinds: Assertion, Issuer, Subject,
//! NameID, Conditions, AudienceRestriction, Audience.

use crate::handlers::{
    check_date_time, ContainerMarshaller, ContainerUnmarshaller, ValueMarshaller,
    ValueUnmarshaller,
};
use crate::saml_qname;
use sigtuna_core::{ns, Error, Result};
use sigtuna_object::{
    BuilderRegistry, ElementBuilder, ElementUnmarshaller, MarshallerRegistry, NodeId, ObjectTree,
    UnmarshallerRegistry,
};
use sigtuna_xml::QName;
use std::sync::Arc;

pub fn assertion() -> QName {
    saml_qname(ns::node::ASSERTION)
}

pub fn assertion_type() -> QName {
    saml_qname(ns::xsitype::ASSERTION)
}

pub fn issuer() -> QName {
    saml_qname(ns::node::ISSUER)
}

pub fn subject() -> QName {
    saml_qname(ns::node::SUBJECT)
}

pub fn name_id() -> QName {
    saml_qname(ns::node::NAME_ID)
}

pub fn conditions() -> QName {
    saml_qname(ns::node::CONDITIONS)
}

pub fn audience_restriction() -> QName {
    saml_qname(ns::node::AUDIENCE_RESTRICTION)
}

pub fn audience_restriction_type() -> QName {
    saml_qname(ns::xsitype::AUDIENCE_RESTRICTION)
}

pub fn audience() -> QName {
    saml_qname(ns::node::AUDIENCE)
}

/// Unmarshaller for protocol messages and assertions: validates the
/// `Version` and `IssueInstant` wire formats before storing.
pub struct MessageUnmarshaller {
    target: QName,
}

impl MessageUnmarshaller {
    pub fn new(target: QName) -> Self {
        Self { target }
    }
}

impl ElementUnmarshaller for MessageUnmarshaller {
    fn target(&self) -> &QName {
        &self.target
    }

    fn unmarshal_attribute(
        &self,
        tree: &mut ObjectTree,
        node: NodeId,
        name: &QName,
        value: &str,
    ) -> Result<()> {
        if name.namespace_uri().is_empty() {
            match name.local_name() {
                ns::attr::VERSION if value != ns::SAML_VERSION => {
                    return Err(Error::AttributeFormat(format!(
                        "unsupported SAML version: {value}"
                    )));
                }
                ns::attr::ISSUE_INSTANT => check_date_time(ns::attr::ISSUE_INSTANT, value)?,
                _ => {}
            }
        }
        tree.set_attribute(node, name.clone(), value);
        Ok(())
    }
}

/// Unmarshaller for Conditions: validates the validity-window instants.
pub struct ConditionsUnmarshaller {
    target: QName,
}

impl ConditionsUnmarshaller {
    pub fn new() -> Self {
        Self {
            target: conditions(),
        }
    }
}

impl Default for ConditionsUnmarshaller {
    fn default() -> Self {
        Self::new()
    }
}

impl ElementUnmarshaller for ConditionsUnmarshaller {
    fn target(&self) -> &QName {
        &self.target
    }

    fn unmarshal_attribute(
        &self,
        tree: &mut ObjectTree,
        node: NodeId,
        name: &QName,
        value: &str,
    ) -> Result<()> {
        if name.namespace_uri().is_empty()
            && matches!(
                name.local_name(),
                ns::attr::NOT_BEFORE | ns::attr::NOT_ON_OR_AFTER
            )
        {
            check_date_time(name.local_name(), value)?;
        }
        tree.set_attribute(node, name.clone(), value);
        Ok(())
    }
}

/// Register the assertion-namespace kinds. Assertion and
/// AudienceRestriction are additionally registered under their schema
/// types, so `xsi:type`-substituted elements dispatch to them.
pub fn register(
    builders: &BuilderRegistry,
    marshallers: &MarshallerRegistry,
    unmarshallers: &UnmarshallerRegistry,
) {
    for qname in [
        assertion(),
        issuer(),
        subject(),
        name_id(),
        conditions(),
        audience_restriction(),
        audience(),
    ] {
        builders.register(qname.clone(), Arc::new(ElementBuilder::new(qname)));
    }
    builders.register(
        assertion_type(),
        Arc::new(ElementBuilder::new(assertion())),
    );
    builders.register(
        audience_restriction_type(),
        Arc::new(ElementBuilder::new(audience_restriction())),
    );

    for qname in [
        assertion(),
        assertion_type(),
        subject(),
        conditions(),
        audience_restriction(),
        audience_restriction_type(),
    ] {
        marshallers.register(qname.clone(), Arc::new(ContainerMarshaller::new(qname)));
    }
    for qname in [issuer(), name_id(), audience()] {
        marshallers.register(qname.clone(), Arc::new(ValueMarshaller::new(qname)));
    }

    unmarshallers.register(
        assertion(),
        Arc::new(MessageUnmarshaller::new(assertion())),
    );
    unmarshallers.register(
        assertion_type(),
        Arc::new(MessageUnmarshaller::new(assertion_type())),
    );
    unmarshallers.register(subject(), Arc::new(ContainerUnmarshaller::new(subject())));
    unmarshallers.register(conditions(), Arc::new(ConditionsUnmarshaller::new()));
    for qname in [audience_restriction(), audience_restriction_type()] {
        unmarshallers.register(qname.clone(), Arc::new(ContainerUnmarshaller::new(qname)));
    }
    for qname in [issuer(), name_id(), audience()] {
        unmarshallers.register(qname.clone(), Arc::new(ValueUnmarshaller::new(qname)));
    }
}
