#![forbid(unsafe_code)]

//! Protocol-namespace element kinds: Response, Status, StatusCode,
//! StatusMessage.

use crate::assertion::MessageUnmarshaller;
use crate::handlers::{
    ContainerMarshaller, ContainerUnmarshaller, ValueMarshaller, ValueUnmarshaller,
};
use crate::samlp_qname;
use sigtuna_core::ns;
use sigtuna_object::{
    BuilderRegistry, ElementBuilder, MarshallerRegistry, UnmarshallerRegistry,
};
use sigtuna_xml::QName;
use std::sync::Arc;

pub fn response() -> QName {
    samlp_qname(ns::node::RESPONSE)
}

pub fn status() -> QName {
    samlp_qname(ns::node::STATUS)
}

pub fn status_code() -> QName {
    samlp_qname(ns::node::STATUS_CODE)
}

pub fn status_message() -> QName {
    samlp_qname(ns::node::STATUS_MESSAGE)
}

/// Register the protocol-namespace kinds.
pub fn register(
    builders: &BuilderRegistry,
    marshallers: &MarshallerRegistry,
    unmarshallers: &UnmarshallerRegistry,
) {
    for qname in [response(), status(), status_code(), status_message()] {
        builders.register(qname.clone(), Arc::new(ElementBuilder::new(qname)));
    }

    for qname in [response(), status(), status_code()] {
        marshallers.register(qname.clone(), Arc::new(ContainerMarshaller::new(qname)));
    }
    marshallers.register(
        status_message(),
        Arc::new(ValueMarshaller::new(status_message())),
    );

    unmarshallers.register(response(), Arc::new(MessageUnmarshaller::new(response())));
    for qname in [status(), status_code()] {
        unmarshallers.register(qname.clone(), Arc::new(ContainerUnmarshaller::new(qname)));
    }
    unmarshallers.register(
        status_message(),
        Arc::new(ValueUnmarshaller::new(status_message())),
    );
}
