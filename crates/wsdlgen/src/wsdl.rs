//! WSDL 1.1 envelope: messages, port types, bindings and services around
//! one or more embedded schemas.

use crate::corpus::SchemaSet;
use crate::error::DecodeError;
use crate::xsd::decode::{document_text, documentation, is_xs, parse_document};
use crate::xsd::{QName, SchemaDocument, decode_schema_node};
use bytes::Bytes;
use roxmltree::Node;
use serde::Serialize;
use serde_with::skip_serializing_none;
use std::collections::BTreeMap;
use tracing::warn;

/// WSDL 1.1 namespace
pub const WSDL_NS: &str = "http://schemas.xmlsoap.org/wsdl/";
/// SOAP 1.1 binding namespace
pub const SOAP_NS: &str = "http://schemas.xmlsoap.org/wsdl/soap/";
/// SOAP 1.2 binding namespace
pub const SOAP12_NS: &str = "http://schemas.xmlsoap.org/wsdl/soap12/";

/// A decoded service description
///
/// A bare `xs:schema` input decodes to a description with one schema and no
/// messages, port types, bindings or services.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceDescription {
    #[serde(skip_serializing_if = "String::is_empty")]
    pub name: String,
    pub target_namespace: String,
    pub prefixes: BTreeMap<String, String>,
    pub schemas: Vec<SchemaDocument>,
    pub messages: Vec<Message>,
    pub port_types: Vec<PortType>,
    pub bindings: Vec<Binding>,
    pub services: Vec<Service>,
    /// Input bytes as read, embedded verbatim into the server module
    #[serde(skip)]
    pub raw: Bytes,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Message {
    pub name: String,
    pub parts: Vec<Part>,
}

#[skip_serializing_none]
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Part {
    pub name: String,
    pub element: Option<QName>,
    #[serde(rename = "type")]
    pub type_ref: Option<QName>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PortType {
    pub name: String,
    pub operations: Vec<Operation>,
}

#[skip_serializing_none]
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Operation {
    pub name: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub doc: String,
    pub input: Option<QName>,
    pub output: Option<QName>,
    pub faults: Vec<Fault>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Fault {
    pub name: String,
    pub message: QName,
}

#[skip_serializing_none]
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Binding {
    pub name: String,
    pub port_type: QName,
    pub style: Option<String>,
    pub transport: Option<String>,
    pub operations: Vec<BindingOperation>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BindingOperation {
    pub name: String,
    pub soap_action: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Service {
    pub name: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub doc: String,
    pub ports: Vec<Port>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Port {
    pub name: String,
    pub binding: QName,
    pub address: String,
}

/// Decode a WSDL document, or a bare schema document
pub fn decode_description(raw: Bytes) -> Result<ServiceDescription, DecodeError> {
    let text = document_text(&raw)?;
    let doc = parse_document(text)?;
    let root = doc.root_element();

    let mut description = if is_wsdl(root, "definitions") {
        decode_definitions(root)
    } else if is_xs(root, "schema") {
        let schema = decode_schema_node(root);
        ServiceDescription {
            target_namespace: schema.target_namespace.clone(),
            prefixes: schema.prefixes.clone(),
            schemas: vec![schema],
            ..Default::default()
        }
    } else {
        return Err(DecodeError::UnexpectedRoot {
            found: root.tag_name().name().to_string(),
        });
    };

    description.raw = raw.clone();
    Ok(description)
}

fn is_wsdl(node: Node<'_, '_>, local: &str) -> bool {
    node.tag_name().namespace() == Some(WSDL_NS) && node.tag_name().name() == local
}

fn is_soap(node: Node<'_, '_>, local: &str) -> bool {
    matches!(node.tag_name().namespace(), Some(SOAP_NS | SOAP12_NS)) && node.tag_name().name() == local
}

fn wsdl_children<'a, 'input>(
    node: Node<'a, 'input>,
    local: &'static str,
) -> impl Iterator<Item = Node<'a, 'input>> {
    node.children().filter(move |c| c.is_element() && is_wsdl(*c, local))
}

fn name_of(node: Node<'_, '_>) -> String {
    node.attribute("name").unwrap_or_default().to_string()
}

fn qname_attr(node: Node<'_, '_>, name: &str) -> Option<QName> {
    let mut qname = QName::parse(node.attribute(name)?);
    if let Some(prefix) = qname.prefix.as_deref() {
        qname.namespace = node
            .namespaces()
            .find(|ns| ns.name() == Some(prefix))
            .map(|ns| ns.uri().to_string());
    }
    Some(qname)
}

fn decode_definitions(root: Node<'_, '_>) -> ServiceDescription {
    let mut description = ServiceDescription {
        name: name_of(root),
        target_namespace: root.attribute("targetNamespace").unwrap_or_default().to_string(),
        prefixes: root
            .namespaces()
            .filter(|ns| ns.name() != Some("xml"))
            .map(|ns| (ns.name().unwrap_or_default().to_string(), ns.uri().to_string()))
            .collect(),
        ..Default::default()
    };

    for types in wsdl_children(root, "types") {
        description.schemas.extend(
            types
                .children()
                .filter(|c| c.is_element() && is_xs(*c, "schema"))
                .map(decode_schema_node),
        );
    }

    description.messages = wsdl_children(root, "message").map(decode_message).collect();
    description.port_types = wsdl_children(root, "portType").map(decode_port_type).collect();
    description.bindings = wsdl_children(root, "binding").map(decode_binding).collect();
    description.services = wsdl_children(root, "service").map(decode_service).collect();
    description
}

fn decode_message(node: Node<'_, '_>) -> Message {
    Message {
        name: name_of(node),
        parts: wsdl_children(node, "part")
            .map(|part| Part {
                name: name_of(part),
                element: qname_attr(part, "element"),
                type_ref: qname_attr(part, "type"),
            })
            .collect(),
    }
}

fn decode_port_type(node: Node<'_, '_>) -> PortType {
    PortType {
        name: name_of(node),
        operations: wsdl_children(node, "operation")
            .map(|op| Operation {
                name: name_of(op),
                doc: wsdl_documentation(op),
                input: wsdl_children(op, "input").find_map(|n| qname_attr(n, "message")),
                output: wsdl_children(op, "output").find_map(|n| qname_attr(n, "message")),
                faults: wsdl_children(op, "fault")
                    .map(|fault| Fault {
                        name: name_of(fault),
                        message: qname_attr(fault, "message").unwrap_or_default(),
                    })
                    .collect(),
            })
            .collect(),
    }
}

fn decode_binding(node: Node<'_, '_>) -> Binding {
    let soap_binding = node.children().find(|c| c.is_element() && is_soap(*c, "binding"));
    Binding {
        name: name_of(node),
        port_type: qname_attr(node, "type").unwrap_or_default(),
        style: soap_binding.and_then(|b| b.attribute("style")).map(str::to_string),
        transport: soap_binding.and_then(|b| b.attribute("transport")).map(str::to_string),
        operations: wsdl_children(node, "operation")
            .map(|op| BindingOperation {
                name: name_of(op),
                soap_action: op
                    .children()
                    .find(|c| c.is_element() && is_soap(*c, "operation"))
                    .and_then(|soap| soap.attribute("soapAction"))
                    .unwrap_or_default()
                    .to_string(),
            })
            .collect(),
    }
}

fn decode_service(node: Node<'_, '_>) -> Service {
    Service {
        name: name_of(node),
        doc: wsdl_documentation(node),
        ports: wsdl_children(node, "port")
            .map(|port| Port {
                name: name_of(port),
                binding: qname_attr(port, "binding").unwrap_or_default(),
                address: port
                    .children()
                    .find(|c| c.is_element() && is_soap(*c, "address"))
                    .and_then(|address| address.attribute("location"))
                    .unwrap_or_default()
                    .to_string(),
            })
            .collect(),
    }
}

/// `wsdl:documentation` text, falling back to XML Schema style annotations
fn wsdl_documentation(node: Node<'_, '_>) -> String {
    let text: Vec<String> = wsdl_children(node, "documentation")
        .map(|doc| {
            doc.descendants()
                .filter_map(|n| n.is_text().then(|| n.text()).flatten())
                .collect::<String>()
                .trim()
                .to_string()
        })
        .filter(|text| !text.is_empty())
        .collect();
    if text.is_empty() {
        documentation(node)
    } else {
        text.join("\n")
    }
}

impl ServiceDescription {
    pub fn find_message(&self, name: &str) -> Option<&Message> {
        self.messages.iter().find(|m| m.name == name)
    }

    /// Type carried by a message
    ///
    /// The first part's `type` wins; otherwise the global element named by the
    /// first part's `element` (matched case-insensitively) gives its `type`,
    /// or its own name when the element declares an inline type.
    pub fn find_message_type(&self, message: &QName, schemas: &SchemaSet) -> Option<QName> {
        for msg in self.messages.iter().filter(|m| m.name == message.local) {
            let Some(part) = msg.parts.first() else {
                warn!(message = %msg.name, "message has no parts, ignoring");
                continue;
            };

            if let Some(type_ref) = &part.type_ref {
                return Some(type_ref.clone());
            }

            let element = part.element.as_ref()?;
            let (schema, decl) = schemas.find_element_ignore_case(&element.local)?;
            return Some(match &decl.kind {
                crate::xsd::ElementKind::Typed(type_ref) => type_ref.clone(),
                _ => QName::parse(&decl.name).with_namespace(schema.target_namespace.clone()),
            });
        }
        None
    }

    /// SOAP action bound to `operation` of `port_type`, matching the port type case-insensitively
    pub fn find_soap_action(&self, operation: &str, port_type: &str) -> Option<&str> {
        self.bindings
            .iter()
            .filter(|b| b.port_type.local.eq_ignore_ascii_case(port_type))
            .flat_map(|b| b.operations.iter())
            .find(|op| op.name == operation)
            .map(|op| op.soap_action.as_str())
    }

    /// SOAP address of the named port
    pub fn find_service_address(&self, port: &str) -> Option<&str> {
        self.services
            .iter()
            .flat_map(|s| s.ports.iter())
            .find(|p| p.name == port)
            .map(|p| p.address.as_str())
    }

    /// Ports whose binding implements `port_type`
    pub fn ports_for(&self, port_type: &str) -> impl Iterator<Item = &Port> {
        self.services.iter().flat_map(|s| s.ports.iter()).filter(move |port| {
            self.bindings
                .iter()
                .find(|b| b.name == port.binding.local)
                .is_some_and(|b| b.port_type.local.eq_ignore_ascii_case(port_type))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const STOCK_QUOTE: &str = r#"<?xml version="1.0"?>
<definitions name="StockQuote"
    targetNamespace="http://example.com/stockquote.wsdl"
    xmlns:tns="http://example.com/stockquote.wsdl"
    xmlns:xsd1="http://example.com/stockquote.xsd"
    xmlns:soap="http://schemas.xmlsoap.org/wsdl/soap/"
    xmlns="http://schemas.xmlsoap.org/wsdl/">
  <types>
    <schema targetNamespace="http://example.com/stockquote.xsd"
            xmlns="http://www.w3.org/2001/XMLSchema">
      <element name="TradePriceRequest">
        <complexType><all><element name="tickerSymbol" type="string"/></all></complexType>
      </element>
      <element name="TradePrice" type="xsd1:TradePriceType"/>
      <complexType name="TradePriceType"><all><element name="price" type="float"/></all></complexType>
    </schema>
  </types>
  <message name="GetLastTradePriceInput"><part name="body" element="xsd1:TradePriceRequest"/></message>
  <message name="GetLastTradePriceOutput"><part name="body" element="xsd1:tradeprice"/></message>
  <message name="Empty"/>
  <portType name="StockQuotePortType">
    <operation name="GetLastTradePrice">
      <documentation>Latest trade price for a ticker</documentation>
      <input message="tns:GetLastTradePriceInput"/>
      <output message="tns:GetLastTradePriceOutput"/>
    </operation>
  </portType>
  <binding name="StockQuoteSoapBinding" type="tns:stockquoteporttype">
    <soap:binding style="document" transport="http://schemas.xmlsoap.org/soap/http"/>
    <operation name="GetLastTradePrice">
      <soap:operation soapAction="http://example.com/GetLastTradePrice"/>
    </operation>
  </binding>
  <service name="StockQuoteService">
    <port name="StockQuotePort" binding="tns:StockQuoteSoapBinding">
      <soap:address location="http://example.com/stockquote"/>
    </port>
  </service>
</definitions>"#;

    fn stock_quote() -> ServiceDescription {
        decode_description(Bytes::from_static(STOCK_QUOTE.as_bytes())).expect("decodes")
    }

    #[test]
    fn test_decode_envelope() {
        let description = stock_quote();
        assert_eq!(description.name, "StockQuote");
        assert_eq!(description.schemas.len(), 1);
        assert_eq!(description.schemas[0].target_namespace, "http://example.com/stockquote.xsd");
        assert_eq!(description.messages.len(), 3);
        assert_eq!(description.port_types[0].operations[0].doc, "Latest trade price for a ticker");
        assert_eq!(description.bindings[0].style.as_deref(), Some("document"));
        assert_eq!(description.raw.len(), STOCK_QUOTE.len());
    }

    #[test]
    fn test_lookup_layer() {
        let description = stock_quote();
        let set = SchemaSet::new(description.schemas.clone());

        let input = description.find_message_type(&QName::parse("tns:GetLastTradePriceInput"), &set);
        assert_eq!(input.map(|q| q.local), Some("TradePriceRequest".to_string()));

        // element lookup is case-insensitive and follows the element's type
        let output = description.find_message_type(&QName::parse("tns:GetLastTradePriceOutput"), &set);
        assert_eq!(output.map(|q| q.local), Some("TradePriceType".to_string()));

        assert_eq!(description.find_message_type(&QName::parse("tns:Empty"), &set), None);

        assert_eq!(
            description.find_soap_action("GetLastTradePrice", "StockQuotePortType"),
            Some("http://example.com/GetLastTradePrice")
        );
        assert_eq!(
            description.find_service_address("StockQuotePort"),
            Some("http://example.com/stockquote")
        );
        assert_eq!(description.ports_for("StockQuotePortType").count(), 1);
    }

    #[test]
    fn test_bare_schema_root() {
        let xsd = br#"<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema" targetNamespace="urn:x"/>"#;
        let description = decode_description(Bytes::from_static(xsd)).expect("decodes");
        assert_eq!(description.schemas.len(), 1);
        assert_eq!(description.target_namespace, "urn:x");
        assert!(description.port_types.is_empty());
    }

    #[test]
    fn test_unexpected_root() {
        let err = decode_description(Bytes::from_static(b"<html/>")).expect_err("rejected");
        assert!(matches!(err, DecodeError::UnexpectedRoot { found } if found == "html"));
    }
}
