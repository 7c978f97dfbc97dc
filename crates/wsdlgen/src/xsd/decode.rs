//! Recursive-descent decoding of `xs:schema` trees.
//!
//! One function per construct. Children outside the XML Schema namespace,
//! and schema children a construct does not handle, are skipped.

use super::*;
use crate::error::DecodeError;
use roxmltree::{Document, Node, ParsingOptions};

/// Decode a standalone schema document
pub fn decode_schema(bytes: &[u8]) -> Result<SchemaDocument, DecodeError> {
    let text = document_text(bytes)?;
    let doc = parse_document(text)?;
    let root = doc.root_element();
    if !is_xs(root, "schema") {
        return Err(DecodeError::UnexpectedRoot {
            found: root.tag_name().name().to_string(),
        });
    }
    Ok(decode_schema_node(root))
}

/// Decode an `xs:schema` element, standalone or embedded in a WSDL `types` section
pub fn decode_schema_node(node: Node<'_, '_>) -> SchemaDocument {
    let mut schema = SchemaDocument {
        target_namespace: node.attribute("targetNamespace").unwrap_or_default().to_string(),
        prefixes: node
            .namespaces()
            .filter(|ns| ns.name() != Some("xml"))
            .map(|ns| (ns.name().unwrap_or_default().to_string(), ns.uri().to_string()))
            .collect(),
        element_form_default: attr(node, "elementFormDefault"),
        ..Default::default()
    };

    for child in xs_children(node) {
        match child.tag_name().name() {
            "include" => schema.includes.push(Include {
                schema_location: attr(child, "schemaLocation"),
            }),
            "import" => schema.imports.push(Import {
                namespace: attr(child, "namespace"),
                schema_location: attr(child, "schemaLocation"),
            }),
            "element" => schema.elements.push(decode_element(child)),
            "attribute" => schema.attributes.push(decode_attribute(child)),
            "complexType" => schema.complex_types.push(decode_complex_type(child)),
            "simpleType" => schema.simple_types.push(decode_simple_type(child)),
            "group" => schema.groups.push(decode_group(child)),
            _ => {}
        }
    }

    schema
}

/// Strip a UTF-8 byte order mark and validate the encoding
pub(crate) fn document_text(bytes: &[u8]) -> Result<&str, DecodeError> {
    let text = std::str::from_utf8(bytes)?;
    Ok(text.strip_prefix('\u{feff}').unwrap_or(text))
}

pub(crate) fn parse_document(text: &str) -> Result<Document<'_>, DecodeError> {
    let options = ParsingOptions {
        allow_dtd: true,
        ..ParsingOptions::default()
    };
    Ok(Document::parse_with_options(text, options)?)
}

pub(crate) fn is_xs(node: Node<'_, '_>, local: &str) -> bool {
    node.tag_name().namespace() == Some(XS_NS) && node.tag_name().name() == local
}

/// Element children in the XML Schema namespace
fn xs_children<'a, 'input>(node: Node<'a, 'input>) -> impl Iterator<Item = Node<'a, 'input>> {
    node.children()
        .filter(|c| c.is_element() && c.tag_name().namespace() == Some(XS_NS))
}

fn first_xs_child<'a, 'input>(node: Node<'a, 'input>, local: &str) -> Option<Node<'a, 'input>> {
    xs_children(node).find(|c| c.tag_name().name() == local)
}

fn attr(node: Node<'_, '_>, name: &str) -> Option<String> {
    node.attribute(name).map(str::to_string)
}

fn flag(node: Node<'_, '_>, name: &str) -> bool {
    matches!(node.attribute(name).map(str::trim), Some("true" | "1"))
}

/// Resolve a QName-valued attribute against the namespaces in scope on `node`
fn qname(node: Node<'_, '_>, raw: &str) -> QName {
    let mut name = QName::parse(raw);
    if let Some(prefix) = name.prefix.as_deref() {
        name.namespace = node
            .namespaces()
            .find(|ns| ns.name() == Some(prefix))
            .map(|ns| ns.uri().to_string());
    }
    name
}

fn qname_attr(node: Node<'_, '_>, name: &str) -> Option<QName> {
    node.attribute(name).map(|raw| qname(node, raw))
}

/// Text of every `annotation/documentation` child, joined by newlines
pub(crate) fn documentation(node: Node<'_, '_>) -> String {
    let mut parts = Vec::new();
    for annotation in node.children().filter(|c| c.is_element() && c.tag_name().name() == "annotation") {
        for doc in annotation
            .children()
            .filter(|c| c.is_element() && c.tag_name().name() == "documentation")
        {
            let text: String = doc
                .descendants()
                .filter(|n| n.is_text())
                .filter_map(|n| n.text())
                .collect();
            let text = text.trim();
            if !text.is_empty() {
                parts.push(text.to_string());
            }
        }
    }
    parts.join("\n")
}

fn decode_element(node: Node<'_, '_>) -> ElementDecl {
    let kind = if let Some(target) = qname_attr(node, "ref") {
        ElementKind::Ref(target)
    } else if let Some(type_ref) = qname_attr(node, "type") {
        ElementKind::Typed(type_ref)
    } else if let Some(complex) = first_xs_child(node, "complexType") {
        ElementKind::Complex(Box::new(decode_complex_type(complex)))
    } else if let Some(simple) = first_xs_child(node, "simpleType") {
        ElementKind::Simple(Box::new(decode_simple_type(simple)))
    } else {
        ElementKind::Untyped
    };

    ElementDecl {
        name: node.attribute("name").unwrap_or_default().to_string(),
        kind,
        nillable: flag(node, "nillable"),
        min_occurs: attr(node, "minOccurs"),
        max_occurs: attr(node, "maxOccurs"),
        doc: documentation(node),
    }
}

fn decode_complex_type(node: Node<'_, '_>) -> ComplexType {
    let mut complex = ComplexType {
        name: node.attribute("name").unwrap_or_default().to_string(),
        is_abstract: flag(node, "abstract"),
        mixed: flag(node, "mixed"),
        doc: documentation(node),
        ..Default::default()
    };

    for child in xs_children(node) {
        match child.tag_name().name() {
            "attribute" => complex.attributes.push(decode_attribute(child)),
            "sequence" => decode_sequence(child, &mut complex.particles),
            "choice" => complex.particles.choice.extend(decode_choice(child)),
            "all" => complex.particles.all.extend(decode_all(child)),
            "group" => complex.particles.groups.push(decode_group(child)),
            "complexContent" => {
                // complexContent takes precedence over simpleContent
                if let Some(extension) = decode_content_extension(child) {
                    complex.content = Some(ContentModel::Complex(extension));
                }
            }
            "simpleContent" if complex.content.is_none() => {
                if let Some(extension) = decode_content_extension(child) {
                    complex.content = Some(ContentModel::Simple(extension));
                }
            }
            _ => {}
        }
    }

    complex
}

fn decode_sequence(node: Node<'_, '_>, particles: &mut Particles) {
    for child in xs_children(node) {
        match child.tag_name().name() {
            "element" => particles.sequence.push(decode_element(child)),
            "choice" => particles.sequence.extend(decode_choice(child)),
            "any" => particles.any.push(decode_wildcard(child)),
            "group" => particles.groups.push(decode_group(child)),
            _ => {}
        }
    }
}

/// Elements of a choice, each inheriting the choice's `minOccurs` when set
fn decode_choice(node: Node<'_, '_>) -> Vec<ElementDecl> {
    let min_occurs = attr(node, "minOccurs");
    xs_children(node)
        .filter(|c| c.tag_name().name() == "element")
        .map(|c| {
            let mut element = decode_element(c);
            if min_occurs.is_some() {
                element.min_occurs = min_occurs.clone();
            }
            element
        })
        .collect()
}

fn decode_all(node: Node<'_, '_>) -> Vec<ElementDecl> {
    xs_children(node)
        .filter(|c| c.tag_name().name() == "element")
        .map(decode_element)
        .collect()
}

/// A named group definition, or a `ref` to one
fn decode_group(node: Node<'_, '_>) -> Group {
    let mut group = Group {
        name: node.attribute("name").unwrap_or_default().to_string(),
        reference: qname_attr(node, "ref"),
        min_occurs: attr(node, "minOccurs"),
        max_occurs: attr(node, "maxOccurs"),
        doc: documentation(node),
        ..Default::default()
    };

    for child in xs_children(node) {
        match child.tag_name().name() {
            "sequence" => decode_sequence(child, &mut group.particles),
            "choice" => group.particles.choice.extend(decode_choice(child)),
            "all" => group.particles.all.extend(decode_all(child)),
            _ => {}
        }
    }

    group
}

fn decode_wildcard(node: Node<'_, '_>) -> Wildcard {
    Wildcard {
        min_occurs: attr(node, "minOccurs"),
        max_occurs: attr(node, "maxOccurs"),
        namespace: attr(node, "namespace"),
        process_contents: attr(node, "processContents"),
    }
}

/// The `extension` inside a `complexContent`/`simpleContent`, if any
fn decode_content_extension(node: Node<'_, '_>) -> Option<Extension> {
    first_xs_child(node, "extension").map(decode_extension)
}

fn decode_extension(node: Node<'_, '_>) -> Extension {
    let mut extension = Extension {
        base: qname_attr(node, "base").unwrap_or_default(),
        ..Default::default()
    };

    for child in xs_children(node) {
        match child.tag_name().name() {
            "attribute" => extension.attributes.push(decode_attribute(child)),
            "sequence" => decode_sequence(child, &mut extension.particles),
            "choice" => extension.particles.choice.extend(decode_choice(child)),
            "all" => extension.particles.all.extend(decode_all(child)),
            "group" => extension.particles.groups.push(decode_group(child)),
            _ => {}
        }
    }

    extension
}

fn decode_attribute(node: Node<'_, '_>) -> Attribute {
    Attribute {
        name: node.attribute("name").unwrap_or_default().to_string(),
        reference: qname_attr(node, "ref"),
        type_ref: qname_attr(node, "type"),
        simple_type: first_xs_child(node, "simpleType").map(decode_simple_type),
        usage: attr(node, "use"),
        fixed: attr(node, "fixed"),
        default: attr(node, "default"),
        doc: documentation(node),
    }
}

fn decode_simple_type(node: Node<'_, '_>) -> SimpleType {
    let derivation = xs_children(node).find_map(|child| match child.tag_name().name() {
        "restriction" => Some(SimpleDerivation::Restriction(decode_restriction(child))),
        "list" => Some(SimpleDerivation::List(decode_list(child))),
        "union" => Some(SimpleDerivation::Union(decode_union(child))),
        _ => None,
    });

    SimpleType {
        name: node.attribute("name").unwrap_or_default().to_string(),
        doc: documentation(node),
        derivation,
    }
}

fn decode_restriction(node: Node<'_, '_>) -> Restriction {
    let mut restriction = Restriction {
        base: qname_attr(node, "base").unwrap_or_default(),
        ..Default::default()
    };

    for child in xs_children(node) {
        let name = child.tag_name().name();
        let value = child.attribute("value").unwrap_or_default().to_string();
        if name == "enumeration" {
            restriction.enumeration.push(EnumValue {
                value,
                doc: documentation(child),
            });
        } else if let Some(kind) = FacetKind::from_local_name(name) {
            restriction.facets.push(Facet { kind, value });
        }
    }

    restriction
}

fn decode_list(node: Node<'_, '_>) -> List {
    List {
        item_type: qname_attr(node, "itemType"),
        simple_type: first_xs_child(node, "simpleType").map(|c| Box::new(decode_simple_type(c))),
    }
}

fn decode_union(node: Node<'_, '_>) -> Union {
    Union {
        member_types: node
            .attribute("memberTypes")
            .map(|raw| raw.split_whitespace().map(|member| qname(node, member)).collect())
            .unwrap_or_default(),
        simple_types: xs_children(node)
            .filter(|c| c.tag_name().name() == "simpleType")
            .map(decode_simple_type)
            .collect(),
    }
}
