use crate::error::{CodegenError, Result};
use crate::xsd::{Attribute, ComplexType, ContentModel, ElementDecl, ElementKind, Group, Particles, QName};
use proc_macro2::TokenStream;
use quote::quote;
use std::collections::BTreeSet;
use tracing::warn;

use super::render::TypeEmitter;
use super::types::{MappedType, SchemaScope, builtin_type};
use super::utils::{doc_comment, make_ident, parse_type, unique_name};

/// Fields of one struct, with unique names
#[derive(Default)]
struct FieldSet {
    names: BTreeSet<String>,
    fields: Vec<TokenStream>,
    /// Groups currently being expanded into this struct
    groups: BTreeSet<String>,
}

impl FieldSet {
    fn claim(&mut self, name: String) -> syn::Ident {
        make_ident(&unique_name(&mut self.names, name))
    }
}

/// Inline complex type waiting to be emitted after its parent
struct NestedType<'c> {
    type_name: String,
    element: &'c ElementDecl,
    complex: &'c ComplexType,
}

impl<'c, 'd> TypeEmitter<'c, 'd> {
    pub(super) fn emit_global_element(&mut self, element: &'c ElementDecl) -> Result<()> {
        let type_name = self.sanitizer.type_name(&element.name);
        match &element.kind {
            ElementKind::Complex(complex) => {
                self.emit_struct(&type_name, complex, &element.name, pick_doc(&element.doc, &complex.doc))
            }
            ElementKind::Simple(simple) => self.emit_simple_type(&element.name, simple),
            ElementKind::Typed(type_ref) => {
                let target = self.mapper.map_type(type_ref, element.nillable, element.min_occurs.as_deref());
                self.emit_alias(&type_name, &target.name, &element.doc)
            }
            ElementKind::Ref(_) | ElementKind::Untyped => Ok(()),
        }
    }

    pub(super) fn emit_named_complex_type(&mut self, complex: &'c ComplexType) -> Result<()> {
        let type_name = self.sanitizer.type_name(&complex.name);

        if let Some(ContentModel::Simple(extension)) = &complex.content {
            if extension.attributes.is_empty() && complex.attributes.is_empty() {
                self.check_base(&type_name, &extension.base)?;
                let target = self.base_type(&extension.base);
                return self.emit_alias(&type_name, &target.name, &complex.doc);
            }
        }

        let xml_name = self
            .schemas
            .find_name_by_type(self.mapper.scope().namespace, &complex.name)
            .unwrap_or(&complex.name);
        self.emit_struct(&type_name, complex, xml_name, &complex.doc)
    }

    /// `pub type Name = Target;`, skipped when the alias would name itself
    pub(super) fn emit_alias(&mut self, type_name: &str, target: &str, doc: &str) -> Result<()> {
        if type_name == target {
            return Ok(());
        }
        self.declare(type_name)?;
        let ident = make_ident(type_name);
        let target = parse_type(target)?;
        let doc = doc_comment(doc);
        self.items.push(quote! {
            #doc
            pub type #ident = #target;
        });
        Ok(())
    }

    fn emit_struct(&mut self, type_name: &str, complex: &'c ComplexType, xml_name: &str, doc: &str) -> Result<()> {
        self.declare(type_name)?;

        let mut fields = FieldSet::default();
        let mut nested = Vec::new();
        match &complex.content {
            Some(ContentModel::Complex(extension)) => {
                self.base_field(type_name, &extension.base, &mut fields)?;
                self.particle_fields(type_name, &extension.particles, &mut fields, &mut nested)?;
                self.attribute_fields(&extension.attributes, &mut fields)?;
            }
            Some(ContentModel::Simple(extension)) => {
                self.check_base(type_name, &extension.base)?;
                let ident = fields.claim("value".to_string());
                let ty = parse_type(&self.base_type(&extension.base).name)?;
                fields.fields.push(quote! {
                    #[serde(rename = "$text")]
                    pub #ident: #ty,
                });
                self.attribute_fields(&extension.attributes, &mut fields)?;
            }
            None => self.particle_fields(type_name, &complex.particles, &mut fields, &mut nested)?,
        }
        self.attribute_fields(&complex.attributes, &mut fields)?;

        let ident = make_ident(type_name);
        let doc = doc_comment(doc);
        let fields = fields.fields;
        self.items.push(quote! {
            #doc
            #[derive(Debug, Clone, Default, PartialEq, serde::Serialize, serde::Deserialize)]
            #[serde(rename = #xml_name)]
            pub struct #ident {
                #(#fields)*
            }
        });

        for inline in nested {
            self.emit_struct(
                &inline.type_name,
                inline.complex,
                &inline.element.name,
                pick_doc(&inline.element.doc, &inline.complex.doc),
            )?;
        }
        Ok(())
    }

    /// Base of a `complexContent` extension, flattened into the derived struct
    fn base_field(&mut self, type_name: &str, base: &QName, fields: &mut FieldSet) -> Result<()> {
        if base.is_empty() {
            return Ok(());
        }
        self.check_base(type_name, base)?;

        let mapped = self.mapper.map_type(base, false, None);
        let ty = parse_type(&mapped.name)?;
        if mapped.builtin {
            let ident = fields.claim("value".to_string());
            fields.fields.push(quote! {
                #[serde(rename = "$text")]
                pub #ident: #ty,
            });
        } else {
            let ident = fields.claim(self.sanitizer.field_name(&base.local));
            fields.fields.push(quote! {
                #[serde(flatten)]
                pub #ident: #ty,
            });
        }
        Ok(())
    }

    /// Extension bases must name a built-in or a type declared in the namespace
    /// the base reference resolves to
    fn check_base(&self, type_name: &str, base: &QName) -> Result<()> {
        if base.is_empty() || builtin_type(&base.local).is_some() {
            return Ok(());
        }
        let namespace = self.mapper.scope().namespace_of(base);
        if self.schemas.has_type(namespace, &base.local) {
            Ok(())
        } else {
            Err(CodegenError::unresolved_base(base.to_string(), type_name, namespace))
        }
    }

    fn base_type(&self, base: &QName) -> MappedType {
        if base.is_empty() {
            MappedType::builtin("String")
        } else {
            self.mapper.map_type(base, false, None)
        }
    }

    fn particle_fields(
        &mut self,
        parent: &str,
        particles: &'c Particles,
        fields: &mut FieldSet,
        nested: &mut Vec<NestedType<'c>>,
    ) -> Result<()> {
        for element in &particles.sequence {
            self.element_field(parent, element, fields, nested)?;
        }
        for group in &particles.groups {
            self.group_fields(parent, group, fields, nested)?;
        }
        if !particles.any.is_empty() {
            let ident = fields.claim("items".to_string());
            fields.fields.push(quote! {
                #[serde(rename = "$value", default, skip_serializing_if = "Vec::is_empty")]
                pub #ident: Vec<AnyType>,
            });
        }
        for element in particles.choice.iter().chain(&particles.all) {
            self.element_field(parent, element, fields, nested)?;
        }
        Ok(())
    }

    /// Expand a group reference in place
    ///
    /// Only groups from the referring schema's own namespace are expanded;
    /// their elements then route to this module like the referring type.
    fn group_fields(
        &mut self,
        parent: &str,
        group: &'c Group,
        fields: &mut FieldSet,
        nested: &mut Vec<NestedType<'c>>,
    ) -> Result<()> {
        let Some(reference) = &group.reference else {
            return self.particle_fields(parent, &group.particles, fields, nested);
        };

        let scope = self.mapper.scope();
        let namespace = scope.namespace_of(reference);
        if namespace != scope.namespace {
            warn!(group = %reference, namespace, parent, "skipping group from another namespace");
            return Ok(());
        }
        let Some((schema, definition)) = self.schemas.find_group(namespace, &reference.local) else {
            warn!(group = %reference, namespace, parent, "group not found, skipping");
            return Ok(());
        };
        if !fields.groups.insert(reference.local.clone()) {
            warn!(group = %reference, parent, "circular group reference, skipping");
            return Ok(());
        }

        let outer = self.mapper;
        self.mapper = outer.with_scope(SchemaScope::of(schema));
        let result = self.particle_fields(parent, &definition.particles, fields, nested);
        self.mapper = outer;
        fields.groups.remove(&reference.local);
        result
    }

    fn element_field(
        &mut self,
        parent: &str,
        element: &'c ElementDecl,
        fields: &mut FieldSet,
        nested: &mut Vec<NestedType<'c>>,
    ) -> Result<()> {
        let min_occurs = element.min_occurs.as_deref();
        let optional = element.nillable || min_occurs == Some("0");
        let xml_name = element.xml_name();

        let mapped = match &element.kind {
            ElementKind::Ref(target) => self.mapper.map_type(target, element.nillable, min_occurs),
            ElementKind::Typed(type_ref) => self.mapper.map_type(type_ref, element.nillable, min_occurs),
            ElementKind::Simple(simple) => MappedType {
                optional,
                ..self.simple_type_target(simple)
            },
            ElementKind::Complex(complex) => {
                let type_name = format!("{parent}{}", self.sanitizer.type_name(&element.name));
                nested.push(NestedType {
                    type_name: type_name.clone(),
                    element,
                    complex,
                });
                MappedType {
                    name: type_name,
                    builtin: false,
                    optional,
                    import: None,
                }
            }
            ElementKind::Untyped => MappedType {
                optional,
                ..MappedType::builtin("AnyType")
            },
        };

        let ident = fields.claim(self.sanitizer.field_name(xml_name));
        let doc = doc_comment(&element.doc);
        let field = if element.is_repeated() {
            let ty = parse_type(&mapped.repeated())?;
            quote! {
                #doc
                #[serde(rename = #xml_name, default, skip_serializing_if = "Vec::is_empty")]
                pub #ident: #ty,
            }
        } else if mapped.optional {
            let ty = parse_type(&mapped.render())?;
            quote! {
                #doc
                #[serde(rename = #xml_name, default, skip_serializing_if = "Option::is_none")]
                pub #ident: #ty,
            }
        } else {
            let ty = parse_type(&mapped.render())?;
            quote! {
                #doc
                #[serde(rename = #xml_name)]
                pub #ident: #ty,
            }
        };
        fields.fields.push(field);
        Ok(())
    }

    fn attribute_fields(&mut self, attributes: &'c [Attribute], fields: &mut FieldSet) -> Result<()> {
        for attribute in attributes {
            let xml_name = attribute.xml_name();
            let mapped = MappedType {
                optional: !attribute.is_required(),
                ..self.attribute_type(attribute)
            };

            let ident = fields.claim(self.sanitizer.attribute_name(xml_name));
            let rename = format!("@{xml_name}");
            let ty = parse_type(&mapped.render())?;

            let mut doc = attribute.doc.clone();
            if let Some(fixed) = &attribute.fixed {
                doc.push_str(&format!("\n\nFixed value: `{fixed}`"));
            }
            if let Some(default) = &attribute.default {
                doc.push_str(&format!("\n\nDefault value: `{default}`"));
            }
            let doc = doc_comment(&doc);

            fields.fields.push(if mapped.optional {
                quote! {
                    #doc
                    #[serde(rename = #rename, default, skip_serializing_if = "Option::is_none")]
                    pub #ident: #ty,
                }
            } else {
                quote! {
                    #doc
                    #[serde(rename = #rename)]
                    pub #ident: #ty,
                }
            });
        }
        Ok(())
    }

    /// Required type of an attribute; references follow the global attribute they name
    fn attribute_type(&self, attribute: &Attribute) -> MappedType {
        if let Some(type_ref) = &attribute.type_ref {
            return self.mapper.map_type(type_ref, false, None);
        }
        if let Some(simple) = &attribute.simple_type {
            return self.simple_type_target(simple);
        }
        if let Some(reference) = &attribute.reference {
            let namespace = self.mapper.scope().namespace_of(reference);
            if let Some(global) = self.schemas.find_attribute(namespace, &reference.local) {
                if global.reference.is_none() {
                    return self.attribute_type(global);
                }
            }
        }
        MappedType::builtin("String")
    }
}

/// Element documentation, falling back to its inline type's
fn pick_doc<'a>(element_doc: &'a str, type_doc: &'a str) -> &'a str {
    if element_doc.is_empty() { type_doc } else { element_doc }
}

#[cfg(test)]
mod tests {
    use crate::codegen::names::Sanitizer;
    use crate::codegen::render::{Renderer, RustRenderer, TypesContext};
    use crate::codegen::router::Router;
    use crate::corpus::SchemaSet;
    use crate::error::{CodegenError, Result};
    use crate::xsd::decode_schema;

    fn render(body: &str) -> Result<String> {
        render_documents(&[format!(
            r#"<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema"
                   xmlns:tns="urn:test" targetNamespace="urn:test">{body}</xs:schema>"#
        )])
    }

    fn render_documents(documents: &[String]) -> Result<String> {
        let set = SchemaSet::new(
            documents
                .iter()
                .map(|xsd| decode_schema(xsd.as_bytes()).expect("decodes"))
                .collect(),
        );
        let router = Router::default();
        let sanitizer = Sanitizer::default();
        let ctx = TypesContext {
            schemas: &set,
            namespaces: None,
            module: "",
            router: &router,
            sanitizer: &sanitizer,
        };
        RustRenderer
            .render_types(&ctx)
            .map(|bytes| String::from_utf8(bytes).expect("utf-8"))
    }

    #[test]
    fn test_person_struct() {
        let text = render(
            r#"<xs:complexType name="Person">
                 <xs:sequence>
                   <xs:element name="name" type="xs:string"/>
                   <xs:element name="age" type="xs:int" minOccurs="0"/>
                 </xs:sequence>
               </xs:complexType>"#,
        )
        .expect("renders");

        assert!(text.contains("pub struct Person {"));
        assert!(text.contains("pub name: String,"));
        assert!(text.contains("pub age: Option<i32>,"));
        assert!(text.contains("#[serde(rename = \"Person\")]"));
        assert_eq!(text.matches("pub ").count(), 3);
    }

    #[test]
    fn test_repeated_and_recursive_fields() {
        let text = render(
            r#"<xs:complexType name="Node">
                 <xs:sequence>
                   <xs:element name="child" type="tns:Node" maxOccurs="unbounded"/>
                   <xs:element name="parent" type="tns:Node" minOccurs="0"/>
                   <xs:element name="tag" type="xs:string" nillable="true"/>
                 </xs:sequence>
               </xs:complexType>"#,
        )
        .expect("renders");

        assert!(text.contains("pub child: Vec<Node>,"));
        assert!(text.contains("pub parent: Option<Box<Node>>,"));
        assert!(text.contains("pub tag: Option<String>,"));
        assert!(text.contains("skip_serializing_if = \"Vec::is_empty\""));
    }

    #[test]
    fn test_inline_complex_type_is_nested() {
        let text = render(
            r#"<xs:complexType name="Person">
                 <xs:sequence>
                   <xs:element name="address">
                     <xs:complexType>
                       <xs:sequence><xs:element name="street" type="xs:string"/></xs:sequence>
                     </xs:complexType>
                   </xs:element>
                 </xs:sequence>
               </xs:complexType>"#,
        )
        .expect("renders");

        assert!(text.contains("pub address: PersonAddress,"));
        assert!(text.contains("pub struct PersonAddress {"));
        assert!(text.contains("#[serde(rename = \"address\")]"));
    }

    #[test]
    fn test_extension_flattens_base() {
        let text = render(
            r#"<xs:complexType name="Person">
                 <xs:sequence><xs:element name="name" type="xs:string"/></xs:sequence>
               </xs:complexType>
               <xs:complexType name="Employee">
                 <xs:complexContent>
                   <xs:extension base="tns:Person">
                     <xs:sequence><xs:element name="badge" type="xs:long"/></xs:sequence>
                     <xs:attribute name="type" type="xs:string" use="required"/>
                     <xs:attribute name="string" type="xs:string" fixed="yes"/>
                   </xs:extension>
                 </xs:complexContent>
               </xs:complexType>"#,
        )
        .expect("renders");

        assert!(text.contains("#[serde(flatten)]"));
        assert!(text.contains("pub person: Person,"));
        assert!(text.contains("pub badge: i64,"));
        assert!(text.contains("#[serde(rename = \"@type\")]"));
        assert!(text.contains("pub type_: String,"));
        assert!(text.contains("pub astring: Option<String>,"));
        assert!(text.contains("/// Fixed value: `yes`"));
    }

    #[test]
    fn test_unresolved_base() {
        let err = render(
            r#"<xs:complexType name="Employee">
                 <xs:complexContent><xs:extension base="tns:Missing"/></xs:complexContent>
               </xs:complexType>"#,
        )
        .expect_err("unresolved");
        assert!(matches!(err, CodegenError::UnresolvedBase { type_name, .. } if type_name == "Employee"));
    }

    #[test]
    fn test_base_resolves_in_its_own_namespace() {
        let employee = r#"<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema"
                              xmlns:tns="urn:a" targetNamespace="urn:a">
               <xs:complexType name="Employee">
                 <xs:complexContent><xs:extension base="tns:Person"/></xs:complexContent>
               </xs:complexType>
             </xs:schema>"#;
        let person = r#"<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema" targetNamespace="urn:b">
               <xs:complexType name="Person"><xs:sequence/></xs:complexType>
             </xs:schema>"#;

        let err = render_documents(&[employee.to_string(), person.to_string()]).expect_err("unresolved");
        assert!(matches!(
            err,
            CodegenError::UnresolvedBase { base, namespace, .. } if base == "tns:Person" && namespace == "urn:a"
        ));

        let employee = employee
            .replace(r#"xmlns:tns="urn:a""#, r#"xmlns:tns="urn:a" xmlns:b="urn:b""#)
            .replace("tns:Person", "b:Person");
        let text = render_documents(&[employee, person.to_string()]).expect("renders");
        assert!(text.contains("pub person: Person,"), "{text}");
    }

    #[test]
    fn test_root_name_ignores_other_namespaces() {
        let elements = r#"<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema"
                              xmlns:b="urn:b" targetNamespace="urn:a">
               <xs:element name="bThing" type="b:Item"/>
             </xs:schema>"#;
        let item = r#"<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema" targetNamespace="urn:z">
               <xs:complexType name="Item"><xs:sequence/></xs:complexType>
             </xs:schema>"#;

        let text = render_documents(&[elements.to_string(), item.to_string()]).expect("renders");
        assert!(text.contains("pub struct Item {"), "{text}");
        assert!(text.contains("#[serde(rename = \"Item\")]"));
        assert!(!text.contains("#[serde(rename = \"bThing\")]"));
    }

    #[test]
    fn test_underscore_type_name() {
        let text = render(
            r#"<xs:complexType name="_">
                 <xs:sequence><xs:element name="_" type="xs:string"/></xs:sequence>
               </xs:complexType>"#,
        )
        .expect("renders");

        assert!(text.contains("pub struct EmptyString {"), "{text}");
        assert!(text.contains("#[serde(rename = \"_\")]"));
        assert!(text.contains("pub empty_string: String,"));
    }

    #[test]
    fn test_group_reference_is_expanded() {
        let text = render(
            r#"<xs:group name="Contact">
                 <xs:sequence>
                   <xs:element name="email" type="xs:string"/>
                   <xs:element name="phone" type="xs:string" minOccurs="0"/>
                   <xs:group ref="tns:Contact"/>
                 </xs:sequence>
               </xs:group>
               <xs:complexType name="Customer">
                 <xs:sequence>
                   <xs:element name="name" type="xs:string"/>
                   <xs:group ref="tns:Contact"/>
                   <xs:group ref="tns:Missing"/>
                 </xs:sequence>
               </xs:complexType>"#,
        )
        .expect("renders");

        assert!(text.contains("pub struct Customer {"), "{text}");
        let name = text.find("pub name: String,").expect("name");
        let email = text.find("pub email: String,").expect("email");
        assert!(name < email);
        assert!(text.contains("pub phone: Option<String>,"));
        assert_eq!(text.matches("pub email").count(), 1);
        assert!(!text.contains("pub struct Contact"));
    }

    #[test]
    fn test_simple_content() {
        let text = render(
            r#"<xs:complexType name="Price">
                 <xs:simpleContent>
                   <xs:extension base="xs:decimal">
                     <xs:attribute name="currency" type="xs:string"/>
                   </xs:extension>
                 </xs:simpleContent>
               </xs:complexType>
               <xs:complexType name="Label">
                 <xs:simpleContent><xs:extension base="xs:string"/></xs:simpleContent>
               </xs:complexType>"#,
        )
        .expect("renders");

        assert!(text.contains("#[serde(rename = \"$text\")]"));
        assert!(text.contains("pub value: f64,"));
        assert!(text.contains("#[serde(rename = \"@currency\""));
        assert!(text.contains("pub type Label = String;"));
    }

    #[test]
    fn test_global_elements() {
        let text = render(
            r#"<xs:complexType name="QuoteType"><xs:sequence/></xs:complexType>
               <xs:element name="Quote" type="tns:QuoteType"/>
               <xs:element name="QuoteType" type="tns:QuoteType"/>
               <xs:element name="Stamp" type="xs:dateTime"/>"#,
        )
        .expect("renders");

        assert!(text.contains("pub type Quote = QuoteType;"));
        assert!(text.contains("pub type Stamp = XsdDateTime;"));
        assert!(!text.contains("pub type QuoteType"));
        // root element name of the complex type comes from the first element using it
        assert!(text.contains("#[serde(rename = \"Quote\")]"));
    }

    #[test]
    fn test_wildcard_field() {
        let text = render(
            r#"<xs:complexType name="Envelope">
                 <xs:sequence><xs:any maxOccurs="unbounded"/></xs:sequence>
               </xs:complexType>"#,
        )
        .expect("renders");
        assert!(text.contains("pub items: Vec<AnyType>,"));
    }
}
