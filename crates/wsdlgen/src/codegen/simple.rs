use crate::error::Result;
use crate::xsd::{Restriction, SimpleDerivation, SimpleType};
use heck::ToShoutySnakeCase;
use proc_macro2::{Literal, TokenStream};
use quote::quote;
use std::collections::BTreeSet;

use super::names::normalize;
use super::render::TypeEmitter;
use super::types::MappedType;
use super::utils::{doc_comment, make_ident, unique_name};

impl<'c, 'd> TypeEmitter<'c, 'd> {
    /// A named simple type: enumerations become string newtypes with one
    /// constant per value, everything else an alias
    pub(super) fn emit_simple_type(&mut self, name: &str, simple: &'c SimpleType) -> Result<()> {
        let type_name = self.sanitizer.type_name(name);
        match &simple.derivation {
            Some(SimpleDerivation::Restriction(restriction)) if !restriction.enumeration.is_empty() => {
                self.declare(&type_name)?;
                let tokens = enumeration(&type_name, restriction, &simple.doc);
                self.items.push(tokens);
                Ok(())
            }
            _ => {
                let target = self.simple_type_target(simple);
                self.emit_alias(&type_name, &target.name, &simple.doc)
            }
        }
    }

    /// Required Rust type a simple type stands for
    pub(super) fn simple_type_target(&self, simple: &SimpleType) -> MappedType {
        match &simple.derivation {
            Some(SimpleDerivation::Restriction(restriction)) if !restriction.base.is_empty() => MappedType {
                optional: false,
                ..self.mapper.map_type(&restriction.base, false, None)
            },
            Some(SimpleDerivation::Restriction(_)) | Some(SimpleDerivation::Union(_)) => {
                MappedType::builtin("String")
            }
            Some(SimpleDerivation::List(list)) => {
                let item = match (&list.item_type, &list.simple_type) {
                    (Some(item), _) => self.mapper.map_type(item, false, None),
                    (None, Some(inline)) => self.simple_type_target(inline),
                    (None, None) => MappedType::builtin("String"),
                };
                MappedType {
                    name: format!("Vec<{}>", item.name),
                    builtin: true,
                    optional: false,
                    import: item.import,
                }
            }
            None => MappedType::builtin("AnyType"),
        }
    }
}

/// Constant name for an enumeration value
fn const_name(value: &str) -> String {
    let name = normalize(&value.replace(char::is_whitespace, "_")).to_shouty_snake_case();
    if name.is_empty() {
        "EMPTY".to_string()
    } else if name.starts_with(|c: char| c.is_ascii_digit()) {
        format!("_{name}")
    } else {
        name
    }
}

fn enumeration(type_name: &str, restriction: &Restriction, doc: &str) -> TokenStream {
    let ident = make_ident(type_name);
    let doc = doc_comment(doc);

    let mut taken = BTreeSet::new();
    let constants = restriction.enumeration.iter().map(|value| {
        let name = make_ident(&unique_name(&mut taken, const_name(&value.value)));
        let literal = Literal::string(&value.value);
        let value_doc = doc_comment(&value.doc);
        quote! {
            #value_doc
            pub const #name: #ident = #ident(std::borrow::Cow::Borrowed(#literal));
        }
    });

    quote! {
        #doc
        #[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize, serde::Deserialize)]
        #[serde(transparent)]
        pub struct #ident(pub std::borrow::Cow<'static, str>);

        impl #ident {
            #(#constants)*

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl std::fmt::Display for #ident {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<String> for #ident {
            fn from(value: String) -> Self {
                Self(std::borrow::Cow::Owned(value))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::const_name;
    use crate::codegen::names::Sanitizer;
    use crate::codegen::render::{Renderer, RustRenderer, TypesContext};
    use crate::codegen::router::Router;
    use crate::corpus::SchemaSet;
    use crate::xsd::decode_schema;

    fn render(body: &str) -> String {
        let xsd = format!(
            r#"<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema"
                   xmlns:tns="urn:test" targetNamespace="urn:test">{body}</xs:schema>"#
        );
        let set = SchemaSet::new(vec![decode_schema(xsd.as_bytes()).expect("decodes")]);
        let router = Router::default();
        let sanitizer = Sanitizer::default();
        let ctx = TypesContext {
            schemas: &set,
            namespaces: None,
            module: "",
            router: &router,
            sanitizer: &sanitizer,
        };
        String::from_utf8(RustRenderer.render_types(&ctx).expect("renders")).expect("utf-8")
    }

    #[test]
    fn test_const_name() {
        assert_eq!(const_name("red"), "RED");
        assert_eq!(const_name("dark-blue"), "DARK_BLUE");
        assert_eq!(const_name("1st"), "_1ST");
        assert_eq!(const_name(""), "EMPTY");
        assert_eq!(const_name("C+"), "C_PLUS");
        assert_eq!(const_name("two words"), "TWO_WORDS");
    }

    #[test]
    fn test_enumeration_constants_in_order() {
        let text = render(
            r#"<xs:simpleType name="Color">
                 <xs:restriction base="xs:string">
                   <xs:enumeration value="red"/>
                   <xs:enumeration value="say &quot;hi&quot;"/>
                   <xs:enumeration value="blue"/>
                 </xs:restriction>
               </xs:simpleType>"#,
        );

        assert!(text.contains("pub struct Color(pub std::borrow::Cow<'static, str>);"));
        let red = text.find("pub const RED: Color = Color(std::borrow::Cow::Borrowed(\"red\"));");
        let hi = text.find(r#"pub const SAY_HI: Color = Color(std::borrow::Cow::Borrowed("say \"hi\""));"#);
        let blue = text.find("pub const BLUE: Color = Color(std::borrow::Cow::Borrowed(\"blue\"));");
        assert!(red.is_some() && hi.is_some() && blue.is_some(), "{text}");
        assert!(red < hi && hi < blue);
        assert_eq!(text.matches("pub const ").count(), 3);
    }

    #[test]
    fn test_duplicate_constant_names() {
        let text = render(
            r#"<xs:simpleType name="Case">
                 <xs:restriction base="xs:string">
                   <xs:enumeration value="a"/>
                   <xs:enumeration value="A"/>
                 </xs:restriction>
               </xs:simpleType>"#,
        );
        assert!(text.contains("pub const A: Case"));
        assert!(text.contains("pub const A_2: Case"));
    }

    #[test]
    fn test_aliases() {
        let text = render(
            r#"<xs:simpleType name="Ids"><xs:list itemType="xs:int"/></xs:simpleType>
               <xs:simpleType name="Either"><xs:union memberTypes="xs:int xs:string"/></xs:simpleType>
               <xs:simpleType name="Code"><xs:restriction base="xs:token"><xs:maxLength value="3"/></xs:restriction></xs:simpleType>
               <xs:simpleType name="Opaque"/>
               <xs:simpleType name="string"><xs:restriction base="xs:string"/></xs:simpleType>"#,
        );

        assert!(text.contains("pub type Ids = Vec<i32>;"));
        assert!(text.contains("pub type Either = String;"));
        assert!(text.contains("pub type Code = String;"));
        assert!(text.contains("pub type Opaque = AnyType;"));
        // would alias itself
        assert!(!text.contains("pub type String"));
    }
}
