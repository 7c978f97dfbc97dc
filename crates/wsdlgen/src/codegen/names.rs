//! Schema identifiers to legal Rust identifiers.

use heck::ToSnakeCase;

/// Where a sanitized identifier will be used
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IdentContext {
    TypeName,
    Field,
    AttributeField,
}

/// Rust keywords and their replacements, for type names and element fields
const RESERVED_WORDS: &[(&str, &str)] = &[
    ("abstract", "abstract_"),
    ("as", "as_"),
    ("async", "async_"),
    ("await", "await_"),
    ("become", "become_"),
    ("box", "box_"),
    ("break", "break_"),
    ("const", "const_"),
    ("continue", "continue_"),
    ("crate", "crate_"),
    ("do", "do_"),
    ("dyn", "dyn_"),
    ("else", "else_"),
    ("enum", "enum_"),
    ("extern", "extern_"),
    ("false", "false_"),
    ("final", "final_"),
    ("fn", "fn_"),
    ("for", "for_"),
    ("gen", "gen_"),
    ("if", "if_"),
    ("impl", "impl_"),
    ("in", "in_"),
    ("let", "let_"),
    ("loop", "loop_"),
    ("macro", "macro_"),
    ("match", "match_"),
    ("mod", "mod_"),
    ("move", "move_"),
    ("mut", "mut_"),
    ("override", "override_"),
    ("priv", "priv_"),
    ("pub", "pub_"),
    ("ref", "ref_"),
    ("return", "return_"),
    ("self", "self_"),
    ("Self", "Self_"),
    ("static", "static_"),
    ("struct", "struct_"),
    ("super", "super_"),
    ("trait", "trait_"),
    ("true", "true_"),
    ("try", "try_"),
    ("type", "type_"),
    ("typeof", "typeof_"),
    ("unsafe", "unsafe_"),
    ("unsized", "unsized_"),
    ("use", "use_"),
    ("virtual", "virtual_"),
    ("where", "where_"),
    ("while", "while_"),
    ("yield", "yield_"),
];

/// Replacements for attribute fields. Same keywords plus `string`, kept as a
/// separate table so the two contexts can diverge.
const RESERVED_ATTRIBUTE_WORDS: &[(&str, &str)] = &[
    ("abstract", "abstract_"),
    ("as", "as_"),
    ("async", "async_"),
    ("await", "await_"),
    ("become", "become_"),
    ("box", "box_"),
    ("break", "break_"),
    ("const", "const_"),
    ("continue", "continue_"),
    ("crate", "crate_"),
    ("do", "do_"),
    ("dyn", "dyn_"),
    ("else", "else_"),
    ("enum", "enum_"),
    ("extern", "extern_"),
    ("false", "false_"),
    ("final", "final_"),
    ("fn", "fn_"),
    ("for", "for_"),
    ("gen", "gen_"),
    ("if", "if_"),
    ("impl", "impl_"),
    ("in", "in_"),
    ("let", "let_"),
    ("loop", "loop_"),
    ("macro", "macro_"),
    ("match", "match_"),
    ("mod", "mod_"),
    ("move", "move_"),
    ("mut", "mut_"),
    ("override", "override_"),
    ("priv", "priv_"),
    ("pub", "pub_"),
    ("ref", "ref_"),
    ("return", "return_"),
    ("self", "self_"),
    ("Self", "Self_"),
    ("static", "static_"),
    ("string", "astring"),
    ("struct", "struct_"),
    ("super", "super_"),
    ("trait", "trait_"),
    ("true", "true_"),
    ("try", "try_"),
    ("type", "type_"),
    ("typeof", "typeof_"),
    ("unsafe", "unsafe_"),
    ("unsized", "unsized_"),
    ("use", "use_"),
    ("virtual", "virtual_"),
    ("where", "where_"),
    ("while", "while_"),
    ("yield", "yield_"),
];

/// Characters spelled out instead of dropped
const SPECIAL_CHARACTERS: &[(char, &str)] = &[('+', "Plus"), ('@', "At")];

/// Turns schema identifiers into Rust identifiers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Sanitizer {
    export: bool,
}

impl Default for Sanitizer {
    fn default() -> Self {
        Self { export: true }
    }
}

impl Sanitizer {
    /// `export` upper-cases the first character of type names
    pub fn new(export: bool) -> Self {
        Self { export }
    }

    pub fn sanitize(&self, identifier: &str, context: IdentContext) -> String {
        if let Some(replacement) = reserved(identifier, context) {
            return match context {
                IdentContext::TypeName => self.type_case(replacement),
                _ => replacement.to_string(),
            };
        }

        let normalized = normalize(identifier);
        let mut ident = match context {
            IdentContext::TypeName => self.type_case(&normalized),
            IdentContext::Field | IdentContext::AttributeField => normalized.to_snake_case(),
        };

        // `_` alone is not an identifier, and a run of underscores carries no name
        if ident.chars().all(|c| c == '_') {
            return match context {
                IdentContext::TypeName => "EmptyString".to_string(),
                _ => "empty_string".to_string(),
            };
        }
        if ident.starts_with(|c: char| c.is_ascii_digit()) {
            ident.insert(0, '_');
        }
        match reserved(&ident, context) {
            Some(replacement) => replacement.to_string(),
            None => ident,
        }
    }

    pub fn type_name(&self, identifier: &str) -> String {
        self.sanitize(identifier, IdentContext::TypeName)
    }

    pub fn field_name(&self, identifier: &str) -> String {
        self.sanitize(identifier, IdentContext::Field)
    }

    pub fn attribute_name(&self, identifier: &str) -> String {
        self.sanitize(identifier, IdentContext::AttributeField)
    }

    fn type_case(&self, identifier: &str) -> String {
        let mut chars = identifier.chars();
        match chars.next() {
            Some(first) if self.export => first.to_uppercase().chain(chars).collect(),
            Some(first) => first.to_lowercase().chain(chars).collect(),
            None => String::new(),
        }
    }
}

fn reserved(identifier: &str, context: IdentContext) -> Option<&'static str> {
    let table = match context {
        IdentContext::AttributeField => RESERVED_ATTRIBUTE_WORDS,
        IdentContext::TypeName | IdentContext::Field => RESERVED_WORDS,
    };
    table
        .iter()
        .find(|(word, _)| *word == identifier)
        .map(|(_, replacement)| *replacement)
}

/// Spell out special characters, map `.` and `-` to `_`, drop everything else
/// that cannot appear in an identifier
pub(crate) fn normalize(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        if let Some((_, spelled)) = SPECIAL_CHARACTERS.iter().find(|(special, _)| *special == c) {
            out.push_str(spelled);
        } else if c == '.' || c == '-' {
            out.push('_');
        } else if c.is_alphanumeric() || c == '_' {
            out.push(c);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reserved_words() {
        let s = Sanitizer::default();
        assert_eq!(s.field_name("type"), "type_");
        assert_eq!(s.attribute_name("type"), "type_");
        assert_eq!(s.type_name("self"), "Self_");
        assert_eq!(s.type_name("Self"), "Self_");
    }

    #[test]
    fn test_string_differs_by_context() {
        let s = Sanitizer::default();
        assert_eq!(s.field_name("string"), "string");
        assert_eq!(s.attribute_name("string"), "astring");
    }

    #[test]
    fn test_normalization() {
        let s = Sanitizer::default();
        assert_eq!(s.type_name("get-quote.request"), "Get_quote_request");
        assert_eq!(s.type_name("C++"), "CPlusPlus");
        assert_eq!(s.type_name("mail@home"), "MailAthome");
        assert_eq!(s.field_name("firstName"), "first_name");
        assert_eq!(s.field_name("x(y)z"), "xyz");
    }

    #[test]
    fn test_digits_and_empty() {
        let s = Sanitizer::default();
        assert_eq!(s.type_name("3d"), "_3d");
        assert_eq!(s.field_name("1st"), "_1st");
        assert_eq!(s.type_name(""), "EmptyString");
        assert_eq!(s.field_name("()"), "empty_string");
    }

    #[test]
    fn test_underscores_only() {
        let s = Sanitizer::default();
        assert_eq!(s.type_name("_"), "EmptyString");
        assert_eq!(s.type_name("-"), "EmptyString");
        assert_eq!(s.type_name("__"), "EmptyString");
        assert_eq!(s.field_name("_"), "empty_string");
        assert_eq!(s.attribute_name("-."), "empty_string");
        assert_eq!(s.type_name("_x"), "_x");
    }

    #[test]
    fn test_export_flag() {
        let hidden = Sanitizer::new(false);
        assert_eq!(hidden.type_name("Person"), "person");
        assert_eq!(Sanitizer::new(true).type_name("person"), "Person");
    }

    #[test]
    fn test_keyword_after_transform() {
        let s = Sanitizer::default();
        // "Match" snake-cases to a keyword
        assert_eq!(s.field_name("Match"), "match_");
        assert_eq!(s.field_name("r-e-f"), "r_e_f");
    }
}
