//! Proc macros for structured generation replies.
//!
//! Provides `#[derive(OutputSchema)]`, which generates a JSON schema for a
//! reply type so a generation service can be constrained to that shape.
//!
//! # Example
//!
//! ```ignore
//! /// One structure in the player's base
//! #[derive(OutputSchema)]
//! #[schema(rename_all = "camelCase")]
//! struct ModuleRecord {
//!     /// Stable identifier such as "biodome-1"
//!     id: String,
//!     /// Identifier of the module this one attaches to
//!     parent_id: Option<String>,
//! }
//!
//! #[derive(OutputSchema)]
//! #[schema(rename_all = "lowercase")]
//! enum ModuleKind { Shuttle, Biodome, Tunnel }
//! ```
//!
//! Generated inherent functions: `schema_name()`, `schema_description()` and
//! `output_schema()`. Nested types must derive `OutputSchema` as well.

use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::quote;
use syn::{parse_macro_input, Attribute, Data, DeriveInput, Fields, Lit, LitStr, Meta, Type};

/// Derive macro for generating a JSON schema.
///
/// # Attributes
///
/// - `#[schema(name = "...")]` on the type: override the schema name
///   (defaults to the snake_case type name)
/// - `#[schema(rename_all = "camelCase" | "snake_case" | "lowercase")]` on the
///   type: rename fields or enum variants, matching the serde attribute
/// - `#[schema(rename = "...")]` on fields: override a single field name
/// - `#[schema(optional)]` on fields: leave the field out of `required`
#[proc_macro_derive(OutputSchema, attributes(schema))]
pub fn derive_output_schema(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    expand(input)
        .unwrap_or_else(|err| err.to_compile_error())
        .into()
}

#[derive(Default)]
struct ContainerAttrs {
    name: Option<String>,
    rename_all: Option<RenameRule>,
}

#[derive(Default)]
struct FieldAttrs {
    rename: Option<String>,
    optional: bool,
}

#[derive(Clone, Copy)]
enum RenameRule {
    Camel,
    Snake,
    Lower,
}

impl RenameRule {
    fn parse(lit: &LitStr) -> syn::Result<Self> {
        match lit.value().as_str() {
            "camelCase" => Ok(RenameRule::Camel),
            "snake_case" => Ok(RenameRule::Snake),
            "lowercase" => Ok(RenameRule::Lower),
            other => Err(syn::Error::new_spanned(
                lit,
                format!("unsupported rename_all rule `{other}`"),
            )),
        }
    }

    fn apply(self, name: &str) -> String {
        match self {
            RenameRule::Camel => to_camel_case(name),
            RenameRule::Snake => to_snake_case(name),
            RenameRule::Lower => name.to_lowercase(),
        }
    }
}

fn expand(input: DeriveInput) -> syn::Result<TokenStream2> {
    let type_name = &input.ident;
    let attrs = container_attrs(&input.attrs)?;
    let schema_name = attrs
        .name
        .clone()
        .unwrap_or_else(|| to_snake_case(&type_name.to_string()));
    let description = doc_comment(&input.attrs);

    let body = match &input.data {
        Data::Struct(data) => match &data.fields {
            Fields::Named(named) => struct_schema(named.named.iter(), attrs.rename_all)?,
            _ => {
                return Err(syn::Error::new_spanned(
                    &input,
                    "OutputSchema only supports structs with named fields",
                ))
            }
        },
        Data::Enum(data) => {
            let mut variants = Vec::new();
            for variant in &data.variants {
                if !matches!(variant.fields, Fields::Unit) {
                    return Err(syn::Error::new_spanned(
                        variant,
                        "OutputSchema only supports enums with unit variants",
                    ));
                }
                let name = variant.ident.to_string();
                variants.push(match attrs.rename_all {
                    Some(rule) => rule.apply(&name),
                    None => name,
                });
            }
            quote! {
                serde_json::json!({
                    "type": "string",
                    "enum": [#(#variants),*]
                })
            }
        }
        Data::Union(_) => {
            return Err(syn::Error::new_spanned(
                &input,
                "OutputSchema does not support unions",
            ))
        }
    };

    Ok(quote! {
        impl #type_name {
            /// Name of this schema.
            pub fn schema_name() -> &'static str {
                #schema_name
            }

            /// Description taken from the type's doc comment.
            pub fn schema_description() -> &'static str {
                #description
            }

            /// JSON schema describing this type's serialized shape.
            pub fn output_schema() -> serde_json::Value {
                #body
            }
        }
    })
}

fn struct_schema<'a>(
    fields: impl Iterator<Item = &'a syn::Field>,
    rename_all: Option<RenameRule>,
) -> syn::Result<TokenStream2> {
    let mut property_tokens = Vec::new();
    let mut required = Vec::new();

    for field in fields {
        let Some(ident) = field.ident.as_ref() else {
            continue;
        };
        let field_attrs = field_attrs(&field.attrs)?;
        let name = match (field_attrs.rename, rename_all) {
            (Some(name), _) => name,
            (None, Some(rule)) => rule.apply(&ident.to_string()),
            (None, None) => ident.to_string(),
        };
        let description = doc_comment(&field.attrs);
        let type_schema = type_schema(&field.ty);

        let describe = if description.is_empty() {
            quote! {}
        } else {
            quote! { property["description"] = serde_json::json!(#description); }
        };

        property_tokens.push(quote! {
            {
                let mut property = #type_schema;
                #describe
                properties.insert(#name.to_string(), property);
            }
        });

        if !field_attrs.optional && option_inner(&field.ty).is_none() {
            required.push(name);
        }
    }

    Ok(quote! {
        let mut properties = serde_json::Map::new();
        #(#property_tokens)*

        let required: Vec<&str> = vec![#(#required),*];

        serde_json::json!({
            "type": "object",
            "properties": properties,
            "required": required
        })
    })
}

fn container_attrs(attrs: &[Attribute]) -> syn::Result<ContainerAttrs> {
    let mut parsed = ContainerAttrs::default();
    for attr in attrs.iter().filter(|a| a.path().is_ident("schema")) {
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("name") {
                let lit: LitStr = meta.value()?.parse()?;
                parsed.name = Some(lit.value());
                Ok(())
            } else if meta.path.is_ident("rename_all") {
                let lit: LitStr = meta.value()?.parse()?;
                parsed.rename_all = Some(RenameRule::parse(&lit)?);
                Ok(())
            } else {
                Err(meta.error("unsupported schema attribute"))
            }
        })?;
    }
    Ok(parsed)
}

fn field_attrs(attrs: &[Attribute]) -> syn::Result<FieldAttrs> {
    let mut parsed = FieldAttrs::default();
    for attr in attrs.iter().filter(|a| a.path().is_ident("schema")) {
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("rename") {
                let lit: LitStr = meta.value()?.parse()?;
                parsed.rename = Some(lit.value());
                Ok(())
            } else if meta.path.is_ident("optional") {
                parsed.optional = true;
                Ok(())
            } else {
                Err(meta.error("unsupported schema field attribute"))
            }
        })?;
    }
    Ok(parsed)
}

fn doc_comment(attrs: &[Attribute]) -> String {
    let mut docs = Vec::new();
    for attr in attrs {
        if !attr.path().is_ident("doc") {
            continue;
        }
        if let Meta::NameValue(nv) = &attr.meta {
            if let syn::Expr::Lit(expr_lit) = &nv.value {
                if let Lit::Str(s) = &expr_lit.lit {
                    docs.push(s.value().trim().to_string());
                }
            }
        }
    }
    docs.join(" ")
}

/// The `T` of an `Option<T>`, if `ty` is one.
fn option_inner(ty: &Type) -> Option<&Type> {
    generic_inner(ty, "Option")
}

fn generic_inner<'a>(ty: &'a Type, wrapper: &str) -> Option<&'a Type> {
    let Type::Path(type_path) = ty else {
        return None;
    };
    let segment = type_path.path.segments.last()?;
    if segment.ident != wrapper {
        return None;
    }
    let syn::PathArguments::AngleBracketed(args) = &segment.arguments else {
        return None;
    };
    match args.args.first()? {
        syn::GenericArgument::Type(inner) => Some(inner),
        _ => None,
    }
}

fn type_schema(ty: &Type) -> TokenStream2 {
    if let Some(inner) = option_inner(ty) {
        let inner_schema = type_schema(inner);
        // Nullable: widen a plain "type" to [type, "null"].
        return quote! {
            {
                let mut schema = #inner_schema;
                if let Some(kind) = schema.get("type").and_then(|t| t.as_str()).map(str::to_owned) {
                    schema["type"] = serde_json::json!([kind, "null"]);
                }
                schema
            }
        };
    }

    if let Some(inner) = generic_inner(ty, "Vec") {
        let inner_schema = type_schema(inner);
        return quote! {
            serde_json::json!({
                "type": "array",
                "items": #inner_schema
            })
        };
    }

    let Type::Path(type_path) = ty else {
        return quote! { serde_json::json!({}) };
    };
    let Some(segment) = type_path.path.segments.last() else {
        return quote! { serde_json::json!({}) };
    };

    match segment.ident.to_string().as_str() {
        "String" | "str" => quote! { serde_json::json!({"type": "string"}) },
        "i8" | "i16" | "i32" | "i64" | "isize" | "u8" | "u16" | "u32" | "u64" | "usize" => {
            quote! { serde_json::json!({"type": "integer"}) }
        }
        "f32" | "f64" => quote! { serde_json::json!({"type": "number"}) },
        "bool" => quote! { serde_json::json!({"type": "boolean"}) },
        _ => quote! { <#ty>::output_schema() },
    }
}

fn to_snake_case(s: &str) -> String {
    let mut result = String::new();
    for (i, c) in s.chars().enumerate() {
        if c.is_uppercase() {
            if i > 0 {
                result.push('_');
            }
            result.push(c.to_ascii_lowercase());
        } else {
            result.push(c);
        }
    }
    result
}

fn to_camel_case(s: &str) -> String {
    let mut result = String::new();
    let mut upper_next = false;
    for c in s.chars() {
        if c == '_' {
            upper_next = !result.is_empty();
        } else if upper_next {
            result.push(c.to_ascii_uppercase());
            upper_next = false;
        } else {
            result.push(c);
        }
    }
    result
}
