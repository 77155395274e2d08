use proc_macro::TokenStream;
use quote::quote;
use syn::{Data, DeriveInput, Fields, Ident, LitStr};

struct RecordFields {
    id: Ident,
    version: Option<Ident>,
    retained: Vec<Ident>,
}

pub fn derive_record(input: TokenStream) -> TokenStream {
    let input = syn::parse_macro_input!(input as DeriveInput);
    let name = &input.ident;

    let collection = extract_str_attr(&input, "collection").unwrap_or_else(|| {
        format!("{}s", to_snake_case(&name.to_string()))
    });
    let envelope = extract_str_attr(&input, "envelope");

    let fields = match extract_fields(&input) {
        Ok(fields) => fields,
        Err(err) => return err.to_compile_error().into(),
    };

    let id_field = &fields.id;

    let version_fn = fields.version.as_ref().map(|field| {
        quote! {
            fn version(&self) -> Option<u64> {
                ::core::convert::Into::<Option<u64>>::into(self.#field.clone())
            }
        }
    });

    let retain_fn = if fields.retained.is_empty() {
        None
    } else {
        let retained = &fields.retained;
        Some(quote! {
            fn retain_from(&mut self, prior: &Self) {
                #( shelf_sync::Retain::retain_from(&mut self.#retained, &prior.#retained); )*
            }
        })
    };

    let push_fn = envelope.map(|key| {
        quote! {
            fn from_push(
                payload: shelf_sync::__private::serde_json::Value,
            ) -> Result<Self, shelf_sync::__private::serde_json::Error> {
                shelf_sync::record::decode_enveloped(payload, #key)
            }
        }
    });

    let expanded = quote! {
        impl shelf_sync::Record for #name {
            const COLLECTION: &'static str = #collection;

            fn id(&self) -> &str {
                &self.#id_field
            }

            #version_fn
            #retain_fn
            #push_fn
        }
    };

    TokenStream::from(expanded)
}

fn extract_str_attr(input: &DeriveInput, key: &str) -> Option<String> {
    for attr in &input.attrs {
        if !attr.path().is_ident("record") {
            continue;
        }

        let mut found = None;
        let _ = attr.parse_nested_meta(|meta| {
            if meta.path.is_ident(key) {
                let value: LitStr = meta.value()?.parse()?;
                found = Some(value.value());
            } else if meta.input.peek(syn::Token![=]) {
                // Skip the value of sibling keys.
                let _: LitStr = meta.value()?.parse()?;
            }
            Ok(())
        });

        if found.is_some() {
            return found;
        }
    }
    None
}

fn extract_fields(input: &DeriveInput) -> syn::Result<RecordFields> {
    let named = match &input.data {
        Data::Struct(data) => match &data.fields {
            Fields::Named(fields) => &fields.named,
            _ => {
                return Err(syn::Error::new_spanned(
                    &input.ident,
                    "Record derive requires a struct with named fields",
                ))
            }
        },
        _ => {
            return Err(syn::Error::new_spanned(
                &input.ident,
                "Record derive requires a struct",
            ))
        }
    };

    let mut id = None;
    let mut version = None;
    let mut retained = Vec::new();

    for field in named {
        let Some(ident) = field.ident.clone() else {
            continue;
        };
        for attr in &field.attrs {
            if !attr.path().is_ident("record") {
                continue;
            }
            attr.parse_nested_meta(|meta| {
                if meta.path.is_ident("id") {
                    id = Some(ident.clone());
                } else if meta.path.is_ident("version") {
                    version = Some(ident.clone());
                } else if meta.path.is_ident("retain") {
                    retained.push(ident.clone());
                } else {
                    return Err(meta.error("expected `id`, `version` or `retain`"));
                }
                Ok(())
            })?;
        }
    }

    // Default: a field named "id"
    let id = match id {
        Some(id) => id,
        None => named
            .iter()
            .filter_map(|f| f.ident.clone())
            .find(|ident| ident == "id")
            .ok_or_else(|| {
                syn::Error::new_spanned(
                    &input.ident,
                    "Record derive: no field marked with #[record(id)] and no field named `id`",
                )
            })?,
    };

    Ok(RecordFields {
        id,
        version,
        retained,
    })
}

fn to_snake_case(s: &str) -> String {
    let mut result = String::new();
    for (i, ch) in s.chars().enumerate() {
        if ch.is_uppercase() {
            if i > 0 {
                result.push('_');
            }
            result.extend(ch.to_lowercase());
        } else {
            result.push(ch);
        }
    }
    result
}
