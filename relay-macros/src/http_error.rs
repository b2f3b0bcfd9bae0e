use proc_macro2::{Span, TokenStream};
use quote::quote;
use syn::parse::Parser;
use syn::punctuated::Punctuated;
use syn::{Data, DeriveInput, Expr, Fields, Ident, Lit, Meta, Token};

struct VariantInfo {
    ident: Ident,
    code: TokenStream,
    message: Option<String>,
    fields: Fields,
}

pub(crate) fn expand(input: DeriveInput) -> syn::Result<TokenStream> {
    let name = &input.ident;
    let Data::Enum(data_enum) = input.data else {
        return Err(syn::Error::new_spanned(
            name,
            "HttpError can only be derived for enums",
        ));
    };

    let mut infos = Vec::new();
    for variant in data_enum.variants {
        let (code, message) = parse_attrs(&variant.attrs)?;
        infos.push(VariantInfo {
            ident: variant.ident,
            code: code.unwrap_or_else(|| quote! { http::StatusCode::INTERNAL_SERVER_ERROR }),
            message,
            fields: variant.fields,
        });
    }

    let code_arms = infos.iter().map(|info| {
        let pattern = wildcard_pattern(info);
        let code = &info.code;
        quote! { #pattern => #code, }
    });

    let message_arms = infos.iter().map(message_arm);

    Ok(quote! {
        impl #name {
            pub fn http_code(&self) -> http::StatusCode {
                match self {
                    #(#code_arms)*
                }
            }

            pub fn http_message(&self) -> Option<String> {
                match self {
                    #(#message_arms)*
                }
            }
        }
    })
}

fn parse_attrs(attrs: &[syn::Attribute]) -> syn::Result<(Option<TokenStream>, Option<String>)> {
    let mut code = None;
    let mut message = None;

    for attr in attrs.iter().filter(|a| a.path().is_ident("http_error")) {
        let Meta::List(list) = &attr.meta else {
            return Err(syn::Error::new_spanned(attr, "expected #[http_error(CODE, \"message\")]"));
        };
        let args = Punctuated::<Expr, Token![,]>::parse_terminated.parse2(list.tokens.clone())?;

        for (i, expr) in args.into_iter().enumerate() {
            match (i, expr) {
                (0, Expr::Path(path)) => {
                    let path = path.path;
                    code = Some(quote! { http::StatusCode::#path });
                }
                (0, Expr::Lit(lit)) => {
                    let Lit::Int(int) = &lit.lit else {
                        return Err(syn::Error::new_spanned(lit, "status code must be an integer"));
                    };
                    let value = int.base10_parse::<u16>()?;
                    if !(100..=999).contains(&value) {
                        return Err(syn::Error::new_spanned(int, "status code out of range"));
                    }
                    code = Some(quote! {
                        http::StatusCode::from_u16(#value)
                            .unwrap_or(http::StatusCode::INTERNAL_SERVER_ERROR)
                    });
                }
                (1, Expr::Lit(lit)) => {
                    let Lit::Str(s) = &lit.lit else {
                        return Err(syn::Error::new_spanned(lit, "message must be a string literal"));
                    };
                    message = Some(s.value());
                }
                (_, other) => {
                    return Err(syn::Error::new_spanned(other, "unexpected http_error argument"));
                }
            }
        }
    }

    Ok((code, message))
}

fn wildcard_pattern(info: &VariantInfo) -> TokenStream {
    let ident = &info.ident;
    match info.fields {
        Fields::Unit => quote! { Self::#ident },
        Fields::Unnamed(_) => quote! { Self::#ident(..) },
        Fields::Named(_) => quote! { Self::#ident { .. } },
    }
}

fn message_arm(info: &VariantInfo) -> TokenStream {
    let ident = &info.ident;
    let Some(msg) = &info.message else {
        let pattern = wildcard_pattern(info);
        return quote! { #pattern => None, };
    };

    match &info.fields {
        Fields::Unit => quote! { Self::#ident => Some(#msg.to_string()), },
        Fields::Unnamed(fields) => {
            let bindings: Vec<Ident> = (0..fields.unnamed.len())
                .map(|i| Ident::new(&format!("__field_{i}"), Span::call_site()))
                .collect();
            let msg = rename_positional(msg);
            let used: Vec<&Ident> = bindings
                .iter()
                .filter(|b| placeholders(&msg).contains(&b.to_string()))
                .collect();
            quote! {
                #[allow(unused_variables)]
                Self::#ident(#(#bindings),*) => Some(format!(#msg, #(#used = #used),*)),
            }
        }
        Fields::Named(fields) => {
            let names: Vec<&Ident> = fields.named.iter().filter_map(|f| f.ident.as_ref()).collect();
            let used: Vec<&&Ident> = names
                .iter()
                .filter(|n| placeholders(msg).contains(&n.to_string()))
                .collect();
            quote! {
                #[allow(unused_variables)]
                Self::#ident { #(#names),* } => Some(format!(#msg, #(#used = #used),*)),
            }
        }
    }
}

/// Argument names referenced by `{name}` or `{name:info}` in a format string.
fn placeholders(msg: &str) -> Vec<String> {
    let mut names = Vec::new();
    let mut chars = msg.chars().peekable();

    while let Some(c) = chars.next() {
        if c != '{' {
            continue;
        }
        if chars.peek() == Some(&'{') {
            chars.next();
            continue;
        }
        let inner: String = chars.by_ref().take_while(|c| *c != '}').collect();
        let name = inner.split(':').next().unwrap_or_default().trim().to_string();
        if !name.is_empty() && !names.contains(&name) {
            names.push(name);
        }
    }

    names
}

/// Rewrites `{0}` into `{__field_0}` so positional fields can be passed by name.
fn rename_positional(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut in_braces = false;
    let mut at_start = false;

    for c in input.chars() {
        match c {
            '{' => {
                in_braces = true;
                at_start = true;
                out.push(c);
            }
            '}' => {
                in_braces = false;
                out.push(c);
            }
            d if in_braces && at_start && d.is_ascii_digit() => {
                out.push_str("__field_");
                out.push(d);
                at_start = false;
            }
            _ => {
                at_start = false;
                out.push(c);
            }
        }
    }

    out
}
