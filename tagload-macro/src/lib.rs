//! Procedural macros for the tagload load-test runner.
//!
//! This crate provides the `#[virtual_user]` attribute macro, which turns a
//! plain async iteration function into a registered scenario.
//!
//! # Example
//!
//! ```ignore
//! use tagload::prelude::*;
//!
//! #[virtual_user(id = "live", description = "GET /live", think_time_ms = 100)]
//! async fn live(ctx: &IterationContext, _data: &SetupData) -> Result<(), LoadError> {
//!     let res = ctx.http().get("http://localhost:8092/live").await;
//!     ctx.check(&res).that("status was 200", |r| r.status == StatusCode::OK);
//!     Ok(())
//! }
//! ```

use proc_macro::TokenStream;
use quote::{format_ident, quote};
use syn::{
    parse_macro_input, punctuated::Punctuated, Expr, ExprLit, FnArg, ItemFn, Lit, Meta, Token,
};

/// Attributes for the `#[virtual_user]` macro.
#[derive(Default, Debug)]
struct VirtualUserAttrs {
    /// Scenario identifier.
    id: Option<String>,
    /// Optional description.
    description: Option<String>,
    /// Pause after each successful iteration.
    think_time_ms: Option<u64>,
}

impl VirtualUserAttrs {
    fn parse_meta_list(metas: Punctuated<Meta, Token![,]>) -> syn::Result<Self> {
        let mut attrs = VirtualUserAttrs::default();

        for meta in metas {
            let nv = match meta {
                Meta::NameValue(nv) => nv,
                other => {
                    return Err(syn::Error::new_spanned(other, "expected name = value"));
                }
            };

            let ident = nv
                .path
                .get_ident()
                .ok_or_else(|| syn::Error::new_spanned(&nv.path, "expected identifier"))?
                .to_string();

            let lit = match &nv.value {
                Expr::Lit(ExprLit { lit, .. }) => lit.clone(),
                _ => return Err(syn::Error::new_spanned(&nv.value, "expected literal")),
            };

            match (ident.as_str(), lit) {
                ("id", Lit::Str(s)) => attrs.id = Some(s.value()),
                ("description", Lit::Str(s)) => attrs.description = Some(s.value()),
                ("think_time_ms", Lit::Int(i)) => attrs.think_time_ms = Some(i.base10_parse()?),
                ("id" | "description", other) => {
                    return Err(syn::Error::new_spanned(other, "expected string literal"));
                }
                ("think_time_ms", other) => {
                    return Err(syn::Error::new_spanned(other, "expected integer literal"));
                }
                _ => {
                    return Err(syn::Error::new_spanned(
                        nv.path,
                        format!("unknown attribute: {}", ident),
                    ));
                }
            }
        }

        Ok(attrs)
    }
}

/// Generate a `VirtualUser` implementation from an async iteration function.
///
/// The function must take `(&IterationContext, &SetupData)` and return
/// `Result<(), LoadError>`. For `fn tag` the macro emits `TagVirtualUser`
/// and a static `TAG_MANIFEST`.
///
/// # Attributes
///
/// - `id` (required): scenario name used by the registry
/// - `description` (optional)
/// - `think_time_ms` (optional): sleep after each successful iteration
#[proc_macro_attribute]
pub fn virtual_user(args: TokenStream, input: TokenStream) -> TokenStream {
    let args = parse_macro_input!(args with Punctuated::<Meta, Token![,]>::parse_terminated);
    let input_fn = parse_macro_input!(input as ItemFn);

    match generate_virtual_user(args, input_fn) {
        Ok(tokens) => tokens.into(),
        Err(err) => err.to_compile_error().into(),
    }
}

fn generate_virtual_user(
    args: Punctuated<Meta, Token![,]>,
    input_fn: ItemFn,
) -> syn::Result<proc_macro2::TokenStream> {
    let attrs = VirtualUserAttrs::parse_meta_list(args)?;

    let scenario_id = attrs.id.ok_or_else(|| {
        syn::Error::new(
            proc_macro2::Span::call_site(),
            "missing required attribute: id",
        )
    })?;
    let description = attrs.description.unwrap_or_default();
    let think_time_ms = attrs.think_time_ms.unwrap_or(0);

    if input_fn.sig.asyncness.is_none() {
        return Err(syn::Error::new_spanned(
            &input_fn.sig,
            "virtual_user must be async",
        ));
    }

    let typed_args = input_fn
        .sig
        .inputs
        .iter()
        .filter(|arg| matches!(arg, FnArg::Typed(_)))
        .count();
    if typed_args != 2 || input_fn.sig.inputs.len() != 2 {
        return Err(syn::Error::new_spanned(
            &input_fn.sig.inputs,
            "virtual_user expects (ctx: &IterationContext, data: &SetupData)",
        ));
    }

    let fn_name = &input_fn.sig.ident;
    let fn_vis = &input_fn.vis;
    let struct_name = format_ident!("{}VirtualUser", to_pascal_case(&fn_name.to_string()));
    let manifest_name = format_ident!("{}_MANIFEST", fn_name.to_string().to_uppercase());

    let expanded = quote! {
        /// Generated scenario manifest.
        #[allow(dead_code)]
        #fn_vis static #manifest_name: tagload::scenario::ScenarioManifest =
            tagload::scenario::ScenarioManifest::new(#scenario_id)
                .with_description(#description)
                .with_think_time_ms(#think_time_ms);

        /// Generated virtual user.
        #[derive(Debug, Default, Clone, Copy)]
        #fn_vis struct #struct_name;

        impl #struct_name {
            pub fn new() -> Self {
                Self
            }

            pub fn manifest() -> &'static tagload::scenario::ScenarioManifest {
                &#manifest_name
            }
        }

        #[tagload::prelude::async_trait]
        impl tagload::scenario::VirtualUser for #struct_name {
            async fn iteration(
                &self,
                ctx: &tagload::scenario::IterationContext,
                data: &tagload::scenario::SetupData,
            ) -> Result<(), tagload::scenario::LoadError> {
                #fn_name(ctx, data).await?;
                if #think_time_ms > 0 {
                    ctx.sleep(#manifest_name.think_time()).await;
                }
                Ok(())
            }

            fn name(&self) -> &str {
                #scenario_id
            }

            fn description(&self) -> &str {
                #description
            }
        }

        #input_fn
    };

    Ok(expanded)
}

/// Convert a snake_case string to PascalCase.
fn to_pascal_case(s: &str) -> String {
    s.split('_')
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                None => String::new(),
                Some(first) => first.to_uppercase().chain(chars).collect(),
            }
        })
        .collect()
}
