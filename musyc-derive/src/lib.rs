use quote::quote;
use syn::{DeriveInput, parse_macro_input};

#[proc_macro_derive(Response, attributes(parameters))]
pub fn derive_response(input: proc_macro::TokenStream) -> proc_macro::TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    match derive_response_impl(input) {
        Ok(token_stream) => token_stream,
        Err(e) => e.to_compile_error().into(),
    }
}

fn derive_response_impl(input: DeriveInput) -> syn::Result<proc_macro::TokenStream> {
    let name = input.ident;

    let mut parameters: Option<usize> = None;

    for attr in input.attrs {
        if attr.path().is_ident("parameters") {
            if let syn::Meta::NameValue(meta) = attr.meta {
                if let syn::Expr::Lit(val) = meta.value {
                    if let syn::Lit::Int(v) = val.lit {
                        parameters = Some(v.base10_parse::<usize>()?);
                    }
                }
            }
        }
    }

    let p = parameters.ok_or_else(|| {
        syn::Error::new_spanned(
            name.clone(),
            "Missing #[parameters = <p>] attribute where p of type usize is equal to the number of parameters of the response function",
        )
    })?;

    let expanded = quote! {
        impl Response<#p> for #name {
            fn val(&self, dose: f64, theta: &nalgebra::SVector<f64, #p>) -> f64 {
                self.f(dose, theta)
            }

            fn val_grad(&self, dose: f64, theta: &nalgebra::SVector<f64, #p>) -> (f64, nalgebra::SVector<f64, #p>) {
                num_dual::gradient(|v| self.f(dose, &v), *theta)
            }
        }
    };
    Ok(proc_macro::TokenStream::from(expanded))
}
