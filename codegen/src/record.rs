use proc_macro2::TokenStream;
use quote::{quote, ToTokens};
use syn::parse::{Parse, ParseStream};
use syn::punctuated::Punctuated;
use syn::{Error, Result};

use crate::util;

const INPUT_TYPE_ERROR: &str = "Record can only be derived from structs";

pub(crate) fn derive(input: TokenStream) -> Result<TokenStream> {
    let input: syn::DeriveInput = syn::parse2(input)?;

    let mut crate_name = None;
    let mut table_name = None;

    for attr in &input.attrs {
        if !attr.path().is_ident("record") {
            continue;
        }

        let attr: Attr<ItemOpt> = attr.parse_args()?;
        for opt in attr.options {
            match opt {
                ItemOpt::JarAs(name, _) if crate_name.is_some() => {
                    return Err(Error::new_spanned(name, "`jar_as` can only be specified once"));
                }
                ItemOpt::JarAs(_, path) => crate_name = Some(path),
                ItemOpt::Name(name, _) if table_name.is_some() => {
                    return Err(Error::new_spanned(name, "`name` can only be specified once"));
                }
                ItemOpt::Name(_, lit) => table_name = Some(lit),
            }
        }
    }

    let crate_name = crate_name.unwrap_or_else(|| quote!(::cookiejar));
    let table_name = match table_name {
        Some(lit) => lit.value(),
        None => input.ident.to_string(),
    };

    let data = match &input.data {
        syn::Data::Struct(data) => data,
        syn::Data::Enum(data) => {
            return Err(Error::new_spanned(data.enum_token, INPUT_TYPE_ERROR))
        }
        syn::Data::Union(data) => {
            return Err(Error::new_spanned(data.union_token, INPUT_TYPE_ERROR))
        }
    };

    let mut fields = Vec::new();
    let mut handle_fields = Vec::new();

    for (i, field) in data.fields.iter().enumerate() {
        let (accessor, name) = match &field.ident {
            Some(ident) => (ident.to_token_stream(), ident.to_string()),
            None => {
                let index = syn::Index::from(i);
                (index.to_token_stream(), i.to_string())
            }
        };

        for attr in &field.attrs {
            if !attr.path().is_ident("record") {
                continue;
            }

            let attr: Attr<FieldOpt> = attr.parse_args()?;
            for opt in attr.options {
                match opt {
                    FieldOpt::Handle => handle_fields.push(accessor.clone()),
                }
            }
        }

        let ty = &field.ty;
        let ty_name = ty.to_token_stream().to_string();
        fields.push(quote! {
            table::Field {
                name: #name,
                ty:   #ty_name,
                size: ::std::mem::size_of::<#ty>(),
            }
        });
    }

    let visit_handles = if handle_fields.is_empty() {
        quote!()
    } else {
        quote! {
            fn visit_handles(&self, visitor: &mut dyn FnMut(handle::HandleId)) {
                #(
                    handle::HandleRefs::visit_handle_refs(&self.#handle_fields, &mut *visitor);
                )*
            }
        }
    };

    let generics = util::parse_generics(&input);
    let impl_record = generics.impl_trait(
        quote!(table::Record),
        quote! {
            const NAME: &'static str = #table_name;

            const FIELDS: &'static [table::Field] = &[#(#fields),*];

            #visit_handles
        },
    );

    Ok(quote! {
        const _: () = {
            #[allow(unused_imports)]
            use #crate_name::{handle, table};

            #[automatically_derived]
            #impl_record
        };
    })
}

struct Attr<T> {
    options: Punctuated<T, syn::Token![,]>,
}

impl<T: Parse> Parse for Attr<T> {
    fn parse(input: ParseStream) -> Result<Self> {
        Ok(Attr { options: Punctuated::parse_terminated(input)? })
    }
}

enum ItemOpt {
    JarAs(syn::Ident, TokenStream),
    Name(syn::Ident, syn::LitStr),
}

impl Parse for ItemOpt {
    fn parse(input: ParseStream) -> Result<Self> {
        let name = input.parse::<syn::Ident>()?;

        let opt = match name.to_string().as_str() {
            "jar_as" => {
                let inner;
                syn::parenthesized!(inner in input);
                let path = inner.parse::<TokenStream>()?;
                ItemOpt::JarAs(name, path)
            }
            "name" => {
                input.parse::<syn::Token![=]>()?;
                ItemOpt::Name(name, input.parse()?)
            }
            _ => return Err(Error::new_spanned(&name, format!("Unknown argument `{}`", name))),
        };

        Ok(opt)
    }
}

enum FieldOpt {
    Handle,
}

impl Parse for FieldOpt {
    fn parse(input: ParseStream) -> Result<Self> {
        let name = input.parse::<syn::Ident>()?;

        match name.to_string().as_str() {
            "handle" => Ok(FieldOpt::Handle),
            _ => Err(Error::new_spanned(&name, format!("Unknown argument `{}`", name))),
        }
    }
}
