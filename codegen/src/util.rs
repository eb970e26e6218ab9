use proc_macro2::TokenStream;
use quote::quote;

pub(crate) fn parse_generics(input: &syn::DeriveInput) -> ParsedGenerics {
    let (decl, usage, where_) = input.generics.split_for_impl();
    ParsedGenerics {
        ident:  input.ident.clone(),
        decl:   quote!(#decl),
        usage:  quote!(#usage),
        where_: quote!(#where_),
    }
}

pub(crate) struct ParsedGenerics {
    pub(crate) ident:  proc_macro2::Ident,
    pub(crate) decl:   TokenStream,
    pub(crate) usage:  TokenStream,
    pub(crate) where_: TokenStream,
}

impl ParsedGenerics {
    pub(crate) fn impl_trait(&self, trait_: TokenStream, body: TokenStream) -> TokenStream {
        let Self { ident, decl, usage, where_ } = self;
        quote! {
            impl #decl #trait_ for #ident #usage #where_ {
                #body
            }
        }
    }
}
