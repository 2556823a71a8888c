//! Procedural derive macros shared across the ixtrade crates.
//!
//! ## `DisplayId`
//!
//! Derives `Display` for a single-field tuple struct by forwarding to the
//! inner value's own `Display` impl. Several crates wrap a plain `u64` or
//! `String` in a newtype for type safety (`InstrumentToken`,
//! `ClientOrderId`, `BrokerOrderId`); this removes the hand-written
//! `impl Display { write!(f, "{}", self.0) }` boilerplate each one would
//! otherwise repeat.
//!
//! ```rust,ignore
//! #[derive(ixtrade_macros::DisplayId)]
//! struct InstrumentToken(pub u64);
//!
//! assert_eq!(InstrumentToken(7).to_string(), "7");
//! ```

extern crate proc_macro;

use proc_macro::TokenStream;
use quote::quote;
use syn::{Data, DeriveInput, Fields};

#[proc_macro_derive(DisplayId)]
pub fn display_id_derive(input: TokenStream) -> TokenStream {
    let ast: DeriveInput =
        syn::parse(input).expect("DisplayId derive failed to parse input TokenStream");

    let name = &ast.ident;
    let is_single_field_tuple_struct = matches!(
        &ast.data,
        Data::Struct(data) if matches!(&data.fields, Fields::Unnamed(fields) if fields.unnamed.len() == 1)
    );
    if !is_single_field_tuple_struct {
        panic!("DisplayId only supports single-field tuple structs, e.g. `struct Foo(u64);`");
    }

    let generated = quote! {
        impl std::fmt::Display for #name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                std::fmt::Display::fmt(&self.0, f)
            }
        }
    };

    TokenStream::from(generated)
}
