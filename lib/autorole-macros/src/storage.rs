use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::{format_ident, quote};
use syn::parse::ParseStream;
use syn::punctuated::Punctuated;
use syn::{parse_macro_input, Attribute, DeriveInput, Error, Ident, LitStr, Result, Token, Type};

/// The parsed `#[format(..)]` attribute.
struct FormatAttribute(Type);

impl FormatAttribute {
    fn parse(attribute: &Attribute) -> Result<Self> {
        attribute.parse_args_with(|input: ParseStream| Ok(Self(input.parse()?)))
    }
}

/// The parsed `#[location(..)]` attribute.
struct LocationAttribute {
    template: LitStr,
    arguments: Vec<Type>,
}

impl LocationAttribute {
    fn parse(attribute: &Attribute) -> Result<Self> {
        attribute.parse_args_with(|input: ParseStream| {
            let template = input.parse::<LitStr>()?;

            if input.is_empty() {
                return Ok(Self { template, arguments: vec![] });
            }

            input.parse::<Token![,]>()?;

            let arguments = Punctuated::<Type, Token![,]>::parse_terminated(input)?;

            Ok(Self { template, arguments: arguments.into_iter().collect() })
        })
    }
}

/// Finds the attribute with the given name, erroring at the type's name if it is missing.
fn find<'a>(attrs: &'a [Attribute], ident: &Ident, name: &str) -> Result<&'a Attribute> {
    attrs
        .iter()
        .find(|a| a.path().is_ident(name))
        .ok_or_else(|| Error::new(ident.span(), format!("the `{name}` attribute must be configured")))
}

fn expand(input: DeriveInput) -> Result<TokenStream2> {
    let DeriveInput { attrs, ident, generics, .. } = input;

    let FormatAttribute(format) = FormatAttribute::parse(find(&attrs, &ident, "format")?)?;
    let LocationAttribute { template, arguments } = LocationAttribute::parse(find(&attrs, &ident, "location")?)?;

    let (impl_generics, ty_generics, where_clause) = generics.split_for_impl();
    let bindings = (0 .. arguments.len()).map(|n| format_ident!("_{n}")).collect::<Vec<_>>();

    Ok(quote! {
        impl #impl_generics ::autorole_storage::Stored for #ident #ty_generics #where_clause {
            type Arguments = (#(#arguments),*);
            type Format = #format;

            fn stored((#(#bindings),*): Self::Arguments) -> ::autorole_storage::Key<Self, Self::Format> {
                ::autorole_storage::Key::new_default(::std::format!(#template, #(#bindings),*))
            }
        }
    })
}

pub fn procedure(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);

    expand(input).unwrap_or_else(Error::into_compile_error).into()
}
