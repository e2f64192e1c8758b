//! RSX layout! macro: parse JSX-like markup and generate `Layout` builder code.

use proc_macro2::{Span, TokenStream};
use quote::quote;
use syn::ext::IdentExt;
use syn::parse::{Parse, ParseStream};
use syn::{braced, Error, Expr, Ident, Lit, LitStr, Result, Token};

// ---------------------------------------------------------------------------
// AST types
// ---------------------------------------------------------------------------

/// An attribute value: a literal or a braced Rust expression.
#[derive(Clone)]
pub(crate) enum AttrValue {
    Lit(Lit),
    Expr(Expr),
}

impl AttrValue {
    fn to_tokens(&self) -> TokenStream {
        match self {
            AttrValue::Lit(lit) => quote! { #lit },
            AttrValue::Expr(expr) => quote! { (#expr) },
        }
    }
}

/// A parsed RSX attribute: `name="value"`, `name=true` or `name={expr}`.
#[derive(Clone)]
pub(crate) struct Attribute {
    pub name: Ident,
    pub value: AttrValue,
}

/// A child: a nested element, a text literal, or a braced expression
/// evaluating to a `Layout`.
#[derive(Clone)]
pub(crate) enum Child {
    Element(Element),
    Text(LitStr),
    Expr(Expr),
}

/// A parsed RSX element: `<tag attrs... />` or `<tag attrs...> children </tag>`.
#[derive(Clone)]
pub(crate) struct Element {
    pub tag: Ident,
    pub attrs: Vec<Attribute>,
    pub children: Vec<Child>,
    pub self_closing: bool,
}

/// The top-level layout! input: a sequence of elements.
struct LayoutInput {
    elements: Vec<Element>,
}

// ---------------------------------------------------------------------------
// Parsing
// ---------------------------------------------------------------------------

impl Parse for LayoutInput {
    fn parse(input: ParseStream) -> Result<Self> {
        let mut elements = Vec::new();
        while !input.is_empty() {
            elements.push(parse_element(input)?);
        }
        Ok(LayoutInput { elements })
    }
}

fn parse_value(input: ParseStream) -> Result<AttrValue> {
    if input.peek(syn::token::Brace) {
        let content;
        braced!(content in input);
        return Ok(AttrValue::Expr(content.parse()?));
    }
    Ok(AttrValue::Lit(input.parse()?))
}

/// Parse a single RSX element from the token stream.
pub(crate) fn parse_element(input: ParseStream) -> Result<Element> {
    input.parse::<Token![<]>()?;

    // Keywords such as `type` are valid attribute and tag names.
    let tag = Ident::parse_any(input)?;

    let mut attrs = Vec::new();
    loop {
        if input.peek(Token![/]) {
            input.parse::<Token![/]>()?;
            input.parse::<Token![>]>()?;
            return Ok(Element {
                tag,
                attrs,
                children: Vec::new(),
                self_closing: true,
            });
        }

        if input.peek(Token![>]) {
            input.parse::<Token![>]>()?;
            break;
        }

        let name = Ident::parse_any(input)?;
        input.parse::<Token![=]>()?;
        let value = parse_value(input)?;
        attrs.push(Attribute { name, value });
    }

    let mut children = Vec::new();
    loop {
        if input.peek(Token![<]) && input.peek2(Token![/]) {
            input.parse::<Token![<]>()?;
            input.parse::<Token![/]>()?;
            let closing_tag = Ident::parse_any(input)?;
            if closing_tag != tag {
                return Err(Error::new(
                    closing_tag.span(),
                    format!(
                        "mismatched closing tag: expected `</{}>`, found `</{}>`",
                        tag, closing_tag
                    ),
                ));
            }
            input.parse::<Token![>]>()?;
            break;
        }

        if input.peek(Token![<]) {
            children.push(Child::Element(parse_element(input)?));
        } else if input.peek(LitStr) {
            children.push(Child::Text(input.parse()?));
        } else if input.peek(syn::token::Brace) {
            let content;
            braced!(content in input);
            children.push(Child::Expr(content.parse()?));
        } else {
            return Err(input.error(
                "expected a child element, a string literal, `{expr}` or `</` to close the parent",
            ));
        }
    }

    Ok(Element {
        tag,
        attrs,
        children,
        self_closing: false,
    })
}

// ---------------------------------------------------------------------------
// Code generation
// ---------------------------------------------------------------------------

/// `data_bind_id` → `"data-bind-id"`.
fn attribute_name(ident: &Ident) -> String {
    ident.unraw().to_string().replace('_', "-")
}

/// Generate code for a single element. `bind`, `watch`, `route`, `switch`,
/// `cache`, `data` and `state` become directive calls; everything else is
/// an `.attr(..)`.
fn generate_element(elem: &Element) -> TokenStream {
    let tag = elem.tag.unraw().to_string();
    let mut calls = Vec::new();

    for attr in &elem.attrs {
        let name = attr.name.unraw().to_string();
        let value = attr.value.to_tokens();
        let call = match name.as_str() {
            "bind" => quote! { .bind(#value) },
            "watch" => quote! { .watch(#value, "text") },
            "route" => quote! { .route(#value) },
            "switch" => quote! { .switch(#value) },
            "cache" => quote! { .cache(#value) },
            "data" => quote! { .data(&#value) },
            "state" => quote! { .state(&#value) },
            _ => {
                let attr_name = attribute_name(&attr.name);
                quote! { .attr(#attr_name, #value) }
            }
        };
        calls.push(call);
    }

    for child in &elem.children {
        let call = match child {
            Child::Element(child) => {
                let code = generate_element(child);
                quote! { .child(#code) }
            }
            Child::Text(text) => quote! { .child(gilt_bind::layout::Layout::text(#text)) },
            Child::Expr(expr) => quote! { .child(#expr) },
        };
        calls.push(call);
    }

    quote! {
        gilt_bind::layout::Layout::new(#tag) #(#calls)*
    }
}

/// Entry point: one root element yields a `Layout`, several yield a
/// `Vec<Layout>`.
pub(crate) fn layout_impl(input: TokenStream) -> Result<TokenStream> {
    let parsed: LayoutInput = syn::parse2(input)?;

    match parsed.elements.as_slice() {
        [] => Err(Error::new(
            Span::call_site(),
            "layout! macro requires at least one element",
        )),
        [single] => Ok(generate_element(single)),
        several => {
            let exprs = several.iter().map(generate_element);
            Ok(quote! { ::std::vec![#(#exprs),*] })
        }
    }
}

// ===========================================================================
// Tests
// ===========================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use quote::quote;

    fn parse_layout(tokens: TokenStream) -> Result<LayoutInput> {
        syn::parse2(tokens)
    }

    fn parse_single_element(tokens: TokenStream) -> Result<Element> {
        syn::parse2::<LayoutInput>(tokens).map(|v| v.elements.into_iter().next().unwrap())
    }

    // -----------------------------------------------------------------------
    // Parsing tests
    // -----------------------------------------------------------------------

    #[test]
    fn parse_self_closing_element() {
        let elem = parse_single_element(quote! { <input type="email" bind="user.email" /> }).unwrap();
        assert_eq!(elem.tag.to_string(), "input");
        assert!(elem.self_closing);
        assert!(elem.children.is_empty());
        assert_eq!(elem.attrs.len(), 2);
        assert_eq!(elem.attrs[0].name.to_string(), "type");
        assert_eq!(elem.attrs[1].name.to_string(), "bind");
    }

    #[test]
    fn parse_children_of_every_kind() {
        let elem = parse_single_element(quote! {
            <form>
                <input bind="a" />
                "plain text"
                { footer() }
            </form>
        })
        .unwrap();
        assert!(!elem.self_closing);
        assert_eq!(elem.children.len(), 3);
        assert!(matches!(elem.children[0], Child::Element(_)));
        assert!(matches!(elem.children[1], Child::Text(_)));
        assert!(matches!(elem.children[2], Child::Expr(_)));
    }

    #[test]
    fn parse_expression_and_bool_values() {
        let elem = parse_single_element(quote! {
            <section data={store} cache=true />
        })
        .unwrap();
        assert!(matches!(elem.attrs[0].value, AttrValue::Expr(_)));
        assert!(matches!(elem.attrs[1].value, AttrValue::Lit(Lit::Bool(_))));
    }

    #[test]
    fn parse_multiple_root_elements() {
        let parsed = parse_layout(quote! {
            <header />
            <main />
            <footer />
        })
        .unwrap();
        assert_eq!(parsed.elements.len(), 3);
    }

    #[test]
    fn parse_error_mismatched_closing_tag() {
        let result = parse_single_element(quote! {
            <div>
                <p />
            </span>
        });
        let err = result.err().map(|e| e.to_string()).unwrap_or_default();
        assert!(err.contains("mismatched closing tag"));
    }

    // -----------------------------------------------------------------------
    // Code generation tests
    // -----------------------------------------------------------------------

    #[test]
    fn codegen_directives() {
        let elem = parse_single_element(quote! {
            <p watch="Hi [[name]]" route="/home" cache=false data={ctx} />
        })
        .unwrap();
        let code = generate_element(&elem).to_string();
        assert!(code.contains("Layout :: new (\"p\")"), "{code}");
        assert!(code.contains(". watch (\"Hi [[name]]\" , \"text\")"), "{code}");
        assert!(code.contains(". route (\"/home\")"), "{code}");
        assert!(code.contains(". cache (false)"), "{code}");
        assert!(code.contains(". data (& (ctx))"), "{code}");
    }

    #[test]
    fn codegen_plain_attributes_use_hyphens() {
        let elem = parse_single_element(quote! { <div aria_label="menu" /> }).unwrap();
        let code = generate_element(&elem).to_string();
        assert!(code.contains(". attr (\"aria-label\" , \"menu\")"), "{code}");
    }

    #[test]
    fn codegen_children() {
        let elem = parse_single_element(quote! {
            <ul>
                <li>"one"</li>
            </ul>
        })
        .unwrap();
        let code = generate_element(&elem).to_string();
        assert!(code.contains(". child (gilt_bind :: layout :: Layout :: new (\"li\")"), "{code}");
        assert!(code.contains("Layout :: text (\"one\")"), "{code}");
    }

    #[test]
    fn codegen_several_roots_is_vec() {
        let code = layout_impl(quote! { <a /> <b /> }).unwrap().to_string();
        assert!(code.contains("vec !"), "{code}");
    }

    #[test]
    fn codegen_empty_is_error() {
        let result = layout_impl(quote! {});
        let err = result.err().map(|e| e.to_string()).unwrap_or_default();
        assert!(err.contains("at least one element"));
    }
}
