//! Proc macros for gilt-bind: `layout!` RSX-style layout descriptions.
//!
//! This crate is not meant to be used directly. Enable the `macros` feature on `gilt-bind`.

use proc_macro::TokenStream;

mod layout_macro;

/// RSX-style layout composition macro.
///
/// Transforms JSX-like markup into `gilt_bind::layout::Layout` builder calls.
///
/// # Syntax
///
/// - `<tag />`: element with no children
/// - `<tag attr="val"> ... </tag>`: element with children
/// - `"text"` children become text nodes; `{expr}` children must evaluate to a `Layout`
///
/// # Attributes
///
/// - `bind="path"` becomes `.bind("path")`
/// - `watch="template"` renders the template into the node's text
/// - `route`, `switch`, `cache` map to the directive of the same name
/// - `data={store}` and `state={store}` set the build context for the subtree
/// - Anything else becomes `.attr(name, value)`; underscores in the name turn into hyphens
///
/// Values are string, bool or number literals, or `{expr}`.
///
/// One root element produces a `Layout`; several produce a `Vec<Layout>`.
///
/// # Example
///
/// ```ignore
/// let form = layout! {
///     <form class="signup">
///         <input type="email" bind="user.email" />
///         <p watch="Signed up as [[user.email]]" />
///         "Thanks!"
///     </form>
/// };
/// ```
#[proc_macro]
pub fn layout(input: TokenStream) -> TokenStream {
    layout_macro::layout_impl(input.into())
        .unwrap_or_else(|err| err.to_compile_error())
        .into()
}
