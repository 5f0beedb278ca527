//! # SUI Template Renderer
//!
//! Resolves `s:*` directives in HTML templates against a data context and
//! emits the resolved markup plus a sequence-keyed binding map for hydration.
//!
//! ## Engine Invariants
//!
//! 1. **One Renderer, One Pass**: a [`TemplateRenderer`] is consumed by
//!    [`TemplateRenderer::render`]. Sequence numbers start at 1 and are never
//!    reused within a pass.
//!
//! 2. **Resolved Nodes Are Final**: every element or text node whose directives
//!    were evaluated is recorded as resolved in a side table. Visiting it again
//!    assigns no new keys and changes nothing.
//!
//! 3. **No Splicing Mid-Walk**: loop output is recorded in a replacement log
//!    and spliced after the walk, in record order. Nested loops record inner
//!    edits first.
//!
//! 4. **Scoped Loop Variables**: loop item/index names live in an overlay frame
//!    that is popped after the loop. `s:set` always writes globals.
//!
//! 5. **Strict Conditions**: a branch is taken only when its expression yields
//!    boolean `true`. At most one branch of an `s:if`/`s:elif`/`s:else` group
//!    is revealed.
//!
//! 6. **Errors Degrade, They Do Not Abort**: evaluation and shape errors are
//!    collected in [`Rendered::errors`]. Only unreadable markup
//!    ([`RenderError::Parse`]) fails the render.
//!
//! ## Directive Vocabulary
//!
//! | Attribute | Effect |
//! |---|---|
//! | `s:if`, `s:elif`, `s:else` | conditional group |
//! | `s:for`, `s:for-item`, `s:for-index` | loop expansion |
//! | `s:set` / `<s:set name value>` | assignment |
//! | `s:attr-<name>` | boolean attribute |
//! | `s:trans-node`, `s:trans-text`, `s:trans-escape`, `s:trans-attr-<name>`, `s:trans-fmt` | translation |
//! | `s:raw` | unescaped interpolated text |
//! | `s:ns`, `s:cn`, `s:ready`, `s:event` | client hooks kept by the finalizer |

mod binding;
mod component;
mod control;
mod directive;
mod dom;
mod error;
mod eval;
mod finalize;
mod locale;
mod options;
mod parse;
mod render;
mod scope;
mod state;
mod trans;
mod visitor;

#[cfg(test)]
mod finalize_tests;

pub use binding::{BindingKind, Mapping};
pub use component::{ComponentLoader, NoComponents, TemplateComponents};
pub use directive::{Directive, DirectiveSet, Hook};
pub use error::{ExprError, RenderError};
pub use eval::{Evaluator, ExpressionGateway, Replaced};
pub use locale::Locale;
pub use options::RenderOptions;
pub use render::{Rendered, TemplateRenderer};
pub use scope::Data;

/// Render `html` with the built-in evaluator and no locale or components.
pub fn render(html: &str, data: Data, options: RenderOptions) -> Result<Rendered, RenderError> {
    TemplateRenderer::new(data, options).render(html)
}
