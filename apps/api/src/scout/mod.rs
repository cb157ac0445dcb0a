// Scout: the search pipeline, its request model, and the HTTP handlers that
// expose it together with candidate lookup and stage edits.

pub mod formatting;
pub mod handlers;
pub mod models;
pub mod pipeline;
