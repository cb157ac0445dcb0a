// Candidate scoring: per-profile LLM fit scoring and the bounded, paced
// batch runner that fans it out.
// All LLM calls go through llm_client, no direct HTTP calls here.

pub mod batch;
pub mod fit_scorer;
pub mod models;
pub mod prompts;
