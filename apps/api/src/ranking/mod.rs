// Ranking: persisted candidate records, best-score merge and top-N ordering.
pub mod repository;
pub mod store;
