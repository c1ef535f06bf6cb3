//! Evidence collection and judgement: provider clients, the batched
//! gatherer, URL normalization, and support/relevance evaluation.

pub mod evaluate;
pub mod gather;
pub mod normalize;
pub mod providers;
