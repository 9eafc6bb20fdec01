pub mod answer;
pub mod insight;
pub mod loaders;
pub mod question;

pub use answer::{AlignedAnswers, NO_ANSWER_PROVIDED};
pub use insight::{InsightCorpus, InsightRecord};
pub use loaders::{load_model_answers, load_questions, save_model_answers, write_corpus};
pub use question::{ModelAnswer, ModelAnswerSet, Question};
