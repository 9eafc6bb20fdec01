pub mod json_loader;

pub use json_loader::{load_model_answers, load_questions, save_model_answers, write_corpus};
