pub mod answer;
pub mod demo;
pub mod error;
pub mod iterator;
pub mod model;
pub mod time;

pub use answer::{AnswerBuilder, AnswerError};
pub use error::Error;
pub use iterator::{QuestionIterator, TraversalError};
pub use time::Clock;
